//! # Frame Arena
//!
//! A thread's chain of bump pages for submission payloads. Pages are
//! registered with the [`FrameRegistry`] the moment they are created and
//! are freed in bulk when the frame ends.

#![allow(unsafe_code)]

use std::sync::{Arc, Weak};

use oroboros_core::{ArenaPage, FrameSlot, FrameStamp};

use crate::registry::FrameRegistry;

/// Per-thread frame arena.
///
/// Holds a weak handle to the page it is currently bumping; the registry
/// holds the strong one.
#[derive(Debug)]
pub(crate) struct FrameArena {
    current: Weak<ArenaPage>,
}

impl FrameArena {
    pub(crate) const fn new() -> Self {
        Self { current: Weak::new() }
    }

    /// Carves `bytes` bytes aligned to `align` for the frame `stamp`.
    ///
    /// Fails over to a fresh, registered page when the current one cannot
    /// fit the request. Returns `None` and overflows the frame if a page
    /// cannot be allocated or registered, or the request exceeds a page.
    pub(crate) fn allocate(
        &mut self,
        bytes: usize,
        align: usize,
        page_size: usize,
        stamp: FrameStamp,
        registry: &FrameRegistry,
    ) -> Option<FrameSlot> {
        if let Some(page) = self.current.upgrade() {
            // SAFETY: the page is held by the registry until the frame
            // stamped `stamp` has been dispatched.
            if let Some(slot) = unsafe { FrameSlot::carve(&page, bytes, align, stamp) } {
                return Some(slot);
            }
        }

        if bytes > page_size {
            tracing::warn!(
                "allocation of {} bytes exceeds the {}-byte arena page",
                bytes,
                page_size
            );
            registry.mark_overflowed();
            return None;
        }

        let Some(page) = ArenaPage::try_new(page_size) else {
            tracing::warn!("arena page allocation failed ({} bytes)", page_size);
            registry.mark_overflowed();
            return None;
        };
        if !registry.register_arena(Arc::clone(&page)) {
            return None;
        }
        tracing::trace!("new arena page ({} bytes)", page_size);
        self.current = Arc::downgrade(&page);

        // SAFETY: registered above.
        let slot = unsafe { FrameSlot::carve(&page, bytes, align, stamp) };
        if slot.is_none() {
            tracing::warn!("{} bytes aligned to {} do not fit a fresh arena page", bytes, align);
            registry.mark_overflowed();
        }
        slot
    }
}
