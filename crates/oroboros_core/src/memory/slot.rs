//! Handles into arena pages.
//!
//! [`FrameSlot`] is the writable, unique view of a fresh allocation.
//! Finishing it yields a [`Payload`]: a `Copy` address that carries the
//! [`FrameStamp`] of the frame it belongs to, so stale payloads can be
//! rejected before anything dereferences them.

#![allow(unsafe_code)]

use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use bytemuck::Pod;

use super::ArenaPage;

/// Identifies the scheduler instance and frame that produced frame memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameStamp {
    /// Scheduler instance id. Zero is never assigned to a live scheduler.
    pub scheduler: u32,
    /// Frame id within that scheduler.
    pub frame: u32,
}

impl FrameStamp {
    /// Stamp of a thread that has not touched any frame yet.
    pub const IDLE: Self = Self::new(0, 0);

    /// Creates a stamp.
    #[inline]
    #[must_use]
    pub const fn new(scheduler: u32, frame: u32) -> Self {
        Self { scheduler, frame }
    }

    /// Stamp of the following frame of the same scheduler.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.scheduler, self.frame.wrapping_add(1))
    }
}

/// Unique, writable handle to one arena allocation.
///
/// Holds a strong reference to its page, so writing through a slot is
/// always sound even if the frame has already ended.
pub struct FrameSlot {
    page: Arc<ArenaPage>,
    ptr: NonNull<u8>,
    len: usize,
    stamp: FrameStamp,
}

// SAFETY: a slot is the only handle to its byte range.
unsafe impl Send for FrameSlot {}
// SAFETY: shared access to a slot exposes no mutation.
unsafe impl Sync for FrameSlot {}

impl FrameSlot {
    /// Carves `bytes` bytes aligned to `align` out of `page`.
    ///
    /// Returns `None` if the page has no room left.
    ///
    /// # Safety
    ///
    /// Readers of the finished [`Payload`] dereference it without holding
    /// the page. The caller must keep `page` alive for as long as any
    /// payload finished from this slot, tagged with `stamp`, can be read.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    #[must_use]
    pub unsafe fn carve(
        page: &Arc<ArenaPage>,
        bytes: usize,
        align: usize,
        stamp: FrameStamp,
    ) -> Option<Self> {
        let ptr = page.bump(bytes, align)?;
        Some(Self {
            page: Arc::clone(page),
            ptr,
            len: bytes,
            stamp,
        })
    }

    /// Size of the allocation in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-sized allocation.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frame this allocation belongs to.
    #[inline]
    #[must_use]
    pub const fn stamp(&self) -> FrameStamp {
        self.stamp
    }

    /// Returns the page this slot was carved from.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Arc<ArenaPage> {
        &self.page
    }

    /// Mutable view of the allocation (zeroed on creation).
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: the range was handed out once by `bump`, lies inside a
        // zero-initialized page kept alive by `self.page`, and `&mut self`
        // guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Copies `value` to the start of the allocation.
    ///
    /// # Panics
    ///
    /// Panics if `T` is larger than the allocation.
    pub fn write<T: Pod>(&mut self, value: &T) {
        let src = bytemuck::bytes_of(value);
        assert!(
            src.len() <= self.len,
            "value of {} bytes does not fit in a {}-byte slot",
            src.len(),
            self.len
        );
        self.bytes_mut()[..src.len()].copy_from_slice(src);
    }

    /// Seals the allocation, returning a read-only payload handle.
    #[inline]
    #[must_use]
    pub fn finish(self) -> Payload {
        Payload {
            ptr: self.ptr,
            len: self.len,
            stamp: self.stamp,
        }
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("len", &self.len)
            .field("stamp", &self.stamp)
            .finish_non_exhaustive()
    }
}

/// Opaque, read-only handle to sealed frame memory.
///
/// A payload does not keep its page alive. Its bytes are only reachable
/// through [`Payload::bytes`], whose caller must guarantee the frame that
/// produced it is still live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload {
    ptr: NonNull<u8>,
    len: usize,
    stamp: FrameStamp,
}

// SAFETY: a payload is an address plus metadata; dereferencing is unsafe.
unsafe impl Send for Payload {}
// SAFETY: see above.
unsafe impl Sync for Payload {}

impl Payload {
    /// Size of the payload in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-sized payload.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frame this payload belongs to.
    #[inline]
    #[must_use]
    pub const fn stamp(&self) -> FrameStamp {
        self.stamp
    }

    /// Address of the first byte.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Borrows the payload bytes.
    ///
    /// # Safety
    ///
    /// The page this payload was carved from must stay alive for `'a`.
    /// Frame schedulers uphold this by only exposing payloads of the
    /// current frame, and only until that frame's pages are released.
    #[inline]
    #[must_use]
    pub unsafe fn bytes<'a>(self) -> &'a [u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }
}
