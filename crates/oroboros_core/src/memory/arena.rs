//! # Arena Page
//!
//! A fixed-size bump page for allocations that are freed all at once.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Alignment of every page's base address.
pub const PAGE_ALIGN: usize = 64;

/// Default page size (2 MiB).
pub const DEFAULT_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// A bump-pointer page of zeroed memory.
///
/// Allocations are fast (just bump an offset). Memory is freed all at once
/// when the last `Arc` to the page is dropped. The page never moves or
/// grows, so every pointer it hands out stays valid for its whole life.
///
/// # Thread Safety
///
/// The offset is advanced with a compare-exchange, so concurrent bumps
/// never hand out overlapping ranges. In practice one thread owns the page
/// for a frame and others only hold it to keep it alive.
///
/// # Example
///
/// ```rust,ignore
/// let page = ArenaPage::try_new(1024 * 1024).expect("out of memory");
///
/// // Fast allocations
/// let ptr = page.bump(256, 16).expect("fits");
///
/// // Dropping the last Arc frees everything at once
/// drop(page);
/// ```
pub struct ArenaPage {
    /// Base of the allocation.
    base: NonNull<u8>,
    /// Layout the page was allocated with.
    layout: Layout,
    /// Current allocation offset.
    offset: AtomicUsize,
}

// SAFETY: the page owns its allocation; the only shared mutation is the
// atomic offset, and handed-out ranges never overlap.
unsafe impl Send for ArenaPage {}
// SAFETY: see above.
unsafe impl Sync for ArenaPage {}

impl ArenaPage {
    /// Allocates a zeroed page of `capacity` bytes.
    ///
    /// Returns `None` if `capacity` is zero or the allocator fails. Never
    /// aborts on out-of-memory.
    #[must_use]
    pub fn try_new(capacity: usize) -> Option<Arc<Self>> {
        if capacity == 0 {
            return None;
        }
        let layout = Layout::from_size_align(capacity, PAGE_ALIGN).ok()?;
        // SAFETY: layout has a non-zero size.
        let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })?;
        Some(Arc::new(Self {
            base,
            layout,
            offset: AtomicUsize::new(0),
        }))
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Returns the current used space in bytes, including alignment padding.
    #[inline]
    #[must_use]
    pub fn used(&self) -> usize {
        self.offset.load(Ordering::Acquire)
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Reserves `bytes` bytes aligned to `align`.
    ///
    /// Returns `None` if the request does not fit in the remaining space.
    /// The returned range is zeroed and is never handed out again.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn bump(&self, bytes: usize, align: usize) -> Option<NonNull<u8>> {
        assert!(
            align.is_power_of_two(),
            "alignment must be a power of two, got {align}"
        );

        let base = self.base.as_ptr() as usize;
        let mut current = self.offset.load(Ordering::Relaxed);
        loop {
            let aligned = base.checked_add(current)?.checked_add(align - 1)? & !(align - 1);
            let start = aligned - base;
            let end = start.checked_add(bytes)?;
            if end > self.capacity() {
                return None;
            }

            match self
                .offset
                .compare_exchange_weak(current, end, Ordering::AcqRel, Ordering::Relaxed)
            {
                // SAFETY: start <= end <= capacity, so the pointer is within
                // (or one past the end of) this page's allocation.
                Ok(_) => {
                    return Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(start)) });
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for ArenaPage {
    fn drop(&mut self) {
        // SAFETY: base was allocated in `try_new` with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for ArenaPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaPage")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_allocation() {
        let page = ArenaPage::try_new(1024).unwrap();
        let ptr = page.bump(10, 4).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 4, 0);
        assert_eq!(page.used(), 10);
        assert_eq!(page.remaining(), 1014);
    }

    #[test]
    fn test_page_alignment_padding() {
        let page = ArenaPage::try_new(1024).unwrap();
        let _ = page.bump(1, 1).unwrap();
        let ptr = page.bump(8, 32).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 32, 0);
        assert_eq!(page.used(), 40);
    }

    #[test]
    fn test_page_exhaustion() {
        let page = ArenaPage::try_new(64).unwrap();
        assert!(page.bump(48, 8).is_some());
        assert!(page.bump(32, 8).is_none());
        // A smaller request still fits in the tail.
        assert!(page.bump(16, 8).is_some());
        assert_eq!(page.remaining(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ArenaPage::try_new(0).is_none());
    }

    #[test]
    fn test_ranges_are_disjoint() {
        let page = ArenaPage::try_new(4096).unwrap();
        let a = page.bump(100, 8).unwrap().as_ptr() as usize;
        let b = page.bump(100, 8).unwrap().as_ptr() as usize;
        assert!(b >= a + 100);
    }

    #[test]
    #[should_panic(expected = "alignment must be a power of two")]
    fn test_bad_alignment_panics() {
        let page = ArenaPage::try_new(64).unwrap();
        let _ = page.bump(8, 3);
    }
}
