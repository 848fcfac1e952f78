//! # Frame Registry
//!
//! Process-wide ledger of every arena page and task page created since the
//! last `end_submit`.
//!
//! ```text
//!   Thread 1 ──┐   register once per page
//!   Thread 2 ──┼──> [ arena pages | task pages ] ──> consolidate ──> clear
//!   Thread N ──┘       (append only)                (single thread)
//! ```
//!
//! The two append lists are the only structures producers mutate
//! concurrently. Teardown is one `clear` per frame: O(pages), not
//! O(allocations).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use oroboros_core::ArenaPage;
use parking_lot::Mutex;

use crate::task_list::{TaskPage, TaskRecord};

/// Registry of all frame pages plus the frame's overflow flag.
pub struct FrameRegistry {
    /// Arena pages, in registration order.
    arenas: Mutex<Vec<Arc<ArenaPage>>>,
    /// Task pages, in registration order.
    task_lists: Mutex<Vec<Arc<TaskPage>>>,
    /// Arena page capacity.
    max_arenas: usize,
    /// Task page capacity.
    max_task_lists: usize,
    /// Set once any allocation or registration fails this frame.
    overflowed: AtomicBool,
}

impl FrameRegistry {
    /// Creates a registry with fixed capacities.
    ///
    /// Both lists are pre-allocated; registration never reallocates.
    /// Returns `None` if either list cannot be reserved.
    pub(crate) fn try_new(max_arenas: usize, max_task_lists: usize) -> Option<Self> {
        let mut arenas = Vec::new();
        arenas.try_reserve_exact(max_arenas).ok()?;
        let mut task_lists = Vec::new();
        task_lists.try_reserve_exact(max_task_lists).ok()?;

        Some(Self {
            arenas: Mutex::new(arenas),
            task_lists: Mutex::new(task_lists),
            max_arenas,
            max_task_lists,
            overflowed: AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    pub(crate) fn new(max_arenas: usize, max_task_lists: usize) -> Self {
        Self::try_new(max_arenas, max_task_lists).unwrap()
    }

    /// Tracks an arena page.
    ///
    /// Returns false and overflows the frame if the list is full. The page
    /// is then dropped by the caller instead of being tracked.
    pub(crate) fn register_arena(&self, page: Arc<ArenaPage>) -> bool {
        let mut arenas = self.arenas.lock();
        if arenas.len() >= self.max_arenas {
            drop(arenas);
            tracing::warn!("arena registry full ({} pages)", self.max_arenas);
            self.mark_overflowed();
            return false;
        }
        arenas.push(page);
        true
    }

    /// Tracks a task page.
    ///
    /// Returns false and overflows the frame if the list is full.
    pub(crate) fn register_task_list(&self, page: Arc<TaskPage>) -> bool {
        let mut task_lists = self.task_lists.lock();
        if task_lists.len() >= self.max_task_lists {
            drop(task_lists);
            tracing::warn!("task list registry full ({} pages)", self.max_task_lists);
            self.mark_overflowed();
            return false;
        }
        task_lists.push(page);
        true
    }

    /// Marks the current frame as overflowed.
    pub(crate) fn mark_overflowed(&self) {
        if !self.overflowed.swap(true, Ordering::AcqRel) {
            tracing::warn!("frame overflowed; its submissions will be dropped");
        }
    }

    /// Returns true if any allocation or registration failed this frame.
    #[inline]
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    /// Clears the overflow flag for a new frame.
    pub(crate) fn reset_for_frame(&self) {
        self.overflowed.store(false, Ordering::Release);
    }

    /// Number of tracked arena pages.
    #[must_use]
    pub fn arena_count(&self) -> usize {
        self.arenas.lock().len()
    }

    /// Number of tracked task pages.
    #[must_use]
    pub fn task_list_count(&self) -> usize {
        self.task_lists.lock().len()
    }

    /// Total task records across all tracked task pages.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.task_lists.lock().iter().map(|page| page.len()).sum()
    }

    /// Visits every task page in registration order.
    pub fn for_each_task_list(&self, mut visitor: impl FnMut(&TaskPage)) {
        for page in self.task_lists.lock().iter() {
            visitor(page);
        }
    }

    /// Visits every arena page in registration order.
    pub fn for_each_arena(&self, mut visitor: impl FnMut(&ArenaPage)) {
        for page in self.arenas.lock().iter() {
            visitor(page);
        }
    }

    /// Moves every task record into `out`, page by page.
    pub(crate) fn drain_tasks_into(&self, out: &mut Vec<TaskRecord>) {
        self.for_each_task_list(|page| page.drain_into(out));
    }

    /// Releases every tracked page.
    ///
    /// Returns `(arena_pages, task_pages)` released. Task pages are dropped
    /// first so no record outlives the payload memory it points into.
    pub(crate) fn clear(&self) -> (usize, usize) {
        let task_pages = {
            let mut task_lists = self.task_lists.lock();
            let count = task_lists.len();
            task_lists.clear();
            count
        };
        let arena_pages = {
            let mut arenas = self.arenas.lock();
            let count = arenas.len();
            arenas.clear();
            count
        };
        (arena_pages, task_pages)
    }
}

impl std::fmt::Debug for FrameRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRegistry")
            .field("arenas", &self.arena_count())
            .field("task_lists", &self.task_list_count())
            .field("overflowed", &self.is_overflowed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oroboros_core::SortKey;

    #[test]
    fn test_register_within_capacity() {
        let registry = FrameRegistry::new(2, 2);
        assert!(registry.register_arena(ArenaPage::try_new(64).unwrap()));
        assert!(registry.register_task_list(TaskPage::try_new(4).unwrap()));
        assert_eq!(registry.arena_count(), 1);
        assert_eq!(registry.task_list_count(), 1);
        assert!(!registry.is_overflowed());
    }

    #[test]
    fn test_full_registry_overflows() {
        let registry = FrameRegistry::new(1, 1);
        assert!(registry.register_arena(ArenaPage::try_new(64).unwrap()));

        let rejected = ArenaPage::try_new(64).unwrap();
        assert!(!registry.register_arena(Arc::clone(&rejected)));
        assert!(registry.is_overflowed());
        // Not tracked: the caller holds the only reference.
        assert_eq!(Arc::strong_count(&rejected), 1);
    }

    #[test]
    fn test_reset_clears_overflow() {
        let registry = FrameRegistry::new(1, 1);
        registry.mark_overflowed();
        assert!(registry.is_overflowed());
        registry.reset_for_frame();
        assert!(!registry.is_overflowed());
    }

    #[test]
    fn test_task_count_and_clear() {
        let registry = FrameRegistry::new(4, 4);
        for count in [3, 2] {
            let page = TaskPage::try_new(8).unwrap();
            for priority in 0..count {
                page.push(TaskRecord::marker(SortKey::encode(0, 0, priority).unwrap()))
                    .unwrap();
            }
            assert!(registry.register_task_list(page));
        }
        assert!(registry.register_arena(ArenaPage::try_new(64).unwrap()));
        assert_eq!(registry.task_count(), 5);

        let mut visited = 0;
        registry.for_each_arena(|page| visited += page.capacity());
        assert_eq!(visited, 64);

        assert_eq!(registry.clear(), (1, 2));
        assert_eq!(registry.task_count(), 0);
        assert_eq!(registry.arena_count(), 0);
    }

    #[test]
    fn test_capacity_reservation_failure() {
        assert!(FrameRegistry::try_new(usize::MAX, 1).is_none());
        assert!(FrameRegistry::try_new(1, usize::MAX).is_none());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = FrameRegistry::new(64, 64);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..4 {
                        assert!(registry.register_task_list(TaskPage::try_new(1).unwrap()));
                    }
                });
            }
        });
        assert_eq!(registry.task_list_count(), 32);
    }
}
