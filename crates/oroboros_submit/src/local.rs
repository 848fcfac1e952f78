//! Per-thread frame context.
//!
//! Each producer thread owns one [`LocalFrame`] in thread-local storage.
//! The context is tied to a [`FrameStamp`]; touching it with a different
//! stamp (a new frame, or another scheduler) resets it before use, so no
//! thread ever needs an explicit per-frame reset call.

use std::cell::RefCell;

use oroboros_core::FrameStamp;

use crate::arena::FrameArena;
use crate::task_list::TaskList;

thread_local! {
    static LOCAL_FRAME: RefCell<LocalFrame> = const { RefCell::new(LocalFrame::idle()) };
}

/// A thread's arena and task list for one frame.
#[derive(Debug)]
pub(crate) struct LocalFrame {
    stamp: FrameStamp,
    pub(crate) arena: FrameArena,
    pub(crate) tasks: TaskList,
}

impl LocalFrame {
    const fn idle() -> Self {
        Self {
            stamp: FrameStamp::IDLE,
            arena: FrameArena::new(),
            tasks: TaskList::new(),
        }
    }

    fn reset(&mut self, stamp: FrameStamp) {
        self.stamp = stamp;
        self.arena = FrameArena::new();
        self.tasks = TaskList::new();
    }

    /// Runs `f` against the calling thread's context for `stamp`.
    pub(crate) fn with<R>(stamp: FrameStamp, f: impl FnOnce(&mut LocalFrame) -> R) -> R {
        LOCAL_FRAME.with(|cell| {
            let mut local = cell.borrow_mut();
            if local.stamp != stamp {
                local.reset(stamp);
            }
            f(&mut local)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FrameRegistry;

    #[test]
    fn test_context_resets_on_new_stamp() {
        let registry = FrameRegistry::new(8, 8);
        let first = FrameStamp::new(u32::MAX, 1);

        LocalFrame::with(first, |local| {
            assert!(local.arena.allocate(8, 8, 256, first, &registry).is_some());
        });
        LocalFrame::with(first, |local| {
            assert!(local.arena.allocate(8, 8, 256, first, &registry).is_some());
        });
        // Same frame: the page was reused.
        assert_eq!(registry.arena_count(), 1);

        let second = first.next();
        LocalFrame::with(second, |local| {
            assert_eq!(local.stamp, second);
            assert!(local.arena.allocate(8, 8, 256, second, &registry).is_some());
        });
        assert_eq!(registry.arena_count(), 2);
    }
}
