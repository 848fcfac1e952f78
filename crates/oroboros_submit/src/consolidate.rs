//! # Consolidation
//!
//! Merges every thread's task pages into one sorted master list:
//!
//! ```text
//! [begin 0 .. begin N-1] [thread A tasks] [thread B tasks] ... [end 0 .. end N-1] [sentinel]
//!                                   │
//!                            stable sort by key
//!                                   ▼
//! [begin 0] [pass 0 tasks] [end 0] [begin 1] ... [end N-1] [sentinel]
//! ```
//!
//! The sort is stable, so records with identical keys keep the order they
//! had above: per-thread submission order survives.

use oroboros_core::SortKey;

use crate::registry::FrameRegistry;
use crate::task_list::TaskRecord;

/// The frame's sorted tasks, markers, and terminal sentinel.
///
/// Internal to `end_submit`; handlers only ever see [`TaskRun`] slices of it.
///
/// ```compile_fail
/// use oroboros_submit::MasterList;
/// ```
///
/// [`TaskRun`]: crate::TaskRun
#[derive(Debug)]
pub(crate) struct MasterList {
    records: Vec<TaskRecord>,
    submitted: usize,
}

impl MasterList {
    /// All records in dispatch order. The last one is the sentinel.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Total records including markers and the sentinel.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records that came from `submit` calls.
    #[inline]
    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    /// Synthetic pass markers.
    #[inline]
    #[must_use]
    pub fn markers(&self) -> usize {
        self.len() - self.submitted - 1
    }
}

/// Builds the master list, draining every registered task page.
///
/// Returns `None` without touching the pages if the frame overflowed, or
/// if the master list itself cannot be allocated (which overflows it).
pub(crate) fn consolidate(
    registry: &FrameRegistry,
    pass_count: u8,
    last_technique: u8,
) -> Option<MasterList> {
    if registry.is_overflowed() {
        return None;
    }

    let submitted = registry.task_count();
    let total = submitted + 2 * usize::from(pass_count) + 1;

    let mut records = Vec::new();
    if records.try_reserve_exact(total).is_err() {
        tracing::warn!("master list allocation failed ({} records)", total);
        registry.mark_overflowed();
        return None;
    }

    records.extend((0..pass_count).map(|pass| TaskRecord::marker(SortKey::pass_begin(pass))));
    registry.drain_tasks_into(&mut records);
    records.extend(
        (0..pass_count).map(|pass| TaskRecord::marker(SortKey::pass_end(pass, last_technique))),
    );
    records.push(TaskRecord::marker(SortKey::SENTINEL));
    debug_assert_eq!(records.len(), total);

    records.sort_by_key(TaskRecord::key);

    Some(MasterList { records, submitted })
}
