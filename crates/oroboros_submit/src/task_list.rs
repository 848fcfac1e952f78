//! # Task List
//!
//! Append-only pages of `(key, payload)` records, one chain per thread per
//! frame. Records are kept in submission order so the end-of-frame stable
//! sort preserves per-thread order for equal keys.

#![allow(unsafe_code)]

use std::sync::{Arc, Weak};

use bytemuck::Pod;
use oroboros_core::{Payload, SortKey};
use parking_lot::Mutex;

use crate::registry::FrameRegistry;

/// One submitted unit of work: a sort key plus an optional payload.
///
/// Records only exist inside the scheduler's pages and master list. They
/// are not `Clone` and cannot be built outside this crate, which is what
/// makes [`TaskRecord::payload`] safe: a record is only ever visible while
/// the frame memory its payload points into is alive.
#[derive(Debug)]
pub struct TaskRecord {
    key: SortKey,
    data: Option<Payload>,
}

impl TaskRecord {
    #[inline]
    pub(crate) const fn new(key: SortKey, data: Option<Payload>) -> Self {
        Self { key, data }
    }

    /// Payload-less record (pass markers and the sentinel).
    #[inline]
    pub(crate) const fn marker(key: SortKey) -> Self {
        Self { key, data: None }
    }

    /// The packed sort key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> SortKey {
        self.key
    }

    /// Pass ordinal.
    #[inline]
    #[must_use]
    pub const fn pass(&self) -> u8 {
        self.key.pass()
    }

    /// Technique ordinal.
    #[inline]
    #[must_use]
    pub const fn technique(&self) -> u8 {
        self.key.technique()
    }

    /// Priority within the `(pass, technique)` bucket.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u64 {
        self.key.priority()
    }

    /// Returns true if a payload was attached at submission.
    #[inline]
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        self.data.is_some()
    }

    /// The payload bytes, if any.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        // SAFETY: records are only reachable from live task pages and the
        // master list, and both are dropped before the arena pages they
        // reference. Submission rejects payloads stamped by other frames.
        self.data.map(|payload| unsafe { payload.bytes() })
    }

    /// The payload reinterpreted as `T`.
    ///
    /// Returns `None` if there is no payload or its size or alignment does
    /// not match `T`.
    #[inline]
    #[must_use]
    pub fn payload_as<T: Pod>(&self) -> Option<&T> {
        bytemuck::try_from_bytes(self.payload()?).ok()
    }
}

/// A fixed-capacity page of task records.
///
/// Filled by exactly one thread during submission; drained by the
/// consolidator once submission has finished. The mutex is uncontended on
/// the submit path.
pub struct TaskPage {
    records: Mutex<Vec<TaskRecord>>,
    capacity: usize,
}

impl TaskPage {
    /// Creates a page that holds `capacity` records.
    ///
    /// Returns `None` if `capacity` is zero or the reservation fails.
    #[must_use]
    pub fn try_new(capacity: usize) -> Option<Arc<Self>> {
        if capacity == 0 {
            return None;
        }
        let mut records = Vec::new();
        records.try_reserve_exact(capacity).ok()?;
        Some(Arc::new(Self {
            records: Mutex::new(records),
            capacity,
        }))
    }

    /// Maximum number of records.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if the page holds no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a record, handing it back if the page is full.
    pub(crate) fn push(&self, record: TaskRecord) -> Result<(), TaskRecord> {
        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            return Err(record);
        }
        records.push(record);
        Ok(())
    }

    /// Moves every record into `out`, in append order.
    pub(crate) fn drain_into(&self, out: &mut Vec<TaskRecord>) {
        out.append(&mut self.records.lock());
    }
}

impl std::fmt::Debug for TaskPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPage")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A thread's chain of task pages for the current frame.
///
/// Holds only a weak handle: the registry owns the pages, so they are
/// released at frame end whether or not this thread submits again.
#[derive(Debug)]
pub(crate) struct TaskList {
    current: Weak<TaskPage>,
}

impl TaskList {
    pub(crate) const fn new() -> Self {
        Self { current: Weak::new() }
    }

    /// Appends `record`, starting a new registered page when the current
    /// one is full or missing.
    ///
    /// Returns false if the record was dropped because a page could not be
    /// created or registered; the frame is overflowed in that case.
    pub(crate) fn add(
        &mut self,
        record: TaskRecord,
        page_capacity: usize,
        registry: &FrameRegistry,
    ) -> bool {
        let record = match self.current.upgrade() {
            Some(page) => match page.push(record) {
                Ok(()) => return true,
                Err(record) => record,
            },
            None => record,
        };

        let Some(page) = TaskPage::try_new(page_capacity) else {
            tracing::warn!("task page allocation failed ({} records)", page_capacity);
            registry.mark_overflowed();
            return false;
        };
        if !registry.register_task_list(Arc::clone(&page)) {
            return false;
        }
        tracing::trace!("new task page ({} records)", page_capacity);

        self.current = Arc::downgrade(&page);
        page.push(record).is_ok()
    }
}
