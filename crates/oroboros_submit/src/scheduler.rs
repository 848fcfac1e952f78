//! # Frame Scheduler
//!
//! Owns the frame lifecycle:
//!
//! ```text
//!   Idle ──begin_submit──> Submitting ──end_submit──> Consolidating ──> Dispatching ──> Idle
//!                            ▲    │
//!                            └────┘ submit / allocate (any thread)
//! ```
//!
//! `begin_submit` and `end_submit` take `&mut self`; `submit` and
//! `allocate` take `&self`. Producers therefore borrow the scheduler
//! shared (scoped threads, an `Arc` dropped before the frame ends), and the
//! borrow checker proves they are finished before consolidation starts.

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::Pod;
use oroboros_core::{FrameSlot, FrameStamp, Payload, SortKey};

use crate::config::SchedulerConfig;
use crate::consolidate::consolidate;
use crate::dispatch::dispatch;
use crate::error::{ConfigError, ConfigResult, SubmitError, SubmitResult};
use crate::local::LocalFrame;
use crate::registry::FrameRegistry;
use crate::stats::FrameReport;
use crate::task_list::TaskRecord;
use crate::technique::{Ordinal, TechniqueTable};

/// Scheduler instance ids. Zero is reserved for idle thread contexts.
static NEXT_SCHEDULER_ID: AtomicU32 = AtomicU32::new(1);

/// Where a scheduler is in its frame lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Between frames.
    Idle,
    /// Accepting `submit` and `allocate` calls.
    Submitting,
    /// Building the master list.
    Consolidating,
    /// Invoking technique handlers.
    Dispatching,
}

/// Multi-producer, per-frame command scheduler.
///
/// `C` is the shared rendering context handed to every technique handler.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut scheduler = Scheduler::new(SchedulerConfig::with_passes(3), table)?;
///
/// loop {
///     scheduler.begin_submit()?;
///     std::thread::scope(|scope| {
///         for chunk in work.chunks(256) {
///             let scheduler = &scheduler;
///             scope.spawn(move || {
///                 for item in chunk {
///                     let data = scheduler.alloc(&item.draw);
///                     scheduler.submit(item.depth, item.pass, item.technique, data)?;
///                 }
///             });
///         }
///     });
///     let report = scheduler.end_submit(&mut device)?;
/// }
/// ```
pub struct Scheduler<C> {
    config: SchedulerConfig,
    techniques: TechniqueTable<C>,
    registry: FrameRegistry,
    stamp: FrameStamp,
    phase: FramePhase,
    last_report: Option<FrameReport>,
}

impl<C> Scheduler<C> {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation or its
    /// registry capacities cannot be reserved.
    pub fn new(config: SchedulerConfig, techniques: TechniqueTable<C>) -> ConfigResult<Self> {
        config.validate()?;
        let registry = FrameRegistry::try_new(config.max_arena_pages, config.max_task_pages)
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "cannot reserve registry for {} arena and {} task pages",
                    config.max_arena_pages, config.max_task_pages
                ))
            })?;

        let id = NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "scheduler {} ready: {} passes, {} techniques, {}-byte arena pages, {}-record task pages",
            id,
            config.pass_count,
            techniques.len(),
            config.arena_page_size,
            config.task_page_capacity
        );

        Ok(Self {
            registry,
            config,
            techniques,
            stamp: FrameStamp::new(id, 0),
            phase: FramePhase::Idle,
            last_report: None,
        })
    }

    /// Opens a new frame.
    ///
    /// Increments the frame id and clears the overflow flag.
    ///
    /// # Errors
    ///
    /// [`SubmitError::AlreadySubmitting`] if the previous frame was never
    /// closed with [`Scheduler::end_submit`].
    pub fn begin_submit(&mut self) -> SubmitResult<FrameStamp> {
        if self.phase == FramePhase::Submitting {
            return Err(SubmitError::AlreadySubmitting {
                frame: self.stamp.frame,
            });
        }

        self.stamp = self.stamp.next();
        self.registry.reset_for_frame();
        self.phase = FramePhase::Submitting;
        tracing::trace!("frame {} open", self.stamp.frame);
        Ok(self.stamp)
    }

    /// Submits one task for the open frame.
    ///
    /// Callable from any thread. If the frame has overflowed, the task is
    /// accepted and discarded; the whole frame is dropped at `end_submit`.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::NotSubmitting`] outside a frame
    /// - [`SubmitError::InvalidPass`] / [`SubmitError::InvalidTechnique`]
    ///   for ordinals outside the configured ranges
    /// - [`SubmitError::InvalidPriority`] if `priority` exceeds 48 bits
    /// - [`SubmitError::StalePayload`] if `data` was allocated in another
    ///   frame or by another scheduler
    pub fn submit(
        &self,
        priority: u64,
        pass: u8,
        technique: u8,
        data: Option<Payload>,
    ) -> SubmitResult<()> {
        if self.phase != FramePhase::Submitting {
            return Err(SubmitError::NotSubmitting);
        }
        if pass >= self.config.pass_count {
            return Err(SubmitError::InvalidPass {
                pass,
                count: self.config.pass_count,
            });
        }
        if technique >= self.techniques.len() {
            return Err(SubmitError::InvalidTechnique {
                technique,
                count: self.techniques.len(),
            });
        }
        let key = SortKey::encode(pass, technique, priority)
            .ok_or(SubmitError::InvalidPriority(priority))?;
        if let Some(payload) = data {
            let stamp = payload.stamp();
            if stamp != self.stamp {
                return Err(SubmitError::StalePayload {
                    scheduler: stamp.scheduler,
                    frame: stamp.frame,
                });
            }
        }

        if self.registry.is_overflowed() {
            return Ok(());
        }

        let record = TaskRecord::new(key, data);
        let capacity = self.config.task_page_capacity;
        LocalFrame::with(self.stamp, |local| local.tasks.add(record, capacity, &self.registry));
        Ok(())
    }

    /// Submits one task using ordinal enums for pass and technique.
    ///
    /// # Errors
    ///
    /// As [`Scheduler::submit`].
    pub fn submit_ordinal<P, T>(
        &self,
        priority: u64,
        pass: P,
        technique: T,
        data: Option<Payload>,
    ) -> SubmitResult<()>
    where
        P: Ordinal,
        T: Ordinal,
    {
        self.submit(priority, pass.ordinal(), technique.ordinal(), data)
    }

    /// Allocates `bytes` bytes of frame scratch memory.
    ///
    /// The memory is zeroed and valid until [`Scheduler::end_submit`]
    /// returns. Returns `None` outside a frame, or when a page cannot be
    /// obtained; the latter overflows the frame.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn allocate(&self, bytes: u32, alignment: u32) -> Option<FrameSlot> {
        assert!(
            alignment.is_power_of_two(),
            "alignment must be a power of two, got {alignment}"
        );
        if self.phase != FramePhase::Submitting {
            tracing::warn!("allocate called outside a frame");
            return None;
        }
        if self.registry.is_overflowed() {
            return None;
        }

        let page_size = self.config.arena_page_size;
        LocalFrame::with(self.stamp, |local| {
            local
                .arena
                .allocate(bytes as usize, alignment as usize, page_size, self.stamp, &self.registry)
        })
    }

    /// Copies `value` into frame memory and returns its payload handle.
    ///
    /// Returns `None` under the same conditions as [`Scheduler::allocate`].
    pub fn alloc<T: Pod>(&self, value: &T) -> Option<Payload> {
        let bytes = u32::try_from(std::mem::size_of::<T>()).ok()?;
        let alignment = u32::try_from(std::mem::align_of::<T>()).ok()?;
        let mut slot = self.allocate(bytes, alignment)?;
        slot.write(value);
        Some(slot.finish())
    }

    /// Closes the frame: consolidates, dispatches, and releases all frame
    /// memory.
    ///
    /// An overflowed frame is dropped whole: no handler is invoked and the
    /// returned report has `dropped` set.
    ///
    /// # Errors
    ///
    /// [`SubmitError::NotSubmitting`] if no frame is open.
    pub fn end_submit(&mut self, shared: &mut C) -> SubmitResult<FrameReport> {
        if self.phase != FramePhase::Submitting {
            return Err(SubmitError::NotSubmitting);
        }
        self.phase = FramePhase::Consolidating;

        let mut report = FrameReport {
            frame: self.stamp.frame,
            submitted: self.registry.task_count(),
            ..FrameReport::default()
        };

        match consolidate(&self.registry, self.config.pass_count, self.techniques.last()) {
            Some(master) => {
                self.phase = FramePhase::Dispatching;
                report.submitted = master.submitted();
                report.markers = master.markers();
                report.runs = dispatch(&master, &self.techniques, shared);
                // Records must go before the pages their payloads live in.
                drop(master);
            }
            None => {
                report.dropped = true;
                tracing::warn!(
                    "frame {} overflowed: dropping {} submitted tasks",
                    report.frame,
                    report.submitted
                );
            }
        }

        (report.arena_pages, report.task_pages) = self.registry.clear();
        self.phase = FramePhase::Idle;

        tracing::debug!(
            "frame {}: {} tasks, {} runs, {} arena pages, {} task pages released",
            report.frame,
            report.submitted,
            report.runs,
            report.arena_pages,
            report.task_pages
        );
        self.last_report = Some(report);
        Ok(report)
    }

    /// Current lifecycle phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Id of the current (or last) frame. Zero before the first frame.
    #[inline]
    #[must_use]
    pub const fn frame_id(&self) -> u32 {
        self.stamp.frame
    }

    /// Stamp of the current (or last) frame.
    #[inline]
    #[must_use]
    pub const fn stamp(&self) -> FrameStamp {
        self.stamp
    }

    /// Returns true if the current frame has overflowed.
    #[inline]
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.registry.is_overflowed()
    }

    /// Report of the most recently closed frame.
    #[inline]
    #[must_use]
    pub const fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }

    /// Configuration in use.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of passes.
    #[inline]
    #[must_use]
    pub const fn pass_count(&self) -> u8 {
        self.config.pass_count
    }

    /// Number of techniques.
    #[inline]
    #[must_use]
    pub fn technique_count(&self) -> u8 {
        self.techniques.len()
    }

    /// Read-only view of the frame registry (page and task counts, overflow
    /// state). Pages can only be registered by the scheduler itself:
    ///
    /// ```compile_fail
    /// fn poison(scheduler: &oroboros_submit::Scheduler<()>) {
    ///     scheduler.registry().mark_overflowed();
    /// }
    /// ```
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &FrameRegistry {
        &self.registry
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("stamp", &self.stamp)
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("techniques", &self.techniques)
            .field("registry", &self.registry)
            .finish()
    }
}
