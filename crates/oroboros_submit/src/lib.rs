//! # OROBOROS Submit
//!
//! Multi-producer, per-frame render command scheduling.
//!
//! Any number of threads record tasks between [`Scheduler::begin_submit`]
//! and [`Scheduler::end_submit`]. Each task carries a 64-bit
//! [`SortKey`](oroboros_core::SortKey) built from its pass, technique and
//! priority, plus an optional payload in frame scratch memory. At frame end
//! the scheduler:
//!
//! 1. Merges every thread's task pages into one master list
//! 2. Brackets each pass with begin/end markers and appends a sentinel
//! 3. Stable-sorts by key
//! 4. Calls one technique handler per `(pass, technique)` run
//! 5. Releases all frame memory in bulk
//!
//! ## Architecture Rules
//!
//! 1. **No locks on the hot path** - `submit` appends to a thread-local page
//! 2. **No per-task frees** - pages are dropped wholesale at frame end
//! 3. **All or nothing** - an overflowed frame is dropped, never half-drawn
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_submit::{Scheduler, SchedulerConfig, TechniqueTable};
//!
//! let table = TechniqueTable::builder(3)
//!     .register(0, |run, ctx: &mut Ctx| ctx.begin_pass(run.pass()))?
//!     .register(1, |run, ctx: &mut Ctx| {
//!         for task in run {
//!             ctx.draw(task.payload_as::<Draw>().unwrap());
//!         }
//!     })?
//!     .register(2, |run, ctx: &mut Ctx| ctx.end_pass(run.pass()))?
//!     .build()?;
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::with_passes(2), table)?;
//! scheduler.begin_submit()?;
//! let data = scheduler.alloc(&Draw { mesh: 7 });
//! scheduler.submit(depth, 0, 1, data)?;
//! let report = scheduler.end_submit(&mut ctx)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

mod arena;
pub mod config;
mod consolidate;
mod dispatch;
pub mod error;
mod local;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod task_list;
pub mod technique;

pub use config::SchedulerConfig;
pub use error::{ConfigError, ConfigResult, SubmitError, SubmitResult};
pub use registry::FrameRegistry;
pub use scheduler::{FramePhase, Scheduler};
pub use stats::FrameReport;
pub use task_list::{TaskPage, TaskRecord};
pub use technique::{Ordinal, TaskRun, Technique, TechniqueTable, TechniqueTableBuilder};

pub use oroboros_core::{FrameSlot, FrameStamp, Payload, SortKey};
