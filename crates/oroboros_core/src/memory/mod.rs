//! # Frame Memory
//!
//! Bump pages and the handles that point into them.
//!
//! ## Design Philosophy
//!
//! Submission payloads live for exactly one frame. Instead of tracking
//! individual objects, memory is carved from fixed-size pages:
//! - Allocation is a pointer bump
//! - There is no per-object free
//! - Whole pages are dropped at frame end

mod arena;
mod slot;

pub use arena::{ArenaPage, DEFAULT_PAGE_SIZE, PAGE_ALIGN};
pub use slot::{FrameSlot, FrameStamp, Payload};
