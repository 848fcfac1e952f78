//! # OROBOROS Core Frame Memory
//!
//! Building blocks for per-frame command submission:
//! - A packed 64-bit [`SortKey`] with a documented bit layout
//! - Fixed-size [`ArenaPage`] bump pages, reclaimed wholesale
//! - [`FrameSlot`] / [`Payload`] handles into those pages
//!
//! ## Architecture Rules
//!
//! 1. **No per-object frees** - pages are dropped in bulk at frame end
//! 2. **Pointer stability** - a page never moves or grows once created
//! 3. **Fail soft on exhaustion** - page creation reports `None`, never aborts
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_core::{ArenaPage, SortKey};
//!
//! let page = ArenaPage::try_new(2 * 1024 * 1024).expect("page");
//! let ptr = page.bump(64, 16).expect("fits");
//! let key = SortKey::encode(2, 4, 5).expect("48-bit priority");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod key;
pub mod memory;

pub use key::SortKey;
pub use memory::{ArenaPage, FrameSlot, FrameStamp, Payload};
