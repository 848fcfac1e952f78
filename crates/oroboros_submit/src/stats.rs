//! Per-frame submission statistics.

/// Summary of one `begin_submit`/`end_submit` cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame id.
    pub frame: u32,
    /// Tasks submitted (and, unless dropped, dispatched).
    pub submitted: usize,
    /// Synthetic pass markers dispatched.
    pub markers: usize,
    /// Handler invocations.
    pub runs: usize,
    /// Arena pages released at frame end.
    pub arena_pages: usize,
    /// Task pages released at frame end.
    pub task_pages: usize,
    /// True if the frame overflowed and nothing was dispatched.
    pub dropped: bool,
}

impl FrameReport {
    /// Records handed to handlers, markers included.
    #[must_use]
    pub const fn dispatched(&self) -> usize {
        if self.dropped {
            0
        } else {
            self.submitted + self.markers
        }
    }

    /// Returns true if the frame was dropped.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.dropped
    }
}
