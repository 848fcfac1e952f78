//! # Submission Error Types
//!
//! Caller errors are reported synchronously. Resource exhaustion is NOT an
//! error here: it is recorded in the frame's overflow flag and surfaces in
//! the [`FrameReport`](crate::FrameReport) returned by `end_submit`.

use thiserror::Error;

/// Errors returned by the frame submission API.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// `submit`/`end_submit` called outside a `begin_submit` window.
    #[error("no frame is being submitted; call begin_submit first")]
    NotSubmitting,

    /// `begin_submit` called while a frame is already open.
    #[error("frame {frame} is still open; begin_submit calls must not nest")]
    AlreadySubmitting {
        /// The open frame.
        frame: u32,
    },

    /// Priority has bits set outside the 48-bit field.
    #[error("priority {0:#x} does not fit in 48 bits")]
    InvalidPriority(u64),

    /// Pass ordinal outside the configured range.
    #[error("pass {pass} out of range (pass count {count})")]
    InvalidPass {
        /// The rejected ordinal.
        pass: u8,
        /// Configured pass count.
        count: u8,
    },

    /// Technique ordinal outside the dispatch table.
    #[error("technique {technique} out of range (technique count {count})")]
    InvalidTechnique {
        /// The rejected ordinal.
        technique: u8,
        /// Number of registered techniques.
        count: u8,
    },

    /// Payload was allocated in another frame or by another scheduler.
    #[error("payload from scheduler {scheduler} frame {frame} is not valid in the current frame")]
    StalePayload {
        /// Scheduler that allocated the payload.
        scheduler: u32,
        /// Frame the payload was allocated in.
        frame: u32,
    },
}

/// Errors raised while building a scheduler or its technique table.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Pass count must be at least one.
    #[error("pass count must be at least 1")]
    InvalidPassCount,

    /// Pass-begin and pass-end handlers need two distinct ordinals.
    #[error("at least 2 techniques are required (pass begin and pass end), got {0}")]
    TooFewTechniques(u8),

    /// Technique registered outside the table.
    #[error("technique {technique} out of range (technique count {count})")]
    TechniqueOutOfRange {
        /// The rejected ordinal.
        technique: u8,
        /// Table size.
        count: u8,
    },

    /// Same ordinal registered twice.
    #[error("technique {0} registered twice")]
    DuplicateTechnique(u8),

    /// A table slot was never filled.
    #[error("technique {0} has no handler")]
    MissingTechnique(u8),

    /// A numeric setting is out of range.
    #[error("invalid configuration: {0}")]
    InvalidValue(String),

    /// Config file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
