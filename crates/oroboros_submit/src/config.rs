//! Scheduler configuration, loaded once at startup.

use std::path::Path;

use oroboros_core::memory::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default number of task records per task page.
pub const DEFAULT_TASK_PAGE_CAPACITY: usize = 32_768;

/// Default registry capacity per page kind.
pub const DEFAULT_MAX_PAGES: usize = 1024;

/// Upper bound on `max_arena_pages` and `max_task_pages`.
pub const MAX_REGISTRY_PAGES: usize = 1 << 20;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// Missing keys fall back to [`SchedulerConfig::default`]:
///
/// ```toml
/// pass_count = 7
/// arena_page_size = 2097152
/// task_page_capacity = 32768
/// max_arena_pages = 1024
/// max_task_pages = 1024
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of render passes. Ordinals are `0..pass_count`.
    pub pass_count: u8,
    /// Size of each arena page in bytes.
    pub arena_page_size: usize,
    /// Task records per task page.
    pub task_page_capacity: usize,
    /// Maximum arena pages tracked per frame before the frame overflows.
    pub max_arena_pages: usize,
    /// Maximum task pages tracked per frame before the frame overflows.
    pub max_task_pages: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pass_count: 1,
            arena_page_size: DEFAULT_PAGE_SIZE,
            task_page_capacity: DEFAULT_TASK_PAGE_CAPACITY,
            max_arena_pages: DEFAULT_MAX_PAGES,
            max_task_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl SchedulerConfig {
    /// Default limits with the given pass count.
    #[must_use]
    pub fn with_passes(pass_count: u8) -> Self {
        Self {
            pass_count,
            ..Self::default()
        }
    }

    /// Production config: headroom for a dozen worker threads at 120 FPS.
    ///
    /// 12 threads * ~4 pages each, times a 16x safety margin for bursts.
    #[must_use]
    pub const fn production(pass_count: u8) -> Self {
        Self {
            pass_count,
            arena_page_size: DEFAULT_PAGE_SIZE,
            task_page_capacity: 65_536,
            max_arena_pages: 768,
            max_task_pages: 768,
        }
    }

    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, or a validation
    /// error from [`SchedulerConfig::validate`].
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SchedulerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPassCount`] for zero passes and
    /// [`ConfigError::InvalidValue`] for zero-sized limits or registry
    /// capacities above [`MAX_REGISTRY_PAGES`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pass_count == 0 {
            return Err(ConfigError::InvalidPassCount);
        }
        for (name, value) in [
            ("arena_page_size", self.arena_page_size),
            ("task_page_capacity", self.task_page_capacity),
            ("max_arena_pages", self.max_arena_pages),
            ("max_task_pages", self.max_task_pages),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!("{name} must be non-zero")));
            }
        }
        for (name, value) in [
            ("max_arena_pages", self.max_arena_pages),
            ("max_task_pages", self.max_task_pages),
        ] {
            if value > MAX_REGISTRY_PAGES {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be at most {MAX_REGISTRY_PAGES}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
        assert!(SchedulerConfig::production(7).validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config =
            SchedulerConfig::from_toml_str("pass_count = 7\nmax_task_pages = 4\n").unwrap();
        assert_eq!(config.pass_count, 7);
        assert_eq!(config.max_task_pages, 4);
        assert_eq!(config.arena_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_zero_passes_rejected() {
        let err = SchedulerConfig::from_toml_str("pass_count = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPassCount));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err =
            SchedulerConfig::from_toml_str("pass_count = 2\narena_page_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(msg) if msg.contains("arena_page_size")));
    }

    #[test]
    fn test_oversized_registry_rejected() {
        let err = SchedulerConfig::from_toml_str(
            "pass_count = 2\nmax_arena_pages = 9223372036854775807",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(msg) if msg.contains("max_arena_pages")));

        let config = SchedulerConfig {
            max_task_pages: MAX_REGISTRY_PAGES + 1,
            ..SchedulerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let config = SchedulerConfig {
            max_arena_pages: MAX_REGISTRY_PAGES,
            max_task_pages: MAX_REGISTRY_PAGES,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let err = SchedulerConfig::from_toml_str("pass_count = \"seven\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SchedulerConfig::load("/nonexistent/oroboros/scheduler.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
