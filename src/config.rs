//! Engine configuration
//!
//! Controls the retry budget before quarantine, the number of rows of one
//! batch in flight at once, the scheduler interval and how long persisted
//! log entries are kept.

use std::time::Duration;
use tracing::warn;

/// Default retry budget before a row is quarantined
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Default number of rows of one batch processed concurrently
pub const DEFAULT_MAX_CONCURRENT_ROWS: usize = 2;

/// Default scheduler interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default retention of persisted log entries
pub const DEFAULT_LOG_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration shared by every scheduler, pipeline and dispatcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Recoveries of a stuck claim allowed before a row becomes `FAILED_PERMANENT`
    pub max_retry: u32,
    /// Semaphore size of the per-batch dispatcher
    pub max_concurrent_rows: usize,
    /// Period of the scheduler trigger
    pub interval: Duration,
    /// Log entries older than this are purged at the end of each tick
    pub log_retention: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            max_concurrent_rows: DEFAULT_MAX_CONCURRENT_ROWS,
            interval: DEFAULT_INTERVAL,
            log_retention: DEFAULT_LOG_RETENTION,
        }
    }
}

impl EngineConfig {
    /// Create a config with custom values
    ///
    /// Zero values are unusable (a zero semaphore never grants a permit, a
    /// zero interval spins) and fall back to the defaults with a warning.
    pub fn new(
        max_retry: u32,
        max_concurrent_rows: usize,
        interval: Duration,
        log_retention: Duration,
    ) -> Self {
        let default = Self::default();

        let max_retry = if max_retry == 0 {
            warn!(
                value = max_retry,
                default = default.max_retry,
                "Invalid max_retry, using default"
            );
            default.max_retry
        } else {
            max_retry
        };

        let max_concurrent_rows = if max_concurrent_rows == 0 {
            warn!(
                value = max_concurrent_rows,
                default = default.max_concurrent_rows,
                "Invalid max_concurrent_rows, using default"
            );
            default.max_concurrent_rows
        } else {
            max_concurrent_rows
        };

        let interval = if interval.is_zero() {
            warn!(default_secs = default.interval.as_secs(), "Invalid interval, using default");
            default.interval
        } else {
            interval
        };

        let log_retention = if log_retention.is_zero() {
            warn!(
                default_secs = default.log_retention.as_secs(),
                "Invalid log_retention, using default"
            );
            default.log_retention
        } else {
            log_retention
        };

        Self {
            max_retry,
            max_concurrent_rows,
            interval,
            log_retention,
        }
    }
}
