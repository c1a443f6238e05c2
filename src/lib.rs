//! tickertest - ticker vs. long-running work
//!
//! Runs a unit of work from a fixed-period ticker (or from a loop with a
//! trailing sleep) and reports when each fire, dispatch and completion
//! happens, so the effect of work that outlasts the period can be observed.

use std::fmt;
use std::time::Duration;

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod report;
pub mod runner;
pub mod trigger;
pub mod util;
pub mod work;

#[derive(Debug)]
pub enum TickerTestError {
    /// Run configuration failed validation
    ConfigError(String),
    /// A worker thread panicked or was cancelled before reporting
    WorkerError(String),
    /// The trigger source stopped delivering fires
    TimerError(String),
    /// OS-level failure, e.g. a worker thread could not be spawned
    IoError(std::io::Error),
}

impl fmt::Display for TickerTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerTestError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            TickerTestError::WorkerError(msg) => write!(f, "Worker error: {}", msg),
            TickerTestError::TimerError(msg) => write!(f, "Timer error: {}", msg),
            TickerTestError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for TickerTestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TickerTestError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TickerTestError {
    fn from(err: std::io::Error) -> Self {
        TickerTestError::IoError(err)
    }
}

impl From<tokio::task::JoinError> for TickerTestError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            TickerTestError::WorkerError(format!("worker panicked: {}", err))
        } else {
            TickerTestError::WorkerError(format!("worker cancelled: {}", err))
        }
    }
}

/// Result type alias for tickertest operations
pub type Result<T> = std::result::Result<T, TickerTestError>;

// Reference scenario
pub const APP_NAME: &str = "tickertest";
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_ITERATION_LIMIT: u64 = 5;
pub const DEFAULT_FAN_OUT: usize = 10;
pub const DEFAULT_SLICES: usize = 10;
pub const DEFAULT_SPINS_PER_SLICE: u64 = 100_000_000;
pub const DEFAULT_SLICE_FLOOR: Duration = Duration::from_millis(12);
