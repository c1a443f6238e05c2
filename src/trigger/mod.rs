//! Trigger loops
//!
//! Two ways of repeating a dispatch: from a fixed-period ticker, where late
//! work makes fires coalesce, and from a loop that sleeps after each
//! dispatch, where late work simply adds to the period.

use std::time::Duration;

pub mod delay;
pub mod interval;
pub mod ticker;

pub use delay::DelayLoop;
pub use interval::IntervalLoop;
pub use ticker::{Fire, Ticker};

/// Where a trigger loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Suspended until the next fire (interval loop only)
    WaitingForTick,
    /// Running the current iteration, including any dispatch
    Dispatching,
    /// Iteration limit reached
    Terminated,
}

/// What a finished loop observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    /// Fires or iterations reported, including the terminating one
    pub fires: u64,
    /// Iterations that dispatched work
    pub dispatched: u64,
    /// Fires dropped while the loop was busy; always 0 for the delay loop
    pub coalesced: u64,
    pub elapsed: Duration,
}
