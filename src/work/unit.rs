//! Workload unit
//!
//! The stand-in for "real work": a busy computation made of slices. One
//! invocation runs every slice on the calling thread; the parallel
//! dispatcher instead hands one slice to each of its sub-tasks.

use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::dispatch::Strategy;
use crate::util::units::{format_millis, format_timestamp};
use crate::{DEFAULT_SLICES, DEFAULT_SLICE_FLOOR, DEFAULT_SPINS_PER_SLICE};

/// A unit of work that can be split into equal slices
pub trait Workload: fmt::Debug + Send + Sync + 'static {
    /// Perform one slice and return its partial count
    fn slice(&self) -> u64;

    /// Number of slices in one full invocation
    fn slices(&self) -> usize;
}

/// CPU-bound tight loop
///
/// The operation count is fixed by `spins_per_slice`. When `slice_floor` is
/// set, a slice that finishes its spins early keeps the CPU busy (without
/// counting) until strictly more than the floor has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuWork {
    pub slices: usize,
    pub spins_per_slice: u64,
    pub slice_floor: Option<Duration>,
}

impl Default for CpuWork {
    fn default() -> Self {
        Self {
            slices: DEFAULT_SLICES,
            spins_per_slice: DEFAULT_SPINS_PER_SLICE,
            slice_floor: Some(DEFAULT_SLICE_FLOOR),
        }
    }
}

impl CpuWork {
    /// Work with no duration floor
    pub fn new(slices: usize, spins_per_slice: u64) -> Self {
        Self {
            slices,
            spins_per_slice,
            slice_floor: None,
        }
    }

    pub fn with_slice_floor(mut self, floor: Duration) -> Self {
        self.slice_floor = Some(floor);
        self
    }

    /// Lower bound on one full invocation's duration
    pub fn minimum_duration(&self) -> Duration {
        self.slice_floor.unwrap_or(Duration::ZERO) * self.slices as u32
    }
}

impl Workload for CpuWork {
    fn slice(&self) -> u64 {
        let started = Instant::now();
        let mut count = 0u64;
        for _ in 0..self.spins_per_slice {
            count = black_box(count + 1);
        }
        if let Some(floor) = self.slice_floor {
            while started.elapsed() <= floor {
                std::hint::spin_loop();
            }
        }
        count
    }

    fn slices(&self) -> usize {
        self.slices
    }
}

/// Blocking stand-in with an exact slice duration
///
/// Parks the thread instead of burning CPU, for runs that need a precise
/// workload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepWork {
    pub slices: usize,
    pub slice: Duration,
}

impl SleepWork {
    pub fn new(slices: usize, slice: Duration) -> Self {
        Self { slices, slice }
    }

    pub fn minimum_duration(&self) -> Duration {
        self.slice * self.slices as u32
    }
}

impl Workload for SleepWork {
    fn slice(&self) -> u64 {
        std::thread::sleep(self.slice);
        1
    }

    fn slices(&self) -> usize {
        self.slices
    }
}

/// Outcome of one workload invocation
#[derive(Debug, Clone)]
pub struct WorkReport {
    pub iteration: u64,
    pub strategy: Strategy,
    /// Concurrent sub-tasks used, 1 for a sequential run
    pub fan_out: usize,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub elapsed: Duration,
    pub total: u64,
}

impl fmt::Display for WorkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} work {} finished {} (duration {}",
            self.strategy,
            self.iteration,
            format_timestamp(&self.finished),
            format_millis(self.elapsed)
        )?;
        if self.fan_out > 1 {
            write!(f, ", {} sub-tasks", self.fan_out)?;
        }
        write!(f, ", total {})", self.total)
    }
}

/// Run every slice of `workload` on the calling thread
pub fn perform(workload: &dyn Workload, iteration: u64, strategy: Strategy) -> WorkReport {
    let started = Local::now();
    let clock = Instant::now();

    let mut total = 0u64;
    for _ in 0..workload.slices() {
        total += workload.slice();
    }

    WorkReport {
        iteration,
        strategy,
        fan_out: 1,
        started,
        finished: Local::now(),
        elapsed: clock.elapsed(),
        total,
    }
}
