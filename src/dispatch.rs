//! Dispatch strategies
//!
//! Decides how a workload invocation runs relative to the trigger loop:
//! awaited on the blocking pool (direct), fanned out and awaited (parallel),
//! or handed to its own thread and never awaited (detached).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::Local;
use tokio::task;
use tracing::{debug, warn};

use crate::report::{Event, Reporter};
use crate::work::{perform, ParallelDispatch, Workload};
use crate::{Result, TickerTestError};

/// How one workload invocation is executed relative to the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Sequential run, loop waits for it
    Direct,
    /// Fan-out run, loop waits for every sub-task
    Parallel,
    /// Fire-and-forget run on its own thread
    Detached,
}

impl Strategy {
    /// Whether the loop is suspended until the work completes
    pub fn blocks_loop(&self) -> bool {
        !matches!(self, Strategy::Detached)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Parallel => write!(f, "parallel"),
            Strategy::Detached => write!(f, "detached"),
        }
    }
}

/// Strategies to run on every fire
///
/// The flags are independent: several may be set, in which case each runs
/// once per fire in the order direct, parallel, detached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSet {
    pub direct: bool,
    pub parallel: bool,
    pub detached: bool,
}

impl DispatchSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn only(strategy: Strategy) -> Self {
        Self::none().with(strategy)
    }

    pub fn with(mut self, strategy: Strategy) -> Self {
        match strategy {
            Strategy::Direct => self.direct = true,
            Strategy::Parallel => self.parallel = true,
            Strategy::Detached => self.detached = true,
        }
        self
    }

    /// Selected strategies in execution order
    pub fn strategies(&self) -> Vec<Strategy> {
        [
            (self.direct, Strategy::Direct),
            (self.parallel, Strategy::Parallel),
            (self.detached, Strategy::Detached),
        ]
        .into_iter()
        .filter_map(|(on, strategy)| on.then_some(strategy))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.direct || self.parallel || self.detached)
    }
}

/// What happens to detached work when the run ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetachPolicy {
    /// Never joined; process exit may cut it short
    #[default]
    Detach,
    /// Handles are kept and joined by [`Dispatcher::settle`]
    Track,
}

/// Count of workload invocations currently running, and the highest seen
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one invocation as running until the guard drops
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    gauge: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs the selected strategies for one fire
pub struct Dispatcher {
    workload: Arc<dyn Workload>,
    strategies: DispatchSet,
    parallel: ParallelDispatch,
    detach: DetachPolicy,
    reporter: Arc<dyn Reporter>,
    in_flight: Arc<InFlight>,
    detached: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        workload: Arc<dyn Workload>,
        strategies: DispatchSet,
        parallel: ParallelDispatch,
        detach: DetachPolicy,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            workload,
            strategies,
            parallel,
            detach,
            reporter,
            in_flight: Arc::new(InFlight::new()),
            detached: Mutex::new(Vec::new()),
        }
    }

    pub fn strategies(&self) -> DispatchSet {
        self.strategies
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Run every selected strategy once for `iteration`
    ///
    /// Returns when the blocking strategies have completed; detached work is
    /// still running at that point.
    pub async fn dispatch(&self, iteration: u64) -> Result<()> {
        for strategy in self.strategies.strategies() {
            self.reporter.report(Event::WorkStarted {
                iteration,
                strategy,
                at: Local::now(),
            });
            match strategy {
                Strategy::Direct => self.run_direct(iteration).await?,
                Strategy::Parallel => self.run_parallel(iteration).await?,
                Strategy::Detached => self.run_detached(iteration)?,
            }
        }
        Ok(())
    }

    async fn run_direct(&self, iteration: u64) -> Result<()> {
        let _guard = self.in_flight.enter();
        let workload = Arc::clone(&self.workload);
        let report =
            task::spawn_blocking(move || perform(&*workload, iteration, Strategy::Direct)).await?;
        self.reporter.report(Event::WorkFinished(report));
        Ok(())
    }

    async fn run_parallel(&self, iteration: u64) -> Result<()> {
        let _guard = self.in_flight.enter();
        let report = self
            .parallel
            .run(Arc::clone(&self.workload), iteration, &*self.reporter)
            .await?;
        self.reporter.report(Event::WorkFinished(report));
        Ok(())
    }

    fn run_detached(&self, iteration: u64) -> Result<()> {
        let guard = self.in_flight.enter();
        debug!(
            iteration,
            in_flight = self.in_flight.current(),
            "detaching workload"
        );

        let workload = Arc::clone(&self.workload);
        let reporter = Arc::clone(&self.reporter);
        let handle = std::thread::Builder::new()
            .name(format!("detached-{}", iteration))
            .spawn(move || {
                let report = perform(&*workload, iteration, Strategy::Detached);
                drop(guard);
                reporter.report(Event::WorkFinished(report));
            })?;

        if self.detach == DetachPolicy::Track {
            self.lock_detached().push(handle);
        }
        Ok(())
    }

    /// Wait for tracked detached work; returns how many were joined
    ///
    /// With [`DetachPolicy::Detach`] nothing is tracked and this returns 0
    /// immediately.
    pub async fn settle(&self) -> Result<usize> {
        let handles = std::mem::take(&mut *self.lock_detached());
        if handles.is_empty() {
            return Ok(0);
        }

        let joined = task::spawn_blocking(move || {
            let mut joined = 0usize;
            let mut panicked = 0usize;
            for handle in handles {
                match handle.join() {
                    Ok(()) => joined += 1,
                    Err(_) => panicked += 1,
                }
            }
            (joined, panicked)
        })
        .await?;

        match joined {
            (joined, 0) => Ok(joined),
            (_, panicked) => {
                warn!(panicked, "detached workloads panicked");
                Err(TickerTestError::WorkerError(format!(
                    "{} detached workload(s) panicked",
                    panicked
                )))
            }
        }
    }

    fn lock_detached(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.detached.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
