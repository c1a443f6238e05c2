//! Run selector
//!
//! Wires a [`RunConfig`] into a dispatcher and the selected trigger loops,
//! then runs them in order: interval loop, delay loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::RunConfig;
use crate::dispatch::Dispatcher;
use crate::report::{Event, Reporter};
use crate::trigger::{DelayLoop, IntervalLoop, LoopSummary};
use crate::work::{ParallelDispatch, Workload};
use crate::Result;

/// What a complete run observed
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started: DateTime<Local>,
    pub interval: Option<LoopSummary>,
    pub delay: Option<LoopSummary>,
    /// Most workload invocations running at the same time
    pub peak_in_flight: usize,
    /// Detached invocations joined before finishing (tracked policy only)
    pub settled: usize,
    pub elapsed: Duration,
}

pub struct Runner {
    config: RunConfig,
    workload: Arc<dyn Workload>,
    reporter: Arc<dyn Reporter>,
}

impl Runner {
    /// Runner using the config's CPU-bound work
    pub fn new(config: RunConfig, reporter: Arc<dyn Reporter>) -> Self {
        let workload: Arc<dyn Workload> = Arc::new(config.work.clone());
        Self {
            config,
            workload,
            reporter,
        }
    }

    /// Replace the config's CPU work with another workload
    pub fn with_workload(mut self, workload: Arc<dyn Workload>) -> Self {
        self.workload = workload;
        self
    }

    pub async fn run(self) -> Result<RunSummary> {
        self.config.validate()?;

        let clock = Instant::now();
        let started = Local::now();
        info!(config = %self.config, "starting run");
        self.reporter.report(Event::AppStarted { at: started });

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&self.workload),
            self.config.dispatch,
            ParallelDispatch::new(self.config.fan_out, self.config.accumulation),
            self.config.detach,
            Arc::clone(&self.reporter),
        ));

        let interval = if self.config.loops.ticker {
            let mut interval = IntervalLoop::new(
                self.config.period,
                self.config.iteration_limit,
                Arc::clone(&dispatcher),
                Arc::clone(&self.reporter),
            );
            Some(interval.run().await?)
        } else {
            None
        };

        let delay = if self.config.loops.sleep {
            let mut delay = DelayLoop::new(
                self.config.delay,
                self.config.iteration_limit,
                Arc::clone(&dispatcher),
                Arc::clone(&self.reporter),
            );
            Some(delay.run().await?)
        } else {
            None
        };

        let settled = dispatcher.settle().await?;
        self.reporter.report(Event::Finished);

        let summary = RunSummary {
            started,
            interval,
            delay,
            peak_in_flight: dispatcher.in_flight().peak(),
            settled,
            elapsed: clock.elapsed(),
        };
        info!(
            peak_in_flight = summary.peak_in_flight,
            still_running = dispatcher.in_flight().current(),
            "run finished"
        );
        Ok(summary)
    }
}
