//! Run configuration
//!
//! Describes one run: which loops execute, which strategies every fire
//! dispatches, and the timing parameters of the scenario.

use std::fmt;
use std::time::Duration;

use crate::dispatch::{DetachPolicy, DispatchSet, Strategy};
use crate::util::units::format_span;
use crate::work::{Accumulation, CpuWork};
use crate::{
    Result, TickerTestError, DEFAULT_DELAY, DEFAULT_FAN_OUT, DEFAULT_ITERATION_LIMIT,
    DEFAULT_PERIOD,
};

/// Which trigger loops a run executes
///
/// Both may be selected; the interval loop then runs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSelection {
    pub ticker: bool,
    pub sleep: bool,
}

impl LoopSelection {
    pub fn is_empty(&self) -> bool {
        !(self.ticker || self.sleep)
    }
}

/// Complete description of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Period of the interval loop's ticker
    pub period: Duration,
    /// Sleep after each delay-loop iteration
    pub delay: Duration,
    /// Iteration at which a loop stops, before dispatching
    pub iteration_limit: u64,
    /// Sub-tasks per parallel dispatch
    pub fan_out: usize,
    /// Busy work performed per invocation
    pub work: CpuWork,
    pub loops: LoopSelection,
    pub dispatch: DispatchSet,
    pub accumulation: Accumulation,
    pub detach: DetachPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            delay: DEFAULT_DELAY,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            fan_out: DEFAULT_FAN_OUT,
            work: CpuWork::default(),
            loops: LoopSelection::default(),
            dispatch: DispatchSet::default(),
            accumulation: Accumulation::default(),
            detach: DetachPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Reference scenario with no loop and no strategy selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(TickerTestError::ConfigError(
                "Period must be greater than 0".to_string(),
            ));
        }

        if self.fan_out == 0 {
            return Err(TickerTestError::ConfigError(
                "Fan-out must be at least 1".to_string(),
            ));
        }

        if self.work.slices == 0 {
            return Err(TickerTestError::ConfigError(
                "Work must have at least one slice".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_iteration_limit(mut self, limit: u64) -> Self {
        self.iteration_limit = limit;
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_work(mut self, work: CpuWork) -> Self {
        self.work = work;
        self
    }

    pub fn with_loops(mut self, loops: LoopSelection) -> Self {
        self.loops = loops;
        self
    }

    pub fn with_ticker(mut self) -> Self {
        self.loops.ticker = true;
        self
    }

    pub fn with_sleep(mut self) -> Self {
        self.loops.sleep = true;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchSet) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.dispatch = self.dispatch.with(strategy);
        self
    }

    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_detach(mut self, detach: DetachPolicy) -> Self {
        self.detach = detach;
        self
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loops: Vec<&str> = [(self.loops.ticker, "ticker"), (self.loops.sleep, "sleep")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        let strategies: Vec<String> = self
            .dispatch
            .strategies()
            .iter()
            .map(ToString::to_string)
            .collect();

        write!(
            f,
            "loops=[{}] strategies=[{}] period={} delay={} limit={} fan_out={}",
            loops.join(","),
            strategies.join(","),
            format_span(self.period),
            format_span(self.delay),
            self.iteration_limit,
            self.fan_out
        )
    }
}
