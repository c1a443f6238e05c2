//! Interval-driven trigger loop
//!
//! Waits for each ticker fire, reports it, and dispatches work. Awaiting a
//! blocking strategy keeps the loop away from the ticker, so fires that land
//! during the work are coalesced and the loop runs no faster than the work.
//! A detached strategy returns at once and invocations pile up instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::trace;

use crate::dispatch::Dispatcher;
use crate::report::{Event, Reporter};
use crate::trigger::{LoopState, LoopSummary, Ticker};
use crate::{Result, TickerTestError};

pub struct IntervalLoop {
    period: Duration,
    limit: u64,
    dispatcher: Arc<Dispatcher>,
    reporter: Arc<dyn Reporter>,
    state: LoopState,
}

impl IntervalLoop {
    pub fn new(
        period: Duration,
        limit: u64,
        dispatcher: Arc<Dispatcher>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            period,
            limit,
            dispatcher,
            reporter,
            state: LoopState::WaitingForTick,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until the fire numbered `limit` arrives
    ///
    /// Fires 0..limit each dispatch once; fire `limit` is reported and ends
    /// the loop without dispatching.
    pub async fn run(&mut self) -> Result<LoopSummary> {
        let clock = Instant::now();
        let mut ticker = Ticker::start(self.period)?;
        let mut previous = Instant::now();
        let mut tick = 0u64;
        self.transition(LoopState::WaitingForTick);

        loop {
            let fire = ticker.next().await.ok_or_else(|| {
                TickerTestError::TimerError("ticker stopped delivering fires".to_string())
            })?;
            self.transition(LoopState::Dispatching);

            self.reporter.report(Event::TickStarted {
                tick,
                fired_at: fire.wall,
            });
            self.reporter.report(Event::TickDrift {
                tick,
                since_last: previous.elapsed(),
            });
            previous = fire.at;

            if tick == self.limit {
                self.transition(LoopState::Terminated);
                break;
            }

            self.dispatcher.dispatch(tick).await?;

            self.reporter.report(Event::TickFinished {
                tick,
                at: Local::now(),
            });
            tick += 1;
            self.transition(LoopState::WaitingForTick);
        }

        Ok(LoopSummary {
            fires: tick + 1,
            dispatched: tick,
            coalesced: ticker.coalesced(),
            elapsed: clock.elapsed(),
        })
    }

    fn transition(&mut self, next: LoopState) {
        trace!(from = ?self.state, to = ?next, "interval loop");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DetachPolicy, DispatchSet, Strategy};
    use crate::report::Recorder;
    use crate::work::{CpuWork, ParallelDispatch, SleepWork, Workload};

    fn build(
        period: Duration,
        limit: u64,
        strategies: DispatchSet,
        workload: Arc<dyn Workload>,
    ) -> (IntervalLoop, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::new());
        let reporter = Arc::clone(&recorder) as Arc<dyn Reporter>;
        let dispatcher = Arc::new(Dispatcher::new(
            workload,
            strategies,
            ParallelDispatch::default(),
            DetachPolicy::Track,
            Arc::clone(&reporter),
        ));
        (
            IntervalLoop::new(period, limit, dispatcher, reporter),
            recorder,
        )
    }

    #[tokio::test]
    async fn test_limit_bounds_dispatch_opportunities() {
        for limit in [0u64, 1, 3] {
            let (mut interval, recorder) = build(
                Duration::from_millis(10),
                limit,
                DispatchSet::none(),
                Arc::new(CpuWork::new(1, 1)),
            );
            assert_eq!(interval.state(), LoopState::WaitingForTick);

            let summary = interval.run().await.unwrap();
            assert_eq!(summary.fires, limit + 1);
            assert_eq!(summary.dispatched, limit);
            assert_eq!(interval.state(), LoopState::Terminated);

            let ticks: Vec<u64> = recorder
                .events()
                .iter()
                .filter_map(|e| match e {
                    Event::TickStarted { tick, .. } => Some(*tick),
                    _ => None,
                })
                .collect();
            assert_eq!(ticks, (0..=limit).collect::<Vec<_>>());
            assert_eq!(
                recorder.count(|e| matches!(e, Event::TickFinished { .. })),
                limit as usize
            );
        }
    }

    #[tokio::test]
    async fn test_terminating_fire_does_not_dispatch() {
        let (mut interval, recorder) = build(
            Duration::from_millis(10),
            2,
            DispatchSet::only(Strategy::Direct),
            Arc::new(CpuWork::new(1, 10)),
        );
        interval.run().await.unwrap();

        let iterations: Vec<u64> = recorder
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::WorkStarted { iteration, .. } => Some(*iteration),
                _ => None,
            })
            .collect();
        assert_eq!(iterations, vec![0, 1]);

        let lines = recorder.lines();
        assert!(lines.last().unwrap().starts_with("tick 2 time since last tick"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_work_stretches_fire_spacing() {
        let (mut interval, recorder) = build(
            Duration::from_millis(20),
            3,
            DispatchSet::only(Strategy::Direct),
            Arc::new(SleepWork::new(1, Duration::from_millis(70))),
        );
        let summary = interval.run().await.unwrap();
        assert!(summary.coalesced >= 1);

        // After the first fire every drift includes the 70ms of work.
        let drifts: Vec<Duration> = recorder
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::TickDrift { tick, since_last } if *tick > 0 => Some(*since_last),
                _ => None,
            })
            .collect();
        assert_eq!(drifts.len(), 3);
        assert!(drifts.iter().all(|d| *d >= Duration::from_millis(70)));
    }
}
