//! Parallel workload dispatcher
//!
//! Fans one invocation out over the blocking thread pool, one slice per
//! sub-task, and waits for all of them before returning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::task::JoinSet;
use tracing::debug;

use crate::dispatch::Strategy;
use crate::report::{Event, Reporter};
use crate::work::{WorkReport, Workload};
use crate::{Result, DEFAULT_FAN_OUT};

/// How sub-task partials become the aggregate total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accumulation {
    /// Each sub-task returns its partial; the caller sums after the barrier
    #[default]
    AfterJoin,
    /// Every sub-task adds into one shared counter as it finishes
    Atomic,
}

/// Fixed fan-out dispatcher with join-all semantics
#[derive(Debug, Clone)]
pub struct ParallelDispatch {
    fan_out: usize,
    accumulation: Accumulation,
}

impl Default for ParallelDispatch {
    fn default() -> Self {
        Self::new(DEFAULT_FAN_OUT, Accumulation::default())
    }
}

impl ParallelDispatch {
    pub fn new(fan_out: usize, accumulation: Accumulation) -> Self {
        Self {
            fan_out,
            accumulation,
        }
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Run `fan_out` slices concurrently and return once every one finished
    ///
    /// Sub-task completions are reported in the order they happen; the
    /// returned report is produced strictly after the last of them.
    pub async fn run(
        &self,
        workload: Arc<dyn Workload>,
        iteration: u64,
        reporter: &dyn Reporter,
    ) -> Result<WorkReport> {
        let started = Local::now();
        let clock = Instant::now();
        let shared = Arc::new(AtomicU64::new(0));

        let mut tasks = JoinSet::new();
        for task in 0..self.fan_out {
            let workload = Arc::clone(&workload);
            let shared = Arc::clone(&shared);
            let accumulation = self.accumulation;
            tasks.spawn_blocking(move || {
                let partial = workload.slice();
                if accumulation == Accumulation::Atomic {
                    shared.fetch_add(partial, Ordering::Relaxed);
                }
                (task, partial, Local::now())
            });
        }

        let mut reduced = 0u64;
        while let Some(joined) = tasks.join_next().await {
            let (task, partial, at) = joined?;
            debug!(iteration, task, partial, "parallel sub-task finished");
            reporter.report(Event::SubtaskFinished {
                iteration,
                task,
                partial,
                at,
            });
            reduced += partial;
        }

        let total = match self.accumulation {
            Accumulation::AfterJoin => reduced,
            Accumulation::Atomic => shared.load(Ordering::Relaxed),
        };

        Ok(WorkReport {
            iteration,
            strategy: Strategy::Parallel,
            fan_out: self.fan_out,
            started,
            finished: Local::now(),
            elapsed: clock.elapsed(),
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Recorder;
    use crate::work::{CpuWork, SleepWork};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_barrier_waits_for_every_subtask() {
        for fan_out in [1usize, 4, 10] {
            let recorder = Recorder::new();
            let dispatch = ParallelDispatch::new(fan_out, Accumulation::AfterJoin);
            let work: Arc<dyn Workload> = Arc::new(SleepWork::new(1, Duration::from_millis(20)));

            let report = dispatch.run(work, 7, &recorder).await.unwrap();
            let finished_at = Instant::now();

            let timeline = recorder.timeline();
            assert_eq!(timeline.len(), fan_out);
            assert!(timeline.iter().all(|(at, _)| *at <= finished_at));

            let mut tasks: Vec<usize> = recorder
                .events()
                .iter()
                .filter_map(|e| match e {
                    Event::SubtaskFinished { iteration: 7, task, .. } => Some(*task),
                    _ => None,
                })
                .collect();
            tasks.sort_unstable();
            assert_eq!(tasks, (0..fan_out).collect::<Vec<_>>());

            assert_eq!(report.fan_out, fan_out);
            assert_eq!(report.total, fan_out as u64);
            assert!(report.elapsed >= Duration::from_millis(20));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_accumulation_modes_agree() {
        let work: Arc<dyn Workload> = Arc::new(CpuWork::new(1, 50_000));
        let recorder = Recorder::new();

        let after_join = ParallelDispatch::new(6, Accumulation::AfterJoin)
            .run(Arc::clone(&work), 0, &recorder)
            .await
            .unwrap();
        let atomic = ParallelDispatch::new(6, Accumulation::Atomic)
            .run(work, 1, &recorder)
            .await
            .unwrap();

        assert_eq!(after_join.total, 300_000);
        assert_eq!(atomic.total, 300_000);
        assert_eq!(atomic.strategy, Strategy::Parallel);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_subtasks_overlap() {
        // Ten 50ms slices side by side must take far less than 500ms.
        let work: Arc<dyn Workload> = Arc::new(SleepWork::new(1, Duration::from_millis(50)));
        let report = ParallelDispatch::default()
            .run(work, 0, &Recorder::new())
            .await
            .unwrap();
        assert!(report.elapsed >= Duration::from_millis(50));
        assert!(report.elapsed < Duration::from_millis(450));
        assert!(report.to_string().contains("10 sub-tasks"));
    }

    #[derive(Debug)]
    struct Exploding;

    impl Workload for Exploding {
        fn slice(&self) -> u64 {
            panic!("slice failed")
        }

        fn slices(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_panicking_subtask_is_a_worker_error() {
        let work: Arc<dyn Workload> = Arc::new(Exploding);
        let result = ParallelDispatch::new(2, Accumulation::AfterJoin)
            .run(work, 0, &Recorder::new())
            .await;
        assert!(matches!(result, Err(crate::TickerTestError::WorkerError(_))));
    }
}
