//! Delay-driven trigger loop
//!
//! Dispatches, then sleeps a fixed delay, then repeats. Iterations can never
//! overlap for blocking strategies; the spacing between iteration starts is
//! the work's duration plus the delay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::trace;

use crate::dispatch::Dispatcher;
use crate::report::{Event, Reporter};
use crate::trigger::{LoopState, LoopSummary};
use crate::Result;

pub struct DelayLoop {
    delay: Duration,
    limit: u64,
    dispatcher: Arc<Dispatcher>,
    reporter: Arc<dyn Reporter>,
    state: LoopState,
}

impl DelayLoop {
    pub fn new(
        delay: Duration,
        limit: u64,
        dispatcher: Arc<Dispatcher>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            delay,
            limit,
            dispatcher,
            reporter,
            state: LoopState::Dispatching,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run iterations 0..limit, reporting iteration `limit` before stopping
    pub async fn run(&mut self) -> Result<LoopSummary> {
        let clock = Instant::now();
        let mut iteration = 0u64;
        self.transition(LoopState::Dispatching);

        loop {
            self.reporter.report(Event::LoopStarted {
                iteration,
                at: Local::now(),
            });

            if iteration == self.limit {
                self.transition(LoopState::Terminated);
                break;
            }

            self.dispatcher.dispatch(iteration).await?;

            self.reporter.report(Event::Sleeping { delay: self.delay });
            tokio::time::sleep(self.delay).await;

            self.reporter.report(Event::LoopFinished {
                iteration,
                at: Local::now(),
            });
            iteration += 1;
        }

        Ok(LoopSummary {
            fires: iteration + 1,
            dispatched: iteration,
            coalesced: 0,
            elapsed: clock.elapsed(),
        })
    }

    fn transition(&mut self, next: LoopState) {
        trace!(from = ?self.state, to = ?next, "delay loop");
        self.state = next;
    }
}
