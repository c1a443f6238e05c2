//! Run event reporting
//!
//! Every observable moment of a run (fires, dispatches, completions) is an
//! [`Event`]. A [`Reporter`] decides where it goes: [`Console`] prints the
//! human-readable line, [`Recorder`] keeps a timeline for inspection.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::dispatch::Strategy;
use crate::util::units::{format_millis, format_timestamp};
use crate::work::WorkReport;

/// Something that happened during a run
#[derive(Debug, Clone)]
pub enum Event {
    /// Process start, the run clock
    AppStarted { at: DateTime<Local> },
    /// Interval loop received a fire
    TickStarted { tick: u64, fired_at: DateTime<Local> },
    /// Time between the previous fire and this fire being observed
    TickDrift { tick: u64, since_last: Duration },
    /// Interval loop done dispatching for this fire
    TickFinished { tick: u64, at: DateTime<Local> },
    /// Delay loop iteration began
    LoopStarted { iteration: u64, at: DateTime<Local> },
    /// Delay loop about to suspend
    Sleeping { delay: Duration },
    /// Delay loop iteration ended, after its sleep
    LoopFinished { iteration: u64, at: DateTime<Local> },
    WorkStarted {
        iteration: u64,
        strategy: Strategy,
        at: DateTime<Local>,
    },
    /// One sub-task of a parallel dispatch completed
    SubtaskFinished {
        iteration: u64,
        task: usize,
        partial: u64,
        at: DateTime<Local>,
    },
    WorkFinished(WorkReport),
    Finished,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::AppStarted { at } => write!(f, "app start time {}", format_timestamp(at)),
            Event::TickStarted { tick, fired_at } => {
                write!(f, "tick {} start time {}", tick, format_timestamp(fired_at))
            }
            Event::TickDrift { tick, since_last } => write!(
                f,
                "tick {} time since last tick {}",
                tick,
                format_millis(*since_last)
            ),
            Event::TickFinished { tick, at } => {
                write!(f, "tick {} finish time {}", tick, format_timestamp(at))
            }
            Event::LoopStarted { iteration, at } => {
                write!(f, "loop {} start time {}", iteration, format_timestamp(at))
            }
            Event::Sleeping { delay } => {
                write!(f, "sleeping for {} milliseconds", delay.as_millis())
            }
            Event::LoopFinished { iteration, at } => {
                write!(f, "loop {} end time {}", iteration, format_timestamp(at))
            }
            Event::WorkStarted {
                iteration,
                strategy,
                at,
            } => write!(
                f,
                "{} work {} started {}",
                strategy,
                iteration,
                format_timestamp(at)
            ),
            Event::SubtaskFinished {
                iteration,
                task,
                partial,
                at,
            } => write!(
                f,
                "parallel work {}/{} finished {} with partial {}",
                iteration,
                task,
                format_timestamp(at),
                partial
            ),
            Event::WorkFinished(report) => write!(f, "{}", report),
            Event::Finished => write!(f, "Finished"),
        }
    }
}

/// Sink for run events
///
/// Called from the loop and from worker threads, so implementations must be
/// shareable across threads.
pub trait Reporter: Send + Sync {
    fn report(&self, event: Event);
}

/// Prints each event as one line on stdout
#[derive(Debug, Default)]
pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for Console {
    fn report(&self, event: Event) {
        // Best-effort: a closed stdout must not stop the run.
        let _ = writeln!(std::io::stdout().lock(), "{}", event);
    }
}

/// Keeps every event with the instant it was reported
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<(Instant, Event)>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the timeline so far
    pub fn timeline(&self) -> Vec<(Instant, Event)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Snapshot of the events without their instants
    pub fn events(&self) -> Vec<Event> {
        self.timeline().into_iter().map(|(_, event)| event).collect()
    }

    /// Number of recorded events matching `pred`
    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.timeline().iter().filter(|(_, event)| pred(event)).count()
    }

    /// The rendered console lines, in report order
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl Reporter for Recorder {
    fn report(&self, event: Event) {
        let stamped = (Instant::now(), event);
        match self.events.lock() {
            Ok(mut events) => events.push(stamped),
            Err(poisoned) => poisoned.into_inner().push(stamped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_event_lines() {
        assert!(Event::AppStarted { at: at() }
            .to_string()
            .starts_with("app start time 2024-03-09 14:05:07"));
        assert_eq!(
            Event::TickDrift {
                tick: 2,
                since_last: Duration::from_millis(101)
            }
            .to_string(),
            "tick 2 time since last tick 101.000000ms"
        );
        assert_eq!(
            Event::Sleeping {
                delay: Duration::from_millis(100)
            }
            .to_string(),
            "sleeping for 100 milliseconds"
        );
        assert!(Event::WorkStarted {
            iteration: 3,
            strategy: Strategy::Detached,
            at: at(),
        }
        .to_string()
        .starts_with("detached work 3 started"));
        assert_eq!(Event::Finished.to_string(), "Finished");
    }

    #[test]
    fn test_recorder_keeps_order() {
        let recorder = Recorder::new();
        recorder.report(Event::AppStarted { at: at() });
        recorder.report(Event::TickStarted {
            tick: 0,
            fired_at: at(),
        });
        recorder.report(Event::Finished);

        let timeline = recorder.timeline();
        assert_eq!(timeline.len(), 3);
        assert!(timeline.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(
            recorder.count(|e| matches!(e, Event::TickStarted { .. })),
            1
        );
        assert_eq!(recorder.lines().last().map(String::as_str), Some("Finished"));
    }
}
