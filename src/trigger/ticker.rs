//! Fixed-period trigger source with a single-slot buffer
//!
//! A producer task fires on a fixed wall-clock schedule and offers each fire
//! to a one-slot channel. While the consumer is busy the slot holds the first
//! undelivered fire; every later fire is dropped, not queued. A consumer that
//! comes back late therefore sees exactly one stale fire and then rejoins the
//! schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::debug;

use crate::{Result, TickerTestError};

/// One occurrence of the timer
#[derive(Debug, Clone)]
pub struct Fire {
    /// Zero-based position in the schedule, counting dropped fires too
    pub seq: u64,
    pub at: Instant,
    pub wall: DateTime<Local>,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    coalesced: AtomicU64,
}

#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    fires: mpsc::Receiver<Fire>,
    counters: Arc<Counters>,
    producer: JoinHandle<()>,
}

impl Ticker {
    /// Start firing every `period`, first fire one period from now
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(TickerTestError::ConfigError(
                "Ticker period must be greater than 0".to_string(),
            ));
        }

        let (tx, fires) = mpsc::channel(1);
        let counters = Arc::new(Counters::default());
        let producer = tokio::spawn(produce(period, tx, Arc::clone(&counters)));

        Ok(Self {
            period,
            fires,
            counters,
            producer,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next delivered fire
    ///
    /// Returns the buffered fire immediately if one is waiting.
    pub async fn next(&mut self) -> Option<Fire> {
        self.fires.recv().await
    }

    /// Fires the schedule has produced so far, delivered or not
    pub fn fired(&self) -> u64 {
        self.counters.fired.load(Ordering::Relaxed)
    }

    /// Fires dropped because the slot was already full
    pub fn coalesced(&self) -> u64 {
        self.counters.coalesced.load(Ordering::Relaxed)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

async fn produce(period: Duration, tx: mpsc::Sender<Fire>, counters: Arc<Counters>) {
    let mut clock = interval_at(tokio::time::Instant::now() + period, period);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let at = clock.tick().await.into_std();
        let seq = counters.fired.fetch_add(1, Ordering::Relaxed);
        let fire = Fire {
            seq,
            at,
            wall: Local::now(),
        };

        match tx.try_send(fire) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(seq = dropped.seq, "fire coalesced, consumer busy");
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_period_rejected() {
        assert!(matches!(
            Ticker::start(Duration::ZERO),
            Err(TickerTestError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_fires_on_schedule() {
        let period = Duration::from_millis(20);
        let start = Instant::now();
        let mut ticker = Ticker::start(period).unwrap();

        let first = ticker.next().await.unwrap();
        let second = ticker.next().await.unwrap();
        let third = ticker.next().await.unwrap();

        assert_eq!((first.seq, second.seq, third.seq), (0, 1, 2));
        assert!(first.at >= start + period);
        assert!(third.at.duration_since(first.at) >= period * 2);
        assert_eq!(ticker.coalesced(), 0);
        assert_eq!(ticker.period(), period);
    }

    #[tokio::test]
    async fn test_busy_consumer_sees_one_stale_fire() {
        let period = Duration::from_millis(20);
        let mut ticker = Ticker::start(period).unwrap();

        let first = ticker.next().await.unwrap();
        // Miss roughly five fires while "busy".
        tokio::time::sleep(period * 5 + period / 2).await;

        let stale = ticker.next().await.unwrap();
        assert_eq!(stale.seq, first.seq + 1);
        assert!(ticker.coalesced() >= 3);

        let fresh = ticker.next().await.unwrap();
        assert!(fresh.seq > stale.seq + 1);
        assert!(ticker.fired() >= fresh.seq + 1);
    }
}
