//! # Poller
//!
//! Fixed-rate polling of the flight-data source.
//!
//! Every tick starts an independent fetch task and returns immediately, so a
//! slow source never delays the next tick. Fetches may overlap; each one
//! reports back through the relay's completion channel as soon as it finishes.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

use crate::error::Result;
use crate::transport::Source;

/// Polling rate in Hz
pub const POLL_RATE_HZ: u64 = 10;

/// Polling period (10 Hz)
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000 / POLL_RATE_HZ);

/// Outcome of one fetch, tagged with the cycle that issued it
#[derive(Debug)]
pub struct FetchCompletion {
    pub cycle: u64,
    pub result: Result<Bytes>,
}

/// Create the poll clock
///
/// Ticks missed while the runtime was stalled are skipped rather than fired
/// in a burst.
pub fn poll_interval() -> Interval {
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Issues fetches against one source
pub struct Poller {
    source: Arc<dyn Source>,
    cycles: u64,
}

impl Poller {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self { source, cycles: 0 }
    }

    /// Start one fetch without waiting for it
    ///
    /// # Arguments
    ///
    /// * `done` - Receives the completion; wrapped by `wrap` into the caller's message type
    ///
    /// # Returns
    ///
    /// * `u64` - Cycle number of the fetch just issued
    pub fn spawn_fetch<M, F>(&mut self, done: mpsc::UnboundedSender<M>, wrap: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(FetchCompletion) -> M + Send + 'static,
    {
        self.cycles += 1;
        let cycle = self.cycles;
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            let result = source.fetch().await;
            // Receiver gone means the relay is shutting down
            let _ = done.send(wrap(FetchCompletion { cycle, result }));
        });

        cycle
    }

    /// Number of fetches issued so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
