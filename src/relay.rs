//! # Relay Module
//!
//! Single-owner event loop driving poll → decode → encode → dispatch.
//!
//! One task owns all pipeline state. Network work runs in spawned tasks that
//! post a [`Completion`] message back to the loop, so every state change
//! (queue, in-flight flag, counters) happens inside the loop's own turn.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Identity;
use crate::dispatch::{DispatchStats, Dispatcher, OrderingMode};
use crate::error::{RelayError, Result};
use crate::poller::{poll_interval, FetchCompletion, Poller};
use crate::telemetry::decoder::decode_sample;
use crate::telemetry::encoder::encode_now;
use crate::transport::{Sink, Source};

/// Number of delivered events between status log messages
const LOG_INTERVAL_EVENTS: u64 = 100;

/// True once another `LOG_INTERVAL_EVENTS` deliveries happened since the last status line
fn status_due(delivered: u64, last_logged: u64) -> bool {
    delivered.saturating_sub(last_logged) >= LOG_INTERVAL_EVENTS
}

/// Message posted back to the loop by a finished network task
#[derive(Debug)]
pub enum Completion {
    Fetched(FetchCompletion),
    Delivered { payload: Bytes, result: Result<()> },
}

/// Pipeline counters, returned when the relay stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub polls: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub config_errors: u64,
    pub dispatch: DispatchStats,
    /// Events lost when the relay stopped: the queue (not persisted) plus
    /// the attempt still outstanding, if any
    pub undelivered: usize,
}

/// The telemetry relay
pub struct Relay {
    identity: Arc<Identity>,
    poller: Poller,
    sink: Arc<dyn Sink>,
    dispatcher: Dispatcher,
    stats: RelayStats,
    last_log_delivered: u64,
}

impl Relay {
    /// Assemble a relay from its collaborators
    ///
    /// # Arguments
    ///
    /// * `identity` - Static uuid/flight id stamped on every event
    /// * `source` - Status document source
    /// * `sink` - Event collector
    /// * `mode` - Retry queue ordering
    pub fn new(
        identity: Arc<Identity>,
        source: Arc<dyn Source>,
        sink: Arc<dyn Sink>,
        mode: OrderingMode,
    ) -> Self {
        Self {
            identity,
            poller: Poller::new(source),
            sink,
            dispatcher: Dispatcher::new(mode),
            stats: RelayStats::default(),
            last_log_delivered: 0,
        }
    }

    /// Run until `shutdown` resolves
    ///
    /// Outstanding fetches and deliveries are not awaited on shutdown, and
    /// queued events are dropped; queued plus in-flight events are reported
    /// as `undelivered` in the returned stats.
    pub async fn run<F>(mut self, shutdown: F) -> RelayStats
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = poll_interval();
        tokio::pin!(shutdown);

        info!(
            "Polling source at {}Hz, {:?} delivery ordering",
            crate::poller::POLL_RATE_HZ,
            self.dispatcher.mode()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll(&tx);
                }

                Some(message) = rx.recv() => {
                    self.handle(message, &tx);
                }

                _ = &mut shutdown => {
                    break;
                }
            }
        }

        self.stats.dispatch = self.dispatcher.stats();
        self.stats.undelivered =
            self.dispatcher.queue_len() + usize::from(self.dispatcher.is_in_flight());
        info!(
            "Relay stopped: {} polls, {} delivered, {} failed attempts, {} abandoned, {} undelivered",
            self.stats.polls,
            self.stats.dispatch.delivered,
            self.stats.dispatch.failed,
            self.stats.dispatch.abandoned,
            self.stats.undelivered
        );
        self.stats
    }

    fn poll(&mut self, tx: &mpsc::UnboundedSender<Completion>) {
        self.stats.polls += 1;
        self.poller.spawn_fetch(tx.clone(), Completion::Fetched);
    }

    fn handle(&mut self, message: Completion, tx: &mpsc::UnboundedSender<Completion>) {
        match message {
            Completion::Fetched(fetch) => self.on_fetched(fetch, tx),
            Completion::Delivered { payload, result } => self.on_delivered(payload, result, tx),
        }
    }

    fn on_fetched(&mut self, fetch: FetchCompletion, tx: &mpsc::UnboundedSender<Completion>) {
        let body = match fetch.result {
            Ok(body) => body,
            Err(e @ RelayError::Config(_)) => {
                self.stats.config_errors += 1;
                error!("Poll cycle {} skipped: {}", fetch.cycle, e);
                return;
            }
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!("Poll cycle {} failed: {}", fetch.cycle, e);
                return;
            }
        };

        let sample = match decode_sample(&body) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.parse_failures += 1;
                warn!("Poll cycle {} dropped: {}", fetch.cycle, e);
                return;
            }
        };

        let payload = match encode_now(&sample, &self.identity) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Poll cycle {} dropped: {}", fetch.cycle, e);
                return;
            }
        };

        debug!(
            "Poll cycle {}: altitude={} roll={}",
            fetch.cycle, sample.altitude, sample.roll
        );

        if let Some(next) = self.dispatcher.submit(payload) {
            self.transmit(next, tx);
        }
    }

    fn on_delivered(
        &mut self,
        payload: Bytes,
        result: Result<()>,
        tx: &mpsc::UnboundedSender<Completion>,
    ) {
        if let Some(next) = self.dispatcher.complete(payload, result) {
            self.transmit(next, tx);
        }

        let stats = self.dispatcher.stats();
        if status_due(stats.delivered, self.last_log_delivered) {
            info!(
                "Delivered {} events ({} polls, {} parse failures, {} failed attempts, {} abandoned, queue {})",
                stats.delivered,
                self.stats.polls,
                self.stats.parse_failures,
                stats.failed,
                stats.abandoned,
                self.dispatcher.queue_len()
            );
            self.last_log_delivered = stats.delivered;
        }
    }

    fn transmit(&self, payload: Bytes, tx: &mpsc::UnboundedSender<Completion>) {
        let sink = Arc::clone(&self.sink);
        let done = tx.clone();

        tokio::spawn(async move {
            let result = sink.deliver(payload.clone()).await;
            // Receiver gone means the relay is shutting down
            let _ = done.send(Completion::Delivered { payload, result });
        });
    }
}
