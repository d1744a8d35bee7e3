//! # Dispatch Module
//!
//! Ordered, one-at-a-time delivery of encoded events with retry on failure.
//!
//! The [`Dispatcher`] is a plain state machine: it never performs I/O itself.
//! [`Dispatcher::submit`] and [`Dispatcher::complete`] return the payload that
//! must be transmitted next (if any), and the owner of the dispatcher starts
//! that transmission and reports its outcome back through `complete`. Because
//! a single task owns the dispatcher, the in-flight flag and the retry queue
//! need no locking.
//!
//! ```text
//!            submit (queued)            submit (queued)
//!              ┌──────┐                   ┌──────┐
//!              ▼      │                   ▼      │
//!   ┌──────┐ submit ──┴──────────────▶ ┌─────────┴┐
//!   │ Idle │                           │ Sending  │
//!   └──────┘ ◀── failure / abandon ─── └──────────┘
//!       ▲                                   │
//!       └──── success, queue empty ─────────┤
//!                                           │ success, queue non-empty:
//!                                           └─▶ dequeue head, stay Sending
//! ```

use bytes::Bytes;
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, error, warn};

use crate::error::Result;

/// Where a failed event goes back into the retry queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingMode {
    /// Failed event is re-queued at the head and a submit while idle sends
    /// the oldest queued event first, so events reach the collector strictly
    /// in submission order.
    #[default]
    Strict,

    /// Failed event is appended at the tail and a submit while idle sends the
    /// fresh event directly. Events submitted during a failing attempt drain
    /// before the failed one.
    ///
    /// Only the queue order matches the original relay. Payload bytes may
    /// differ: integral values are written as `500.0`, not `500`.
    Legacy,
}

/// Observable state of the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No attempt outstanding
    Idle,
    /// Exactly one attempt outstanding
    Sending,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events handed to [`Dispatcher::submit`]
    pub submitted: u64,
    /// Attempts started
    pub attempts: u64,
    /// Attempts that ended with a 2xx answer
    pub delivered: u64,
    /// Attempts that failed and were re-queued
    pub failed: u64,
    /// Events dropped because no destination is configured
    pub abandoned: u64,
}

/// Serializes deliveries and buffers undelivered events
#[derive(Debug)]
pub struct Dispatcher {
    mode: OrderingMode,
    queue: VecDeque<Bytes>,
    in_flight: bool,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create an idle dispatcher with an empty queue
    pub fn new(mode: OrderingMode) -> Self {
        Self {
            mode,
            queue: VecDeque::new(),
            in_flight: false,
            stats: DispatchStats::default(),
        }
    }

    /// Accept a freshly encoded event
    ///
    /// # Returns
    ///
    /// * `Some(payload)` - Start transmitting this payload now
    /// * `None` - An attempt is outstanding, the event was queued
    #[must_use = "a returned payload must be transmitted"]
    pub fn submit(&mut self, payload: Bytes) -> Option<Bytes> {
        self.stats.submitted += 1;

        if self.in_flight {
            self.queue.push_back(payload);
            debug!("[QUEUED] delivery in progress, queue size = {}", self.queue.len());
            return None;
        }

        let next = match self.mode {
            OrderingMode::Legacy => payload,
            OrderingMode::Strict => match self.queue.pop_front() {
                Some(oldest) => {
                    self.queue.push_back(payload);
                    debug!("[QUEUE FLUSH] sending queued packet, remaining = {}", self.queue.len());
                    oldest
                }
                None => payload,
            },
        };

        Some(self.start(next))
    }

    /// Record the outcome of the outstanding attempt
    ///
    /// # Arguments
    ///
    /// * `payload` - The payload that was attempted
    /// * `result` - Outcome reported by the sink
    ///
    /// # Returns
    ///
    /// * `Some(payload)` - Oldest queued event to transmit next (after a success)
    /// * `None` - Dispatcher is idle
    #[must_use = "a returned payload must be transmitted"]
    pub fn complete(&mut self, payload: Bytes, result: Result<()>) -> Option<Bytes> {
        self.in_flight = false;

        match result {
            Ok(()) => {
                self.stats.delivered += 1;
                self.drain()
            }
            Err(e) if e.is_config() => {
                self.stats.abandoned += 1;
                error!("[POST ABANDONED] {}", e);
                None
            }
            Err(e) => {
                self.stats.failed += 1;
                match self.mode {
                    OrderingMode::Strict => self.queue.push_front(payload),
                    OrderingMode::Legacy => self.queue.push_back(payload),
                }
                warn!("[POST FAILED] {}, queue size = {}", e, self.queue.len());
                None
            }
        }
    }

    /// Start delivery of the oldest queued event if idle
    ///
    /// Called after every success; a failure leaves the queue untouched until
    /// the next submit or drain.
    #[must_use = "a returned payload must be transmitted"]
    pub fn drain(&mut self) -> Option<Bytes> {
        if self.in_flight {
            return None;
        }
        let next = self.queue.pop_front()?;
        debug!("[QUEUE FLUSH] sending queued packet, remaining = {}", self.queue.len());
        Some(self.start(next))
    }

    fn start(&mut self, payload: Bytes) -> Bytes {
        self.in_flight = true;
        self.stats.attempts += 1;
        payload
    }

    pub fn state(&self) -> DispatchState {
        if self.in_flight {
            DispatchState::Sending
        } else {
            DispatchState::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queued payloads, oldest first
    pub fn queued(&self) -> impl Iterator<Item = &Bytes> {
        self.queue.iter()
    }

    pub fn mode(&self) -> OrderingMode {
        self.mode
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}
