//! # Telemetry Relay Library
//!
//! Relays flight status from a local XML source to a remote JSON collector.
//!
//! This library provides the pipeline pieces: configuration, status document
//! decoding, event encoding, ordered delivery with retry, and the event loop
//! tying them together.

pub mod config;
pub mod error;
pub mod dispatch;
pub mod logging;
pub mod poller;
pub mod relay;
pub mod telemetry;
pub mod transport;
