//! # Telemetry Module
//!
//! Converts flight status into collector events.
//!
//! This module handles:
//! - Decoding the XML status document into a raw sample
//! - Encoding the sample plus identity into the collector JSON event
//! - Timestamping events in UTC with millisecond precision

pub mod protocol;
pub mod decoder;
pub mod encoder;
