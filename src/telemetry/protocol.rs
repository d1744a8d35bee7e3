//! # Telemetry Protocol Types
//!
//! Tag names of the source status document and the wire layout of the
//! telemetry event accepted by the collector.

use serde::{Deserialize, Serialize};

/// Child element of the status root holding the absolute altitude
pub const ALTITUDE_TAG: &str = "cmd.pos.altitude";

/// Child element of the status root holding the roll angle
pub const ROLL_TAG: &str = "est.att.roll";

/// Content type of every event POSTed to the collector
pub const EVENT_CONTENT_TYPE: &str = "application/json";

/// Values extracted from one status document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Absolute altitude, finite
    pub altitude: f64,

    /// Roll angle, finite
    pub roll: f64,
}

/// Telemetry event as serialized for the collector
///
/// Field names and nesting are fixed by the collector:
///
/// ```text
/// {"uuid":..,"mission":{"flight_id":..},
///  "current_state":{"timestamp":..,"uas":{"altitude_abs":..},"attitude":{"roll":..}}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub uuid: String,
    pub mission: Mission,
    pub current_state: CurrentState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub flight_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentState {
    /// UTC, ISO-8601 with milliseconds (e.g. `2024-05-01T12:00:00.123Z`)
    pub timestamp: String,
    pub uas: Uas,
    pub attitude: Attitude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uas {
    pub altitude_abs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f64,
}
