//! # Telemetry Event Encoder
//!
//! Builds the collector's JSON event from a [`RawSample`] and the relay
//! [`Identity`].

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};

use super::protocol::*;
use crate::config::Identity;
use crate::error::Result;

/// Build a telemetry event stamped with the given instant
///
/// # Arguments
///
/// * `sample` - Values decoded from the status document
/// * `identity` - Static uuid and flight id
/// * `at` - Encode time, rendered as UTC with millisecond precision
pub fn encode_event(sample: &RawSample, identity: &Identity, at: DateTime<Utc>) -> TelemetryEvent {
    TelemetryEvent {
        uuid: identity.uuid.clone(),
        mission: Mission {
            flight_id: identity.flight_id.clone(),
        },
        current_state: CurrentState {
            timestamp: format_timestamp(at),
            uas: Uas {
                altitude_abs: sample.altitude,
            },
            attitude: Attitude { roll: sample.roll },
        },
    }
}

/// Serialize an event into the compact body POSTed to the collector
///
/// The returned buffer is immutable; retries resend the exact same bytes.
pub fn encode_payload(event: &TelemetryEvent) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(event)?))
}

/// Encode a sample stamped with the current wall clock
///
/// # Examples
///
/// ```
/// use telemetry_relay::config::Identity;
/// use telemetry_relay::telemetry::encoder::encode_now;
/// use telemetry_relay::telemetry::protocol::RawSample;
///
/// let identity = Identity {
///     uuid: "abc".into(),
///     flight_id: "F1".into(),
///     source_endpoint: "http://127.0.0.1:9280/mandala".into(),
///     dest_endpoint: "http://127.0.0.1:9090/telemetry".into(),
/// };
/// let body = encode_now(&RawSample { altitude: 1.0, roll: 0.5 }, &identity).unwrap();
/// assert!(body.starts_with(b"{\"uuid\":\"abc\""));
/// ```
pub fn encode_now(sample: &RawSample, identity: &Identity) -> Result<Bytes> {
    encode_payload(&encode_event(sample, identity, Utc::now()))
}

/// ISO-8601, UTC, milliseconds, `Z` suffix
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
