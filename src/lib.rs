pub mod actors;
pub mod api;
pub mod config;
pub mod features;
pub mod metrics;
pub mod monitors;
pub mod scoring;
pub mod simulator;
pub mod util;
pub mod window;

use serde::{Deserialize, Serialize};

use crate::util::lenient;

/// Event type that opens a grace period.
pub const BATTERY_LOW: &str = "BATTERY_LOW";

/// Payload published on `{base}/telemetry`.
///
/// Every field is optional: producers may omit or mistype any of them and the
/// pipeline still has to keep running. Coercion happens here, at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::integer"
    )]
    pub seq: Option<i64>,

    /// Producer timestamp, seconds since the Unix epoch
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub ts: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub battery_pct: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub altitude_m: Option<f64>,
}

/// Payload published on `{base}/event`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Producer timestamp, seconds since the Unix epoch
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub ts: Option<f64>,

    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::text"
    )]
    pub event_type: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::text"
    )]
    pub severity: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub battery_pct: Option<f64>,
}

impl DeviceEvent {
    pub fn is_battery_low(&self) -> bool {
        self.event_type.as_deref() == Some(BATTERY_LOW)
    }
}
