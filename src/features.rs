//! Feature extraction
//!
//! Turns a decoded [`Message`] into a [`FeatureVector`] with a fixed schema.
//! Telemetry fills the delta fields, events fill the event fields, and the
//! remaining fields are zero, so every row in a window has the same shape.
//!
//! Extraction never fails: missing or unusable values default to `0.0`.

use serde::{Deserialize, Serialize};

use crate::{DeviceEvent, Telemetry, actors::messages::Message};

/// Number of fields in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Battery change since the previous telemetry, scaled by the grace weight
    pub battery_delta: f64,

    /// Altitude change since the previous telemetry
    pub altitude_delta: f64,

    /// 0 = info, 1 = warning, 2 = critical
    pub event_severity: f64,

    /// 1 for a `BATTERY_LOW` event, 0 otherwise
    pub battery_low_event: f64,
}

impl FeatureVector {
    /// Column order used by the outlier model.
    pub fn as_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.battery_delta,
            self.altitude_delta,
            self.event_severity,
            self.battery_low_event,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Unknown or missing severities rank as `Info`.
    pub fn parse(raw: Option<&str>) -> Severity {
        match raw {
            Some("warning") => Severity::Warning,
            Some("critical") => Severity::Critical,
            _ => Severity::Info,
        }
    }

    pub fn level(self) -> f64 {
        match self {
            Severity::Info => 0.0,
            Severity::Warning => 1.0,
            Severity::Critical => 2.0,
        }
    }
}

/// Extract features from any message kind.
///
/// `grace_weight` only affects telemetry; events ignore it.
pub fn extract(message: &Message, prior: Option<&Telemetry>, grace_weight: f64) -> FeatureVector {
    match message {
        Message::Telemetry(telemetry) => telemetry_features(telemetry, prior, grace_weight),
        Message::Event(event) => event_features(event),
    }
}

/// Only the battery delta is scaled by `battery_weight`; the altitude delta is
/// left untouched even during a grace period.
pub fn telemetry_features(
    current: &Telemetry,
    prior: Option<&Telemetry>,
    battery_weight: f64,
) -> FeatureVector {
    let battery = current.battery_pct.unwrap_or(0.0);
    let altitude = current.altitude_m.unwrap_or(0.0);

    // a field missing from the prior snapshot baselines against itself
    let (prior_battery, prior_altitude) = match prior {
        Some(prior) => (
            prior.battery_pct.unwrap_or(battery),
            prior.altitude_m.unwrap_or(altitude),
        ),
        None => (battery, altitude),
    };

    FeatureVector {
        battery_delta: (battery - prior_battery) * battery_weight,
        altitude_delta: altitude - prior_altitude,
        event_severity: 0.0,
        battery_low_event: 0.0,
    }
}

pub fn event_features(event: &DeviceEvent) -> FeatureVector {
    FeatureVector {
        battery_delta: 0.0,
        altitude_delta: 0.0,
        event_severity: Severity::parse(event.severity.as_deref()).level(),
        battery_low_event: if event.is_battery_low() { 1.0 } else { 0.0 },
    }
}
