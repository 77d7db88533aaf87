//! Synthetic drone producer used by the `edge-sim` binary
//!
//! Battery drains one percent per sample and wraps every 120 samples. Altitude
//! hovers between 10 and 12 meters. A single `BATTERY_LOW` warning is emitted
//! each time the battery reaches [`LOW_BATTERY_PCT`].

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::{BATTERY_LOW, DeviceEvent, Telemetry};

pub const LOW_BATTERY_PCT: i64 = 25;

const DRAIN_CYCLE: i64 = 120;

/// Messages produced for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub telemetry: Telemetry,
    pub event: Option<DeviceEvent>,

    /// Whole-percent battery level, as real flight controllers report it
    pub battery_pct: i64,
}

impl Sample {
    /// Wire body for `{base}/telemetry`
    pub fn telemetry_payload(&self) -> Value {
        json!({
            "seq": self.telemetry.seq,
            "ts": self.telemetry.ts,
            "battery_pct": self.battery_pct,
            "altitude_m": self.telemetry.altitude_m,
        })
    }

    /// Wire body for `{base}/event`, if this tick raised one
    pub fn event_payload(&self) -> Option<Value> {
        self.event.as_ref().map(|event| {
            json!({
                "ts": event.ts,
                "type": event.event_type,
                "severity": event.severity,
                "battery_pct": self.battery_pct,
            })
        })
    }
}

pub struct EdgeSimulator {
    seq: i64,
    rng: StdRng,
}

impl EdgeSimulator {
    pub fn new() -> EdgeSimulator {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible altitude noise
    pub fn seeded(seed: u64) -> EdgeSimulator {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> EdgeSimulator {
        Self { seq: 0, rng }
    }

    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Produce the next sample stamped with `ts` (seconds since the Unix epoch).
    pub fn next_sample(&mut self, ts: f64) -> Sample {
        self.seq += 1;
        let battery = battery_for(self.seq);
        let altitude = 10.0 + 2.0 * self.rng.gen_range(0.0..1.0);

        let telemetry = Telemetry {
            seq: Some(self.seq),
            ts: Some(ts),
            battery_pct: Some(battery as f64),
            altitude_m: Some(altitude),
        };

        let event = (battery == LOW_BATTERY_PCT).then(|| DeviceEvent {
            ts: Some(ts),
            event_type: Some(BATTERY_LOW.to_string()),
            severity: Some("warning".to_string()),
            battery_pct: Some(battery as f64),
        });

        Sample {
            telemetry,
            event,
            battery_pct: battery,
        }
    }
}

impl Default for EdgeSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Battery level for sequence number `seq`, clamped to 0..=100.
pub fn battery_for(seq: i64) -> i64 {
    (100 - seq.rem_euclid(DRAIN_CYCLE)).clamp(0, 100)
}
