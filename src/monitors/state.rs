use std::fmt;

use serde::{Deserialize, Serialize};

/// Operational state derived from an anomaly score.
///
/// The discriminants are the values exported on the `ml_state` gauge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationalState {
    #[default]
    Ok = 0,
    Warn = 1,
    Crit = 2,
}

impl OperationalState {
    /// Map a score to a state.
    ///
    /// ```text
    /// score >= crit, !in_grace → Crit
    /// score >= crit,  in_grace → Warn   (grace suppresses the top level)
    /// score >= warn            → Warn
    /// otherwise                → Ok
    /// ```
    ///
    /// Ties go to the higher severity.
    pub fn evaluate(score: f64, warn: f64, crit: f64, in_grace: bool) -> OperationalState {
        if score >= crit {
            if in_grace {
                return OperationalState::Warn;
            }
            return OperationalState::Crit;
        }

        if score >= warn {
            return OperationalState::Warn;
        }

        OperationalState::Ok
    }

    pub fn as_gauge(self) -> i64 {
        self as i64
    }

    pub fn from_gauge(value: i64) -> Option<OperationalState> {
        match value {
            0 => Some(OperationalState::Ok),
            1 => Some(OperationalState::Warn),
            2 => Some(OperationalState::Crit),
            _ => None,
        }
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationalState::Ok => "OK",
            OperationalState::Warn => "WARN",
            OperationalState::Crit => "CRIT",
        };
        f.write_str(label)
    }
}
