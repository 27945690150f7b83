// ── Alert domain types ──

use serde::{Deserialize, Serialize};

/// Severity of a non-normal reading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Danger,
}

impl AlertSeverity {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Warning => "⚠️",
            Self::Danger => "🚨",
        }
    }
}

/// One active alarm condition. The full list is rebuilt on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub sensor_id: String,
    /// Short operator-facing name (`RPM`, `Oil Pressure`, ...).
    pub label: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub observed_value: f64,
    pub threshold_value: f64,
    pub icon: String,
}
