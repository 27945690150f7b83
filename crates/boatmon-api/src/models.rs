// Wire types for the backend REST surface and live channel payloads.
//
// Field names match the backend JSON exactly. Optional fields use
// `#[serde(default)]` so partially-populated payloads still decode, and
// unrecognised keys are kept in `extra` maps where round-tripping matters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Thresholds ───────────────────────────────────────────────────────

/// Alarm limits for the monitored engine sensors.
///
/// Every limit is optional: a backend that only knows some limits must
/// never cause an alarm for the ones it does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_rpm_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_pressure_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_pressure_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coolant_temp_max: Option<f64>,
}

impl ThresholdSet {
    /// The limits a freshly-installed backend reports.
    pub const fn backend_defaults() -> Self {
        Self {
            engine_rpm_max: Some(3000.0),
            oil_pressure_min: Some(20.0),
            oil_pressure_max: Some(80.0),
            coolant_temp_max: Some(95.0),
        }
    }

    /// `true` when no limit is configured at all.
    pub fn is_empty(&self) -> bool {
        self.engine_rpm_max.is_none()
            && self.oil_pressure_min.is_none()
            && self.oil_pressure_max.is_none()
            && self.coolant_temp_max.is_none()
    }
}

/// `GET /thresholds` answers with the bare set; mutations wrap it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdsBody {
    Wrapped { thresholds: ThresholdSet },
    Bare(ThresholdSet),
}

impl ThresholdsBody {
    pub(crate) fn into_inner(self) -> ThresholdSet {
        match self {
            Self::Wrapped { thresholds } | Self::Bare(thresholds) => thresholds,
        }
    }
}

// ── Relays ───────────────────────────────────────────────────────────

/// Switching behaviour configured for a relay.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RelayMode {
    #[default]
    Normal,
    Flash,
    Timed,
    #[serde(other)]
    Unknown,
}

/// A relay as reported by the backend (REST or `relay_update`).
///
/// Relay payloads inside a `relay_update` map carry their id both as the
/// map key and as a field; `id` defaults to empty so keyed payloads that
/// omit it still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub board_id: u32,
    #[serde(default)]
    pub relay_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: RelayMode,
    #[serde(default)]
    pub state: bool,
    #[serde(
        default,
        alias = "flash_interval",
        skip_serializing_if = "Option::is_none"
    )]
    pub flash_interval_seconds: Option<f64>,
    #[serde(
        default,
        alias = "timed_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub timed_duration_seconds: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Body of `PUT /relays/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RelayMode>,
    #[serde(
        default,
        rename = "flash_interval",
        skip_serializing_if = "Option::is_none"
    )]
    pub flash_interval_seconds: Option<f64>,
    #[serde(
        default,
        rename = "timed_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub timed_duration_seconds: Option<f64>,
}

impl RelayConfigUpdate {
    /// `true` when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelayListResponse {
    #[serde(default)]
    pub relays: Vec<RelayRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelayCommandResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub relay: Option<RelayRecord>,
}

// ── Calibration ──────────────────────────────────────────────────────

/// Per-sensor calibration parameters.
///
/// Tank senders use `min`/`max` raw ADC bounds, analog senders use
/// `offset`/`scale`, the tachometer uses `pulses_per_rev`. Anything else
/// the backend stores is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorCalibration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulses_per_rev: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Calibration table keyed by sensor id.
pub type Calibration = BTreeMap<String, SensorCalibration>;

/// `GET /calibration` is bare; `PUT /calibration` echoes it wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CalibrationBody {
    Wrapped { calibration: Calibration },
    Bare(Calibration),
}

impl CalibrationBody {
    pub(crate) fn into_inner(self) -> Calibration {
        match self {
            Self::Wrapped { calibration } | Self::Bare(calibration) => calibration,
        }
    }
}

// ── Error bodies ─────────────────────────────────────────────────────

/// Error payload shape: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: Value,
}
