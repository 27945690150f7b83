// ── Threshold evaluation ──
//
// Pure classification of a single reading against the configured limits.
// No state, no I/O: the alert aggregator and the CLI both call in here.

use serde::Serialize;

use boatmon_api::ThresholdSet;

use crate::model::{AlertSeverity, SensorFamily};

/// Share of `engine_rpm_max` above which RPM is a warning.
const RPM_WARNING_RATIO: f64 = 0.9;
/// Oil pressure below `min * 1.1` is a warning.
const OIL_LOW_WARNING_RATIO: f64 = 1.1;
/// Oil pressure above `max * 0.9` is a warning.
const OIL_HIGH_WARNING_RATIO: f64 = 0.9;
/// Share of `coolant_temp_max` above which coolant is a warning.
const COOLANT_WARNING_RATIO: f64 = 0.95;

/// Classification of one reading.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorStatus {
    #[default]
    Normal,
    Warning,
    Danger,
}

impl SensorStatus {
    pub fn severity(self) -> Option<AlertSeverity> {
        match self {
            Self::Normal => None,
            Self::Warning => Some(AlertSeverity::Warning),
            Self::Danger => Some(AlertSeverity::Danger),
        }
    }
}

/// Which side of the band a reading left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Low,
    High,
}

/// A non-normal classification with the limit that caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Trip {
    pub status: SensorStatus,
    pub side: Side,
    /// The configured limit (not the scaled warning edge).
    pub limit: f64,
}

/// Classify `value` for `sensor_id`.
///
/// Missing thresholds, a missing or NaN value, an unmonitored sensor, or a
/// missing individual limit all yield [`SensorStatus::Normal`].
pub fn evaluate(
    sensor_id: &str,
    value: Option<f64>,
    thresholds: Option<&ThresholdSet>,
) -> SensorStatus {
    assess(SensorFamily::of(sensor_id), value, thresholds).map_or(SensorStatus::Normal, |t| t.status)
}

pub(crate) fn assess(
    family: SensorFamily,
    value: Option<f64>,
    thresholds: Option<&ThresholdSet>,
) -> Option<Trip> {
    let t = thresholds?;
    let v = value.filter(|v| !v.is_nan())?;

    match family {
        SensorFamily::EngineRpm => above(v, t.engine_rpm_max?, RPM_WARNING_RATIO),
        SensorFamily::CoolantTemp => above(v, t.coolant_temp_max?, COOLANT_WARNING_RATIO),
        SensorFamily::OilPressure => oil(v, t.oil_pressure_min, t.oil_pressure_max),
        SensorFamily::Tank | SensorFamily::Other => None,
    }
}

fn above(v: f64, max: f64, warning_ratio: f64) -> Option<Trip> {
    let status = if v > max {
        SensorStatus::Danger
    } else if v > max * warning_ratio {
        SensorStatus::Warning
    } else {
        return None;
    };
    Some(Trip {
        status,
        side: Side::High,
        limit: max,
    })
}

fn oil(v: f64, min: Option<f64>, max: Option<f64>) -> Option<Trip> {
    let trip = |status, side, limit| Some(Trip { status, side, limit });

    // Danger on either side wins over a warning on the other.
    if let Some(min) = min.filter(|&min| v < min) {
        return trip(SensorStatus::Danger, Side::Low, min);
    }
    if let Some(max) = max.filter(|&max| v > max) {
        return trip(SensorStatus::Danger, Side::High, max);
    }
    if let Some(min) = min.filter(|&min| v < min * OIL_LOW_WARNING_RATIO) {
        return trip(SensorStatus::Warning, Side::Low, min);
    }
    if let Some(max) = max.filter(|&max| v > max * OIL_HIGH_WARNING_RATIO) {
        return trip(SensorStatus::Warning, Side::High, max);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ThresholdSet {
        ThresholdSet::backend_defaults()
    }

    fn eval(id: &str, v: f64) -> SensorStatus {
        evaluate(id, Some(v), Some(&defaults()))
    }

    #[test]
    fn engine_rpm_bands() {
        assert_eq!(eval("engine_rpm", 3100.0), SensorStatus::Danger);
        assert_eq!(eval("engine_rpm", 2750.0), SensorStatus::Warning);
        assert_eq!(eval("engine_rpm", 2000.0), SensorStatus::Normal);
        // Boundaries are strict.
        assert_eq!(eval("engine_rpm", 3000.0), SensorStatus::Warning);
        assert_eq!(eval("engine_rpm", 2700.0), SensorStatus::Normal);
    }

    #[test]
    fn oil_pressure_bands() {
        assert_eq!(eval("oil_pressure", 15.0), SensorStatus::Danger);
        assert_eq!(eval("oil_pressure", 21.0), SensorStatus::Warning);
        assert_eq!(eval("oil_pressure", 50.0), SensorStatus::Normal);
        assert_eq!(eval("oil_pressure", 85.0), SensorStatus::Danger);
        assert_eq!(eval("oil_pressure", 75.0), SensorStatus::Warning);
    }

    #[test]
    fn coolant_bands() {
        assert_eq!(eval("coolant_temp", 96.0), SensorStatus::Danger);
        assert_eq!(eval("coolant_temp", 91.0), SensorStatus::Warning);
        assert_eq!(eval("coolant_temp", 90.0), SensorStatus::Normal);
    }

    #[test]
    fn missing_thresholds_are_always_normal() {
        for (id, v) in [
            ("engine_rpm", 99_999.0),
            ("oil_pressure", 0.0),
            ("oil_pressure", 500.0),
            ("coolant_temp", 150.0),
        ] {
            assert_eq!(evaluate(id, Some(v), None), SensorStatus::Normal);
        }
    }

    #[test]
    fn missing_or_nan_values_are_normal() {
        assert_eq!(
            evaluate("engine_rpm", None, Some(&defaults())),
            SensorStatus::Normal
        );
        assert_eq!(eval("coolant_temp", f64::NAN), SensorStatus::Normal);
    }

    #[test]
    fn unmonitored_sensors_are_normal() {
        assert_eq!(eval("fuel_tank", 0.0), SensorStatus::Normal);
        assert_eq!(eval("cabin_temp", 1000.0), SensorStatus::Normal);
    }

    #[test]
    fn missing_individual_limit_only_skips_that_check() {
        let only_max = ThresholdSet {
            oil_pressure_max: Some(80.0),
            ..ThresholdSet::default()
        };
        assert_eq!(
            evaluate("oil_pressure", Some(1.0), Some(&only_max)),
            SensorStatus::Normal
        );
        assert_eq!(
            evaluate("oil_pressure", Some(90.0), Some(&only_max)),
            SensorStatus::Danger
        );
        assert_eq!(
            evaluate("engine_rpm", Some(9000.0), Some(&only_max)),
            SensorStatus::Normal
        );
    }

    #[test]
    fn oil_trip_reports_side_and_limit() {
        let t = defaults();
        let low = assess(SensorFamily::OilPressure, Some(21.0), Some(&t));
        assert_eq!(
            low,
            Some(Trip {
                status: SensorStatus::Warning,
                side: Side::Low,
                limit: 20.0
            })
        );
        let high = assess(SensorFamily::OilPressure, Some(85.0), Some(&t));
        assert_eq!(
            high,
            Some(Trip {
                status: SensorStatus::Danger,
                side: Side::High,
                limit: 80.0
            })
        );
    }

    #[test]
    fn status_maps_to_severity() {
        assert_eq!(SensorStatus::Normal.severity(), None);
        assert_eq!(SensorStatus::Danger.severity(), Some(AlertSeverity::Danger));
    }
}
