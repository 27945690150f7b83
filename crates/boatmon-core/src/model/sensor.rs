// ── Sensor domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which monitored quantity a sensor id refers to.
///
/// Tank ids are open-ended (`fuel_tank`, `water_tank`, `waste_tank`, ...)
/// so they are matched by suffix rather than listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorFamily {
    EngineRpm,
    OilPressure,
    CoolantTemp,
    Tank,
    Other,
}

impl SensorFamily {
    pub fn of(sensor_id: &str) -> Self {
        match sensor_id {
            "engine_rpm" => Self::EngineRpm,
            "oil_pressure" => Self::OilPressure,
            "coolant_temp" => Self::CoolantTemp,
            id if id.ends_with("_tank") => Self::Tank,
            _ => Self::Other,
        }
    }

    /// Display unit for readings of this family.
    pub fn unit(self) -> &'static str {
        match self {
            Self::EngineRpm => "rpm",
            Self::OilPressure => "psi",
            Self::CoolantTemp => "°C",
            Self::Tank => "%",
            Self::Other => "",
        }
    }

    /// Whether thresholds apply to this family.
    pub fn is_monitored(self) -> bool {
        matches!(self, Self::EngineRpm | Self::OilPressure | Self::CoolantTemp)
    }
}

/// The latest value of one sensor. Never archived; a newer slice replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub value: f64,
    pub unit: &'static str,
    pub received_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(sensor_id: impl Into<String>, value: f64, received_at: DateTime<Utc>) -> Self {
        let sensor_id = sensor_id.into();
        let unit = SensorFamily::of(&sensor_id).unit();
        Self {
            sensor_id,
            value,
            unit,
            received_at,
        }
    }

    pub fn family(&self) -> SensorFamily {
        SensorFamily::of(&self.sensor_id)
    }

    /// Human label: `engine_rpm` → `Engine RPM`, `fuel_tank` → `Fuel Tank`.
    pub fn label(&self) -> String {
        sensor_label(&self.sensor_id)
    }
}

pub fn sensor_label(sensor_id: &str) -> String {
    sensor_id
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| match word {
            "rpm" => "RPM".to_owned(),
            w => {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_and_units() {
        assert_eq!(SensorFamily::of("engine_rpm").unit(), "rpm");
        assert_eq!(SensorFamily::of("oil_pressure").unit(), "psi");
        assert_eq!(SensorFamily::of("coolant_temp").unit(), "°C");
        assert_eq!(SensorFamily::of("waste_tank"), SensorFamily::Tank);
        assert_eq!(SensorFamily::of("bilge_level"), SensorFamily::Other);
        assert!(!SensorFamily::Tank.is_monitored());
    }

    #[test]
    fn labels() {
        assert_eq!(sensor_label("engine_rpm"), "Engine RPM");
        assert_eq!(sensor_label("fuel_tank"), "Fuel Tank");
        assert_eq!(sensor_label("coolant_temp"), "Coolant Temp");
    }
}
