// ── Battery / solar / inverter telemetry ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device class, inferred from the device id or an explicit `kind` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Shunt,
    Mppt,
    Inverter,
    Unknown,
}

impl DeviceKind {
    pub fn infer(device_id: &str, explicit: Option<&str>) -> Self {
        let hint = explicit.unwrap_or(device_id).to_ascii_lowercase();
        if hint.contains("shunt") {
            Self::Shunt
        } else if hint.starts_with("mppt") {
            Self::Mppt
        } else if hint.starts_with("inverter") {
            Self::Inverter
        } else {
            Self::Unknown
        }
    }
}

/// A device field is numeric or textual (`state: "bulk"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The latest snapshot of one device's fields, replaced wholesale.
///
/// A missing field means *unknown*, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTelemetryBlock {
    pub device_id: String,
    pub kind: DeviceKind,
    pub fields: BTreeMap<String, FieldValue>,
}

impl DeviceTelemetryBlock {
    /// Build from a wire field map. Nulls and nested values are dropped.
    pub fn from_wire(device_id: &str, raw: &serde_json::Map<String, Value>) -> Self {
        let explicit = raw.get("kind").and_then(Value::as_str);
        let fields = raw
            .iter()
            .filter(|(name, _)| name.as_str() != "kind")
            .filter_map(|(name, v)| FieldValue::from_json(v).map(|fv| (name.clone(), fv)))
            .collect();
        Self {
            device_id: device_id.to_owned(),
            kind: DeviceKind::infer(device_id, explicit),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FieldValue::as_f64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_inference() {
        assert_eq!(DeviceKind::infer("smartshunt_leisure", None), DeviceKind::Shunt);
        assert_eq!(DeviceKind::infer("mppt_solar", None), DeviceKind::Mppt);
        assert_eq!(DeviceKind::infer("inverter", None), DeviceKind::Inverter);
        assert_eq!(DeviceKind::infer("gps", None), DeviceKind::Unknown);
        assert_eq!(DeviceKind::infer("house", Some("mppt")), DeviceKind::Mppt);
    }

    #[test]
    fn missing_fields_are_unknown_not_zero() {
        let raw = json!({"voltage": 12.7, "soc": null, "state": "float"});
        let block = DeviceTelemetryBlock::from_wire("smartshunt_starter", raw.as_object().unwrap());

        assert_eq!(block.number("voltage"), Some(12.7));
        assert_eq!(block.number("soc"), None);
        assert_eq!(block.number("current"), None);
        assert_eq!(block.number("state"), None);
        assert_eq!(block.field("state"), Some(&FieldValue::Text("float".into())));
    }
}
