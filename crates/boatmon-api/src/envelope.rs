//! Live channel message decoding.
//!
//! Every frame the backend pushes is a JSON object `{"type": ..., "data": ...}`.
//! Decoding is two-step: the outer shape is read into a raw envelope, then
//! `data` is decoded according to `type`. Extra top-level keys (the backend
//! sends a `timestamp`) are ignored.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::RelayRecord;

/// Sensor id → raw reading. Non-numeric readings are kept as-is and
/// filtered by the consumer.
pub type SensorPayload = HashMap<String, Value>;

/// Device id → field map.
pub type VictronPayload = HashMap<String, Map<String, Value>>;

/// Relay id → relay record.
pub type RelayPayload = HashMap<String, RelayRecord>;

/// A decoded channel message. One variant per known `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    SensorUpdate(SensorPayload),
    VictronUpdate(VictronPayload),
    RelayUpdate(RelayPayload),
    /// Well-formed envelope with a `type` this client does not know.
    Unknown { kind: String },
}

impl Envelope {
    /// The wire `type` tag for this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::SensorUpdate(_) => "sensor_update",
            Self::VictronUpdate(_) => "victron_update",
            Self::RelayUpdate(_) => "relay_update",
            Self::Unknown { kind } => kind,
        }
    }

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let raw: RawEnvelope = serde_json::from_str(text)?;
        let kind = raw.kind.ok_or(DecodeError::MissingType)?;
        let data = raw.data.unwrap_or(Value::Null);

        let bad_data = |e: serde_json::Error| DecodeError::BadData {
            kind: kind.clone(),
            message: e.to_string(),
        };

        match kind.as_str() {
            "sensor_update" => serde_json::from_value(data)
                .map(Self::SensorUpdate)
                .map_err(bad_data),
            "victron_update" => serde_json::from_value(data)
                .map(Self::VictronUpdate)
                .map_err(bad_data),
            "relay_update" => serde_json::from_value::<RelayPayload>(data)
                .map(|mut relays| {
                    for (id, relay) in &mut relays {
                        if relay.id.is_empty() {
                            relay.id.clone_from(id);
                        }
                    }
                    Self::RelayUpdate(relays)
                })
                .map_err(bad_data),
            _ => Ok(Self::Unknown { kind: kind.clone() }),
        }
    }
}

/// Why a frame could not be turned into an [`Envelope`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no `type` field")]
    MissingType,

    #[error("`data` does not match `{kind}`: {message}")]
    BadData { kind: String, message: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_sensor_update_and_ignores_timestamp() {
        let frame = r#"{"type":"sensor_update","timestamp":1234.5,
                        "data":{"engine_rpm":2200.0,"fuel_tank":61.5}}"#;
        let Envelope::SensorUpdate(data) = Envelope::decode(frame).unwrap() else {
            panic!("expected sensor update");
        };
        assert_eq!(data["engine_rpm"], serde_json::json!(2200.0));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn decodes_victron_update() {
        let frame = r#"{"type":"victron_update","data":{
            "smartshunt_leisure":{"voltage":12.8,"soc":87},
            "mppt_solar":{"state":"bulk"}}}"#;
        let Envelope::VictronUpdate(data) = Envelope::decode(frame).unwrap() else {
            panic!("expected victron update");
        };
        assert_eq!(data["mppt_solar"]["state"], serde_json::json!("bulk"));
    }

    #[test]
    fn relay_update_fills_missing_ids_from_keys() {
        let frame = r#"{"type":"relay_update","data":{
            "r1":{"state":true,"enabled":true,"name":"Nav lights"}}}"#;
        let Envelope::RelayUpdate(relays) = Envelope::decode(frame).unwrap() else {
            panic!("expected relay update");
        };
        assert_eq!(relays["r1"].id, "r1");
        assert!(relays["r1"].state);
    }

    #[test]
    fn unknown_type_is_its_own_variant() {
        let env = Envelope::decode(r#"{"type":"weather_update","data":{}}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Unknown {
                kind: "weather_update".into()
            }
        );
        assert_eq!(env.kind(), "weather_update");
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            Envelope::decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            Envelope::decode(r#"{"data":{}}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            Envelope::decode(r#"{"type":"relay_update","data":[1,2,3]}"#),
            Err(DecodeError::BadData { .. })
        ));
    }
}
