// ── Domain model ──
//
// Canonical types the console works with. Wire payloads from
// `boatmon-api` are converted into these on the writer task.

pub mod alert;
pub mod device;
pub mod relay;
pub mod sensor;

pub use alert::{Alert, AlertSeverity};
pub use device::{DeviceKind, DeviceTelemetryBlock, FieldValue};
pub use relay::RelayDevice;
pub use sensor::{SensorFamily, SensorReading, sensor_label};
