// boatmon-api: Async Rust client for the boat monitoring backend (REST + live channels)

pub mod calibration;
pub mod client;
pub mod envelope;
pub mod error;
pub mod models;
pub mod relays;
pub mod thresholds;
pub mod transport;
pub mod websocket;

pub use client::BackendClient;
pub use envelope::{DecodeError, Envelope};
pub use error::Error;
pub use models::{
    Calibration, RelayConfigUpdate, RelayMode, RelayRecord, SensorCalibration, ThresholdSet,
};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{ChannelHandle, ChannelSpec, ChannelStatus, ConnectionState, ReconnectPolicy};
