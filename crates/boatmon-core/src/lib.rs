//! Reactive telemetry layer between `boatmon-api` and the operator console.
//!
//! This crate owns the live state of one boat and everything derived from it:
//!
//! - **[`Console`]**: Central facade for one monitoring session.
//!   [`connect()`](Console::connect) starts the store writer, opens the
//!   configured live channels, loads thresholds and spawns the alert and
//!   threshold-poll tasks. [`Console::oneshot()`](Console::oneshot) runs a
//!   single CLI operation without channels or polling.
//!
//! - **[`ConnectionManager`]**: Owns the live channels and the single writer
//!   task. Channel envelopes and out-of-band relay re-fetches both reach the
//!   store through it, one at a time.
//!
//! - **[`TelemetryStore`]**: Latest sensor readings, Victron device blocks
//!   and relay states as one immutable [`TelemetrySnapshot`] published over
//!   `tokio::sync::watch`. Readers get a consistent snapshot without locking.
//!
//! - **[`evaluate`]** / **[`AlertAggregator`]**: Pure threshold
//!   classification and the ordered alert list recomputed on every store
//!   write or threshold change.
//!
//! - **[`RelayGateway`]**: On/off and configuration commands with local
//!   rejection of unknown, disabled or busy relays. Cached relay state only
//!   changes when the backend reports it.

pub mod alerts;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alerts::{AlertAggregator, recompute};
pub use config::{ChannelConfig, ChannelKind, ConsoleConfig, TlsVerification};
pub use connection::{ChannelRef, ConnectionManager};
pub use console::Console;
pub use error::CoreError;
pub use evaluator::{SensorStatus, evaluate};
pub use gateway::RelayGateway;
pub use store::{TelemetrySnapshot, TelemetryStore};
pub use stream::{SnapshotStream, SubscriptionStream, WatchSubscription};

pub use model::{
    Alert, AlertSeverity, DeviceKind, DeviceTelemetryBlock, FieldValue, RelayDevice, SensorFamily,
    SensorReading, sensor_label,
};

// Wire types consumers need alongside the core API.
pub use boatmon_api::{
    Calibration, ChannelStatus, ConnectionState, RelayConfigUpdate, RelayMode, SensorCalibration,
    ThresholdSet,
};
