use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{DeviceTelemetryBlock, RelayDevice, SensorReading};
use crate::stream::SnapshotStream;

pub type SensorSlice = BTreeMap<String, SensorReading>;
pub type DeviceSlice = BTreeMap<String, DeviceTelemetryBlock>;
pub type RelaySlice = BTreeMap<String, RelayDevice>;

/// A consistent view of all three slices at one version.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    sensors: Arc<SensorSlice>,
    devices: Arc<DeviceSlice>,
    relays: Arc<RelaySlice>,
    version: u64,
    last_update: Option<DateTime<Utc>>,
}

impl TelemetrySnapshot {
    pub fn sensors(&self) -> &SensorSlice {
        &self.sensors
    }

    pub fn devices(&self) -> &DeviceSlice {
        &self.devices
    }

    pub fn relays(&self) -> &RelaySlice {
        &self.relays
    }

    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorReading> {
        self.sensors.get(sensor_id)
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceTelemetryBlock> {
        self.devices.get(device_id)
    }

    pub fn relay(&self, relay_id: &str) -> Option<&RelayDevice> {
        self.relays.get(relay_id)
    }

    /// Bumped on every write, including resets.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the most recent slice was written. `None` until the first write.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty() && self.devices.is_empty() && self.relays.is_empty()
    }
}

/// Process-wide telemetry state, owned by the console and shared via `Arc`.
///
/// Only the connection manager's writer task mutates it; everything else
/// reads snapshots or subscribes.
#[derive(Debug)]
pub struct TelemetryStore {
    snapshot: watch::Sender<Arc<TelemetrySnapshot>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(TelemetrySnapshot::default()));
        Self { snapshot }
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn get(&self) -> Arc<TelemetrySnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes. Dropping the stream unsubscribes.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    pub(crate) fn watch(&self) -> watch::Receiver<Arc<TelemetrySnapshot>> {
        self.snapshot.subscribe()
    }

    // ── Writes (connection manager writer task only) ──────────────

    pub(crate) fn replace_sensors(&self, sensors: SensorSlice, at: DateTime<Utc>) {
        self.write(at, |s| s.sensors = Arc::new(sensors));
    }

    pub(crate) fn replace_devices(&self, devices: DeviceSlice, at: DateTime<Utc>) {
        self.write(at, |s| s.devices = Arc::new(devices));
    }

    pub(crate) fn replace_relays(&self, relays: RelaySlice, at: DateTime<Utc>) {
        self.write(at, |s| s.relays = Arc::new(relays));
    }

    /// Drop all slices. Only used on explicit teardown.
    pub(crate) fn reset(&self) {
        self.snapshot.send_modify(|current| {
            *current = Arc::new(TelemetrySnapshot {
                version: current.version + 1,
                ..TelemetrySnapshot::default()
            });
        });
    }

    fn write(&self, at: DateTime<Utc>, apply: impl FnOnce(&mut TelemetrySnapshot)) {
        self.snapshot.send_modify(|current| {
            let mut next = TelemetrySnapshot::clone(current);
            apply(&mut next);
            next.version = current.version + 1;
            next.last_update = Some(at);
            *current = Arc::new(next);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn reading(id: &str, v: f64) -> (String, SensorReading) {
        (id.to_owned(), SensorReading::new(id, v, Utc::now()))
    }

    #[test]
    fn starts_empty() {
        let store = TelemetryStore::new();
        let snap = store.get();
        assert!(snap.is_empty());
        assert_eq!(snap.version(), 0);
        assert!(snap.last_update().is_none());
    }

    #[test]
    fn write_replaces_only_its_slice() {
        let store = TelemetryStore::new();
        store.replace_sensors([reading("engine_rpm", 1500.0)].into(), Utc::now());
        let before = store.get();

        store.replace_relays(RelaySlice::new(), Utc::now());
        let after = store.get();

        assert!(Arc::ptr_eq(&before.sensors, &after.sensors));
        assert_eq!(after.version(), before.version() + 1);
    }

    #[test]
    fn newer_slice_replaces_older_values() {
        let store = TelemetryStore::new();
        store.replace_sensors(
            [reading("engine_rpm", 1500.0), reading("fuel_tank", 70.0)].into(),
            Utc::now(),
        );
        store.replace_sensors([reading("engine_rpm", 1600.0)].into(), Utc::now());

        let snap = store.get();
        assert_eq!(snap.sensor("engine_rpm").unwrap().value, 1600.0);
        assert!(snap.sensor("fuel_tank").is_none());
    }

    #[test]
    fn old_snapshots_are_immutable() {
        let store = TelemetryStore::new();
        store.replace_sensors([reading("oil_pressure", 40.0)].into(), Utc::now());
        let held = store.get();
        store.replace_sensors([reading("oil_pressure", 45.0)].into(), Utc::now());

        assert_eq!(held.sensor("oil_pressure").unwrap().value, 40.0);
    }

    #[test]
    fn reset_clears_and_keeps_version_monotonic() {
        let store = TelemetryStore::new();
        store.replace_sensors([reading("engine_rpm", 900.0)].into(), Utc::now());
        store.reset();

        let snap = store.get();
        assert!(snap.is_empty());
        assert_eq!(snap.version(), 2);
    }
}
