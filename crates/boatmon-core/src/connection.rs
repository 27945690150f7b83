// ── Connection manager ──
//
// Owns the live channels for one console session and the single writer
// task that applies their envelopes to the telemetry store. Everything
// that wants to change the store (including relay re-fetches) goes
// through the writer's queues.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use boatmon_api::envelope::{RelayPayload, SensorPayload, VictronPayload};
use boatmon_api::{
    BackendClient, ChannelHandle, ChannelSpec, ConnectionState, Envelope, ReconnectPolicy,
    RelayRecord,
};

use crate::config::{ChannelConfig, ChannelKind};
use crate::error::CoreError;
use crate::model::{DeviceTelemetryBlock, RelayDevice, SensorReading};
use crate::store::TelemetryStore;

const ENVELOPE_QUEUE_SIZE: usize = 256;
const INGEST_QUEUE_SIZE: usize = 16;

/// An envelope submitted outside the channels, acknowledged once applied.
struct Ingest {
    envelope: Envelope,
    applied: oneshot::Sender<()>,
}

/// Reference to an open channel, returned by [`ConnectionManager::open`].
#[derive(Debug, Clone)]
pub struct ChannelRef {
    pub kind: ChannelKind,
    state: watch::Receiver<ConnectionState>,
}

impl ChannelRef {
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Live channels plus the store writer for one session.
pub struct ConnectionManager {
    client: BackendClient,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
    envelope_tx: mpsc::Sender<Envelope>,
    ingest_tx: mpsc::Sender<Ingest>,
    channels: Mutex<Vec<(ChannelKind, ChannelHandle)>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Spawn the writer task and return a manager with no channels open.
    ///
    /// `cancel` bounds the lifetime of the writer and every channel.
    pub fn start(
        client: BackendClient,
        store: Arc<TelemetryStore>,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (envelope_tx, envelope_rx) = mpsc::channel(ENVELOPE_QUEUE_SIZE);
        let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_QUEUE_SIZE);

        let writer = tokio::spawn(writer_task(store, envelope_rx, ingest_rx, cancel.clone()));

        Arc::new(Self {
            client,
            policy,
            cancel,
            envelope_tx,
            ingest_tx,
            channels: Mutex::new(Vec::new()),
            writer: Mutex::new(Some(writer)),
        })
    }

    // ── Channels ─────────────────────────────────────────────────────

    /// Open a channel. An already-open channel of the same kind is replaced.
    pub fn open(&self, channel: &ChannelConfig) -> Result<ChannelRef, CoreError> {
        let url = self.client.channel_url(&channel.path)?;
        let handle = ChannelHandle::open(
            ChannelSpec::new(channel.kind.to_string(), url),
            self.policy,
            self.envelope_tx.clone(),
            self.cancel.child_token(),
        );
        let channel_ref = ChannelRef {
            kind: channel.kind,
            state: handle.subscribe_state(),
        };

        let replaced = {
            let mut channels = self.lock_channels();
            let old = channels
                .iter()
                .position(|(kind, _)| *kind == channel.kind)
                .map(|idx| channels.swap_remove(idx));
            channels.push((channel.kind, handle));
            old
        };
        if let Some((kind, old)) = replaced {
            debug!(%kind, "replacing open channel");
            old.shutdown();
        }

        Ok(channel_ref)
    }

    /// Close a channel and wait for it to reach `closed`.
    pub async fn close(&self, channel: &ChannelRef) {
        let handle = {
            let mut channels = self.lock_channels();
            channels
                .iter()
                .position(|(kind, _)| *kind == channel.kind)
                .map(|idx| channels.swap_remove(idx).1)
        };
        if let Some(handle) = handle {
            handle.close().await;
        }
    }

    /// Close every channel.
    pub async fn close_all(&self) {
        let handles: Vec<_> = self.lock_channels().drain(..).collect();
        for (_, handle) in handles {
            handle.close().await;
        }
    }

    /// Close all channels, stop the writer and wait for it.
    pub async fn shutdown(&self) {
        self.close_all().await;
        self.cancel.cancel();
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "writer task ended abnormally");
            }
        }
    }

    /// Current state of every open channel.
    pub fn channel_states(&self) -> Vec<ConnectionState> {
        let mut states: Vec<_> = self
            .lock_channels()
            .iter()
            .map(|(_, handle)| handle.state())
            .collect();
        states.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        states
    }

    /// State receiver for the channel of `kind`, if one is open.
    pub fn channel_state(&self, kind: ChannelKind) -> Option<watch::Receiver<ConnectionState>> {
        self.lock_channels()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, handle)| handle.subscribe_state())
    }

    // ── Out-of-band writes ───────────────────────────────────────────

    /// Apply `envelope` through the writer and wait until it is in the store.
    pub async fn ingest(&self, envelope: Envelope) -> Result<(), CoreError> {
        let (applied, done) = oneshot::channel();
        self.ingest_tx
            .send(Ingest { envelope, applied })
            .await
            .map_err(|_| CoreError::NotConnected)?;
        done.await.map_err(|_| CoreError::NotConnected)
    }

    /// Feed an authoritative relay list (e.g. from `GET /relays`) to the store.
    pub async fn ingest_relays(&self, relays: Vec<RelayRecord>) -> Result<(), CoreError> {
        let payload: RelayPayload = relays.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.ingest(Envelope::RelayUpdate(payload)).await
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, Vec<(ChannelKind, ChannelHandle)>> {
        self.channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// ── Writer task ──────────────────────────────────────────────────────

/// The only code path that mutates the store.
async fn writer_task(
    store: Arc<TelemetryStore>,
    mut envelopes: mpsc::Receiver<Envelope>,
    mut ingests: mpsc::Receiver<Ingest>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(ingest) = ingests.recv() => {
                apply(&store, ingest.envelope);
                // Caller may have given up waiting.
                let _ = ingest.applied.send(());
            }
            Some(envelope) = envelopes.recv() => apply(&store, envelope),
            else => break,
        }
    }
    debug!("writer task exiting");
}

fn apply(store: &TelemetryStore, envelope: Envelope) {
    let now = Utc::now();
    match envelope {
        Envelope::SensorUpdate(data) => store.replace_sensors(sensor_slice(data, now), now),
        Envelope::VictronUpdate(data) => store.replace_devices(device_slice(&data), now),
        Envelope::RelayUpdate(data) => store.replace_relays(relay_slice(data), now),
        Envelope::Unknown { kind } => debug!(kind, "ignoring envelope with unknown type"),
    }
}

fn sensor_slice(
    data: SensorPayload,
    now: chrono::DateTime<Utc>,
) -> BTreeMap<String, SensorReading> {
    data.into_iter()
        .filter_map(|(id, value)| match value {
            Value::Number(n) => n.as_f64().map(|v| {
                let reading = SensorReading::new(id.clone(), v, now);
                (id, reading)
            }),
            other => {
                trace!(sensor = %id, value = %other, "skipping non-numeric reading");
                None
            }
        })
        .collect()
}

fn device_slice(data: &VictronPayload) -> BTreeMap<String, DeviceTelemetryBlock> {
    data.iter()
        .map(|(id, fields)| (id.clone(), DeviceTelemetryBlock::from_wire(id, fields)))
        .collect()
}

fn relay_slice(data: HashMap<String, RelayRecord>) -> BTreeMap<String, RelayDevice> {
    data.into_iter()
        .map(|(id, record)| (id, RelayDevice::from(record)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> BackendClient {
        BackendClient::new(
            "http://127.0.0.1:9".parse().unwrap(),
            &boatmon_api::TransportConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn sensor_slice_drops_non_numeric_values() {
        let data: SensorPayload = serde_json::from_value(json!({
            "engine_rpm": 1200.0,
            "oil_pressure": null,
            "fuel_tank": "n/a"
        }))
        .unwrap();
        let slice = sensor_slice(data, Utc::now());
        assert_eq!(slice.len(), 1);
        assert_eq!(slice["engine_rpm"].unit, "rpm");
    }

    #[tokio::test]
    async fn ingest_waits_until_store_is_written() {
        let store = Arc::new(TelemetryStore::new());
        let manager = ConnectionManager::start(
            client(),
            Arc::clone(&store),
            ReconnectPolicy::default(),
            CancellationToken::new(),
        );

        let relay: RelayRecord =
            serde_json::from_value(json!({"id": "r1", "state": true, "enabled": true})).unwrap();
        manager.ingest_relays(vec![relay]).await.unwrap();

        assert!(store.get().relay("r1").unwrap().state);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn ingest_after_shutdown_is_not_connected() {
        let manager = ConnectionManager::start(
            client(),
            Arc::new(TelemetryStore::new()),
            ReconnectPolicy::default(),
            CancellationToken::new(),
        );
        manager.shutdown().await;

        let result = manager.ingest_relays(Vec::new()).await;
        assert!(matches!(result, Err(CoreError::NotConnected)));
    }
}
