// ── Console abstraction ──
//
// Full lifecycle of one monitoring session against a boat backend:
// channel management, the store writer, alert recomputation, threshold
// polling and relay command routing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use boatmon_api::transport::{TlsMode, TransportConfig};
use boatmon_api::{
    BackendClient, Calibration, ConnectionState, ReconnectPolicy, RelayConfigUpdate, ThresholdSet,
};

use crate::alerts::AlertAggregator;
use crate::config::{ChannelKind, ConsoleConfig, TlsVerification};
use crate::connection::ConnectionManager;
use crate::error::CoreError;
use crate::evaluator::{self, SensorStatus};
use crate::gateway::RelayGateway;
use crate::model::{Alert, RelayDevice};
use crate::store::{TelemetrySnapshot, TelemetryStore};
use crate::stream::{SnapshotStream, WatchSubscription};

// ── Console ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ConsoleInner>`. The store, alert list and
/// thresholds outlive individual connections; channels, the writer and
/// the relay gateway belong to the current session.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    client: BackendClient,
    store: Arc<TelemetryStore>,
    aggregator: Arc<AlertAggregator>,
    cancel: CancellationToken,
    /// Child token for the current session. Cancelled on disconnect,
    /// replaced on the next connect.
    cancel_child: Mutex<CancellationToken>,
    session: Mutex<Option<Session>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Session {
    connections: Arc<ConnectionManager>,
    gateway: Arc<RelayGateway>,
}

impl Console {
    /// Build a console from `config`. Nothing is contacted until
    /// [`connect`](Self::connect).
    pub fn new(config: ConsoleConfig) -> Result<Self, CoreError> {
        let client = build_client(&config)?;
        Ok(Self {
            inner: Arc::new(ConsoleInner {
                config,
                client,
                store: Arc::new(TelemetryStore::new()),
                aggregator: Arc::new(AlertAggregator::new()),
                cancel: CancellationToken::new(),
                cancel_child: Mutex::new(CancellationToken::new()),
                session: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start a session: writer, alert task, channels, thresholds.
    ///
    /// Backend unavailability is not an error here. Channels retry on
    /// their own and thresholds stay unset until a poll succeeds.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            debug!("already connected");
            return Ok(());
        }

        // Fresh child token for this session (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        let connections = ConnectionManager::start(
            self.inner.client.clone(),
            Arc::clone(&self.inner.store),
            ReconnectPolicy {
                delay: config.reconnect_delay,
            },
            child.child_token(),
        );

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(Arc::clone(&self.inner.aggregator).run(
            Arc::clone(&self.inner.store),
            child.clone(),
        )));

        for channel in &config.channels {
            match connections.open(channel) {
                Ok(opened) => debug!(channel = %opened.kind, path = %channel.path, "channel opened"),
                Err(e) => {
                    drop(handles);
                    drop(session);
                    connections.shutdown().await;
                    self.disconnect().await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.refresh_thresholds().await {
            warn!(error = %e, "initial threshold fetch failed, alerts paused until next poll");
        }

        // Without a relay channel the gateway needs a starting relay list.
        if !config.has_channel(ChannelKind::Relays) {
            match self.inner.client.list_relays().await {
                Ok(relays) => {
                    if let Err(e) = connections.ingest_relays(relays).await {
                        warn!(error = %e, "could not apply initial relay list");
                    }
                }
                Err(e) => warn!(error = %e, "initial relay fetch failed"),
            }
        }

        if !config.threshold_poll_interval.is_zero() {
            handles.push(tokio::spawn(threshold_poll_task(
                self.inner.client.clone(),
                Arc::clone(&self.inner.aggregator),
                config.threshold_poll_interval,
                child.clone(),
            )));
        }

        let gateway = Arc::new(RelayGateway::new(
            self.inner.client.clone(),
            Arc::clone(&self.inner.store),
            Arc::clone(&connections),
            config.relay_fallback_window,
        ));
        *session = Some(Session {
            connections,
            gateway,
        });

        info!(url = %config.url, channels = config.channels.len(), "connected");
        Ok(())
    }

    /// Stop every task and channel, then clear the store.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        join_tasks(handles.drain(..)).await;
        drop(handles);

        if let Some(session) = self.inner.session.lock().await.take() {
            session.connections.shutdown().await;
        }

        self.inner.store.reset();
        self.inner.aggregator.publish(&self.inner.store.get());
        debug!("disconnected");
    }

    /// Run `f` against a short-lived console: no channels, no polling.
    ///
    /// Relays are fetched once on connect so relay commands have a
    /// starting state to validate against.
    pub async fn oneshot<F, Fut, T>(config: ConsoleConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Console) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.channels.clear();
        cfg.threshold_poll_interval = Duration::ZERO;

        let console = Console::new(cfg)?;
        console.connect().await?;
        let result = f(console.clone()).await;
        console.disconnect().await;
        result
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &BackendClient {
        &self.inner.client
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub fn store(&self) -> &Arc<TelemetryStore> {
        &self.inner.store
    }

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.inner.store.get()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Evaluate the stored reading of `sensor_id` under current thresholds.
    pub fn sensor_status(&self, sensor_id: &str) -> SensorStatus {
        let snapshot = self.snapshot();
        evaluator::evaluate(
            sensor_id,
            snapshot.sensor(sensor_id).map(|r| r.value),
            self.inner.aggregator.thresholds().as_ref(),
        )
    }

    /// Current state of every open channel. Empty when disconnected.
    pub async fn channel_states(&self) -> Vec<ConnectionState> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.connections.channel_states())
            .unwrap_or_default()
    }

    // ── Alerts & thresholds ──────────────────────────────────────────

    pub fn alerts(&self) -> Arc<Vec<Alert>> {
        self.inner.aggregator.current()
    }

    pub fn subscribe_alerts(&self) -> WatchSubscription<Arc<Vec<Alert>>> {
        WatchSubscription::new(self.inner.aggregator.subscribe())
    }

    pub fn thresholds(&self) -> Option<ThresholdSet> {
        self.inner.aggregator.thresholds()
    }

    pub fn subscribe_thresholds(&self) -> watch::Receiver<Option<ThresholdSet>> {
        self.inner.aggregator.subscribe_thresholds()
    }

    /// Re-read thresholds from the backend and recompute alerts.
    pub async fn refresh_thresholds(&self) -> Result<ThresholdSet, CoreError> {
        let thresholds = self.inner.client.get_thresholds().await?;
        self.inner.aggregator.set_thresholds(Some(thresholds));
        Ok(thresholds)
    }

    /// Store new thresholds on the backend. Needs the settings password.
    pub async fn update_thresholds(
        &self,
        thresholds: &ThresholdSet,
    ) -> Result<ThresholdSet, CoreError> {
        validate_thresholds(thresholds)?;
        let stored = self.inner.client.update_thresholds(thresholds).await?;
        self.inner.aggregator.set_thresholds(Some(stored));
        info!("thresholds updated");
        Ok(stored)
    }

    /// Restore backend defaults. Needs the settings password.
    pub async fn reset_thresholds(&self) -> Result<ThresholdSet, CoreError> {
        let stored = self.inner.client.reset_thresholds().await?;
        self.inner.aggregator.set_thresholds(Some(stored));
        info!("thresholds reset to defaults");
        Ok(stored)
    }

    // ── Calibration ──────────────────────────────────────────────────

    pub async fn calibration(&self) -> Result<Calibration, CoreError> {
        Ok(self.inner.client.get_calibration().await?)
    }

    pub async fn update_calibration(
        &self,
        calibration: &Calibration,
    ) -> Result<Calibration, CoreError> {
        if calibration.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "calibration is empty".into(),
            });
        }
        Ok(self.inner.client.update_calibration(calibration).await?)
    }

    // ── Relays ───────────────────────────────────────────────────────

    /// The relay gateway of the current session.
    pub async fn gateway(&self) -> Result<Arc<RelayGateway>, CoreError> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.gateway))
            .ok_or(CoreError::NotConnected)
    }

    pub async fn toggle_relay(&self, relay_id: &str) -> Result<Option<RelayDevice>, CoreError> {
        self.gateway().await?.toggle(relay_id).await
    }

    pub async fn set_relay(
        &self,
        relay_id: &str,
        on: bool,
    ) -> Result<Option<RelayDevice>, CoreError> {
        self.gateway().await?.set(relay_id, on).await
    }

    pub async fn configure_relay(
        &self,
        relay_id: &str,
        update: &RelayConfigUpdate,
    ) -> Result<Option<RelayDevice>, CoreError> {
        self.gateway().await?.configure(relay_id, update).await
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically re-read thresholds. Failures keep the last known set.
async fn threshold_poll_task(
    client: BackendClient,
    aggregator: Arc<AlertAggregator>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match client.get_thresholds().await {
                    Ok(thresholds) => aggregator.set_thresholds(Some(thresholds)),
                    Err(e) => warn!(error = %e, "threshold poll failed"),
                }
            }
        }
    }
    debug!("threshold poll task exiting");
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Await every handle, logging tasks that panicked or were aborted.
///
/// Returns how many ended abnormally.
async fn join_tasks(handles: impl IntoIterator<Item = JoinHandle<()>>) -> usize {
    let mut abnormal = 0;
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
            abnormal += 1;
        }
    }
    abnormal
}

fn build_client(config: &ConsoleConfig) -> Result<BackendClient, CoreError> {
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    };
    let mut client =
        BackendClient::new(config.url.clone(), &transport)?.with_api_prefix(&config.api_prefix);
    if let Some(ref password) = config.settings_password {
        client = client.with_settings_password(password.clone());
    }
    Ok(client)
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

fn validate_thresholds(t: &ThresholdSet) -> Result<(), CoreError> {
    let invalid = |message: String| Err(CoreError::ValidationFailed { message });

    if t.is_empty() {
        return invalid("no threshold values given".into());
    }
    for (name, value) in [
        ("engine_rpm_max", t.engine_rpm_max),
        ("oil_pressure_min", t.oil_pressure_min),
        ("oil_pressure_max", t.oil_pressure_max),
        ("coolant_temp_max", t.coolant_temp_max),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return invalid(format!("{name} must be a non-negative number"));
        }
    }
    if let (Some(min), Some(max)) = (t.oil_pressure_min, t.oil_pressure_max) {
        if min >= max {
            return invalid(format!(
                "oil_pressure_min ({min}) must be below oil_pressure_max ({max})"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn threshold_validation() {
        assert!(validate_thresholds(&ThresholdSet::backend_defaults()).is_ok());
        assert!(validate_thresholds(&ThresholdSet::default()).is_err());

        let inverted = ThresholdSet {
            oil_pressure_min: Some(80.0),
            oil_pressure_max: Some(20.0),
            ..ThresholdSet::default()
        };
        assert!(matches!(
            validate_thresholds(&inverted),
            Err(CoreError::ValidationFailed { .. })
        ));

        let negative = ThresholdSet {
            engine_rpm_max: Some(-1.0),
            ..ThresholdSet::default()
        };
        assert!(validate_thresholds(&negative).is_err());
    }

    #[tokio::test]
    async fn relay_commands_need_a_session() {
        let console = Console::new(ConsoleConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap();
        assert!(!console.is_connected().await);
        assert!(matches!(
            console.toggle_relay("r1").await,
            Err(CoreError::NotConnected)
        ));
        assert!(console.channel_states().await.is_empty());
    }

    #[tokio::test]
    async fn panicked_task_does_not_stop_the_join() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let handles = vec![
            tokio::spawn(async { panic!("alert task blew up") }),
            tokio::spawn(async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            }),
        ];

        assert_eq!(join_tasks(handles).await, 1);
        assert!(finished.load(std::sync::atomic::Ordering::SeqCst));
    }
}
