// ── Alert aggregation ──
//
// Turns a telemetry snapshot plus the current thresholds into the full,
// ordered list of active alerts. `recompute` is pure; the aggregator
// owns the published list and the thresholds it was computed from.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use boatmon_api::ThresholdSet;

use crate::evaluator::{self, Side, Trip};
use crate::model::{Alert, SensorFamily};
use crate::store::{TelemetrySnapshot, TelemetryStore};

/// Fixed display order of alert slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AlertSlot {
    EngineRpm,
    OilPressureLow,
    OilPressureHigh,
    CoolantTemp,
}

impl AlertSlot {
    fn of(family: SensorFamily, side: Side) -> Option<Self> {
        match (family, side) {
            (SensorFamily::EngineRpm, _) => Some(Self::EngineRpm),
            (SensorFamily::OilPressure, Side::Low) => Some(Self::OilPressureLow),
            (SensorFamily::OilPressure, Side::High) => Some(Self::OilPressureHigh),
            (SensorFamily::CoolantTemp, _) => Some(Self::CoolantTemp),
            (SensorFamily::Tank | SensorFamily::Other, _) => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::EngineRpm => "RPM",
            Self::OilPressureLow | Self::OilPressureHigh => "Oil Pressure",
            Self::CoolantTemp => "Coolant Temperature",
        }
    }

    fn message(self, value: f64, limit: f64) -> String {
        match self {
            Self::EngineRpm => format!("Engine RPM is {value:.0} (max: {limit})"),
            Self::OilPressureLow => format!("Oil pressure is LOW: {value:.1} PSI (min: {limit})"),
            Self::OilPressureHigh => {
                format!("Oil pressure is HIGH: {value:.1} PSI (max: {limit})")
            }
            Self::CoolantTemp => {
                format!("Coolant temperature is HIGH: {value:.1}°C (max: {limit})")
            }
        }
    }
}

/// Build the alert list for `snapshot` under `thresholds`.
///
/// One alert per monitored sensor whose evaluation is not normal, ordered
/// engine RPM, oil pressure low, oil pressure high, coolant temperature.
/// Calling it twice with the same inputs yields the same list.
pub fn recompute(snapshot: &TelemetrySnapshot, thresholds: Option<&ThresholdSet>) -> Vec<Alert> {
    let Some(thresholds) = thresholds else {
        return Vec::new();
    };

    let mut slotted: Vec<(AlertSlot, Alert)> = snapshot
        .sensors()
        .values()
        .filter_map(|reading| {
            let family = reading.family();
            let Trip {
                status,
                side,
                limit,
            } = evaluator::assess(family, Some(reading.value), Some(thresholds))?;
            let severity = status.severity()?;
            let slot = AlertSlot::of(family, side)?;
            Some((
                slot,
                Alert {
                    sensor_id: reading.sensor_id.clone(),
                    label: slot.label().to_owned(),
                    severity,
                    message: slot.message(reading.value, limit),
                    observed_value: reading.value,
                    threshold_value: limit,
                    icon: severity.icon().to_owned(),
                },
            ))
        })
        .collect();

    slotted.sort_by_key(|(slot, _)| *slot);
    slotted.into_iter().map(|(_, alert)| alert).collect()
}

/// Holds the current thresholds and the alert list derived from them.
#[derive(Debug)]
pub struct AlertAggregator {
    thresholds: watch::Sender<Option<ThresholdSet>>,
    alerts: watch::Sender<Arc<Vec<Alert>>>,
}

impl Default for AlertAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertAggregator {
    pub fn new() -> Self {
        let (thresholds, _) = watch::channel(None);
        let (alerts, _) = watch::channel(Arc::new(Vec::new()));
        Self { thresholds, alerts }
    }

    /// Thresholds in force. `None` until first loaded.
    pub fn thresholds(&self) -> Option<ThresholdSet> {
        *self.thresholds.borrow()
    }

    pub fn subscribe_thresholds(&self) -> watch::Receiver<Option<ThresholdSet>> {
        self.thresholds.subscribe()
    }

    /// The most recently published alert list.
    pub fn current(&self) -> Arc<Vec<Alert>> {
        self.alerts.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Alert>>> {
        self.alerts.subscribe()
    }

    /// Replace the thresholds. Observers are only woken on a real change.
    pub(crate) fn set_thresholds(&self, thresholds: Option<ThresholdSet>) {
        self.thresholds.send_if_modified(|current| {
            if *current == thresholds {
                false
            } else {
                *current = thresholds;
                true
            }
        });
    }

    /// Recompute against `snapshot` and publish if the list changed.
    pub(crate) fn publish(&self, snapshot: &TelemetrySnapshot) {
        let next = recompute(snapshot, self.thresholds().as_ref());
        self.alerts.send_if_modified(|current| {
            if **current == next {
                false
            } else {
                debug!(count = next.len(), version = snapshot.version(), "alerts changed");
                *current = Arc::new(next);
                true
            }
        });
    }

    /// Re-run on every store write and every threshold change until cancelled.
    pub(crate) async fn run(self: Arc<Self>, store: Arc<TelemetryStore>, cancel: CancellationToken) {
        let mut store_rx = store.watch();
        let mut thresholds_rx = self.thresholds.subscribe();
        let initial = store_rx.borrow_and_update().clone();
        self.publish(&initial);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = store_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = thresholds_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    thresholds_rx.borrow_and_update();
                }
            }
            let snapshot = store_rx.borrow_and_update().clone();
            self.publish(&snapshot);
        }
        debug!("alert task exiting");
    }
}
