// ── Relay command gateway ──
//
// Sends on/off and configuration commands for relays the store knows
// about. The cached relay state is never flipped locally: the backend's
// next `relay_update` (or a REST re-fetch when the relay channel is
// down) is the only thing that changes it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tracing::{debug, info, warn};

use boatmon_api::{BackendClient, RelayConfigUpdate, RelayMode};

use crate::config::ChannelKind;
use crate::connection::ConnectionManager;
use crate::error::CoreError;
use crate::model::RelayDevice;
use crate::store::TelemetryStore;

/// Marks a relay as having a command in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    relay_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<String>, relay_id: &str) -> Result<Self, CoreError> {
        if set.insert(relay_id.to_owned()) {
            Ok(Self {
                set,
                relay_id: relay_id.to_owned(),
            })
        } else {
            Err(CoreError::CommandInFlight {
                relay_id: relay_id.to_owned(),
            })
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.relay_id);
    }
}

/// Mediates every relay command for one session.
pub struct RelayGateway {
    client: BackendClient,
    store: Arc<TelemetryStore>,
    connections: Arc<ConnectionManager>,
    in_flight: DashSet<String>,
    fallback_window: Duration,
}

impl RelayGateway {
    pub fn new(
        client: BackendClient,
        store: Arc<TelemetryStore>,
        connections: Arc<ConnectionManager>,
        fallback_window: Duration,
    ) -> Self {
        Self {
            client,
            store,
            connections,
            in_flight: DashSet::new(),
            fallback_window,
        }
    }

    /// Whether a command for `relay_id` is currently awaiting the backend.
    pub fn is_in_flight(&self, relay_id: &str) -> bool {
        self.in_flight.contains(relay_id)
    }

    /// Flip the relay relative to its cached state.
    pub async fn toggle(&self, relay_id: &str) -> Result<Option<RelayDevice>, CoreError> {
        let relay = self.commandable(relay_id)?;
        self.switch(relay_id, !relay.state).await
    }

    /// Drive the relay on or off.
    pub async fn set(&self, relay_id: &str, on: bool) -> Result<Option<RelayDevice>, CoreError> {
        self.commandable(relay_id)?;
        self.switch(relay_id, on).await
    }

    /// Update name, enablement, mode or timing parameters.
    pub async fn configure(
        &self,
        relay_id: &str,
        update: &RelayConfigUpdate,
    ) -> Result<Option<RelayDevice>, CoreError> {
        let relay = self.known(relay_id)?;
        validate(&relay, update)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, relay_id)?;

        info!(relay = relay_id, "configuring relay");
        let echoed = self.client.update_relay(relay_id, update).await?;
        self.reconcile(relay_id, None).await;
        Ok(echoed.map(RelayDevice::from))
    }

    // ── Internals ────────────────────────────────────────────────────

    fn known(&self, relay_id: &str) -> Result<RelayDevice, CoreError> {
        self.store
            .get()
            .relay(relay_id)
            .cloned()
            .ok_or_else(|| CoreError::RelayNotFound {
                relay_id: relay_id.to_owned(),
            })
    }

    fn commandable(&self, relay_id: &str) -> Result<RelayDevice, CoreError> {
        let relay = self.known(relay_id)?;
        if !relay.enabled {
            return Err(CoreError::RelayDisabled {
                relay_id: relay_id.to_owned(),
            });
        }
        Ok(relay)
    }

    async fn switch(&self, relay_id: &str, on: bool) -> Result<Option<RelayDevice>, CoreError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, relay_id)?;

        info!(relay = relay_id, on, "sending relay command");
        let echoed = if on {
            self.client.relay_on(relay_id).await?
        } else {
            self.client.relay_off(relay_id).await?
        };
        self.reconcile(relay_id, Some(on)).await;
        Ok(echoed.map(RelayDevice::from))
    }

    /// Make sure the store catches up with a command the backend accepted.
    ///
    /// With `expected` set, waits until the cached relay reports that state.
    /// Either way the wait is bounded by the fallback window, after which
    /// the relays are re-fetched over REST.
    async fn reconcile(&self, relay_id: &str, expected: Option<bool>) {
        if self.relay_channel_settles(relay_id, expected).await {
            debug!(relay = relay_id, "store caught up through relay channel");
            return;
        }

        debug!(relay = relay_id, "relay channel did not settle, re-fetching relays");
        match self.client.list_relays().await {
            Ok(relays) => {
                if let Err(e) = self.connections.ingest_relays(relays).await {
                    warn!(error = %e, "could not apply re-fetched relays");
                }
            }
            Err(e) => warn!(error = %e, "relay re-fetch failed"),
        }
    }

    async fn relay_channel_settles(&self, relay_id: &str, expected: Option<bool>) -> bool {
        let Some(mut channel) = self.connections.channel_state(ChannelKind::Relays) else {
            return false;
        };
        match expected {
            Some(on) => {
                let mut snapshots = self.store.watch();
                let commanded =
                    snapshots.wait_for(|snap| snap.relay(relay_id).is_some_and(|r| r.state == on));
                matches!(
                    tokio::time::timeout(self.fallback_window, commanded).await,
                    Ok(Ok(_))
                )
            }
            None => matches!(
                tokio::time::timeout(self.fallback_window, channel.wait_for(|s| s.is_open())).await,
                Ok(Ok(_))
            ),
        }
    }
}

fn validate(relay: &RelayDevice, update: &RelayConfigUpdate) -> Result<(), CoreError> {
    let invalid = |message: &str| {
        Err(CoreError::ValidationFailed {
            message: message.to_owned(),
        })
    };

    if update.is_empty() {
        return invalid("nothing to change");
    }
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return invalid("relay name must not be empty");
    }
    if update.mode == Some(RelayMode::Unknown) {
        return invalid("unsupported relay mode");
    }
    if update.flash_interval_seconds.is_some_and(|s| !positive(s)) {
        return invalid("flash interval must be greater than zero");
    }
    if update.timed_duration_seconds.is_some_and(|s| !positive(s)) {
        return invalid("timed duration must be greater than zero");
    }

    match update.mode.unwrap_or(relay.mode) {
        RelayMode::Flash
            if !update
                .flash_interval_seconds
                .or(relay.flash_interval_seconds)
                .is_some_and(positive) =>
        {
            invalid("flash mode needs a flash interval greater than zero")
        }
        RelayMode::Timed
            if !update
                .timed_duration_seconds
                .or(relay.timed_duration_seconds)
                .is_some_and(positive) =>
        {
            invalid("timed mode needs a duration greater than zero")
        }
        _ => Ok(()),
    }
}

fn positive(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn relay(mode: RelayMode) -> RelayDevice {
        RelayDevice {
            id: "r1".into(),
            board_id: 1,
            relay_number: 1,
            name: "Bilge pump".into(),
            enabled: true,
            mode,
            state: false,
            flash_interval_seconds: None,
            timed_duration_seconds: None,
        }
    }

    fn rejected(relay: &RelayDevice, update: &RelayConfigUpdate) -> bool {
        matches!(
            validate(relay, update),
            Err(CoreError::ValidationFailed { .. })
        )
    }

    #[test]
    fn guard_rejects_second_acquire_and_clears_on_drop() {
        let set = DashSet::new();
        let guard = InFlightGuard::acquire(&set, "r1").unwrap();
        assert!(matches!(
            InFlightGuard::acquire(&set, "r1"),
            Err(CoreError::CommandInFlight { .. })
        ));
        assert!(InFlightGuard::acquire(&set, "r2").is_ok());
        drop(guard);
        assert!(InFlightGuard::acquire(&set, "r1").is_ok());
    }

    #[test]
    fn flash_mode_needs_interval() {
        let update = RelayConfigUpdate {
            mode: Some(RelayMode::Flash),
            ..Default::default()
        };
        assert!(rejected(&relay(RelayMode::Normal), &update));

        let with_interval = RelayConfigUpdate {
            flash_interval_seconds: Some(0.5),
            ..update.clone()
        };
        assert!(validate(&relay(RelayMode::Normal), &with_interval).is_ok());

        let mut cached = relay(RelayMode::Flash);
        cached.flash_interval_seconds = Some(1.0);
        assert!(validate(&cached, &update).is_ok());
    }

    #[test]
    fn timed_mode_needs_positive_duration() {
        let update = RelayConfigUpdate {
            mode: Some(RelayMode::Timed),
            timed_duration_seconds: Some(0.0),
            ..Default::default()
        };
        assert!(rejected(&relay(RelayMode::Normal), &update));
    }

    #[test]
    fn empty_name_and_empty_update_are_rejected() {
        let r = relay(RelayMode::Normal);
        assert!(rejected(&r, &RelayConfigUpdate::default()));
        assert!(rejected(
            &r,
            &RelayConfigUpdate {
                name: Some("  ".into()),
                ..Default::default()
            }
        ));
        assert!(validate(
            &r,
            &RelayConfigUpdate {
                enabled: Some(false),
                ..Default::default()
            }
        )
        .is_ok());
    }
}
