// ── Runtime console configuration ──
//
// Describes *how* to reach a boat backend: URL, TLS, channel set and
// timing. Carries the settings password but never touches disk. The CLI
// builds a `ConsoleConfig` from a profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed gateway certificates).
    DangerAcceptInvalid,
}

/// The telemetry families the backend pushes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChannelKind {
    Sensors,
    Victron,
    Relays,
}

impl ChannelKind {
    /// Path of this channel under the API prefix.
    pub fn default_path(self) -> &'static str {
        match self {
            Self::Sensors => "sensors/ws",
            Self::Victron => "victron/ws",
            Self::Relays => "relays/ws",
        }
    }
}

/// One live channel to open on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    /// Websocket path relative to the API prefix.
    pub path: String,
}

impl ChannelConfig {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            path: kind.default_path().to_owned(),
        }
    }
}

/// Configuration for one console session against one backend.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Backend root URL (e.g. `http://boat.local:8000`).
    pub url: Url,
    /// Prefix every REST and channel path hangs off. Default: `api`.
    pub api_prefix: String,
    /// TLS verification strategy for REST calls.
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    /// Password for settings-protected endpoints.
    pub settings_password: Option<SecretString>,
    /// Channels opened by `connect()`.
    pub channels: Vec<ChannelConfig>,
    /// Constant delay between a channel drop and the next attempt.
    pub reconnect_delay: Duration,
    /// How often thresholds are re-read. Zero disables polling.
    pub threshold_poll_interval: Duration,
    /// How long a relay command waits for the relay channel before
    /// falling back to a REST re-fetch.
    pub relay_fallback_window: Duration,
}

impl ConsoleConfig {
    /// A config with the stock timings and all three channels.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            api_prefix: "api".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            settings_password: None,
            channels: vec![
                ChannelConfig::new(ChannelKind::Sensors),
                ChannelConfig::new(ChannelKind::Victron),
                ChannelConfig::new(ChannelKind::Relays),
            ],
            reconnect_delay: Duration::from_secs(3),
            threshold_poll_interval: Duration::from_secs(10),
            relay_fallback_window: Duration::from_secs(2),
        }
    }

    /// Whether a channel of `kind` is part of this config.
    pub fn has_channel(&self, kind: ChannelKind) -> bool {
        self.channels.iter().any(|c| c.kind == kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stock_config_opens_all_channels() {
        let config = ConsoleConfig::new("http://boat.local:8000".parse().unwrap());
        assert!(config.has_channel(ChannelKind::Sensors));
        assert!(config.has_channel(ChannelKind::Victron));
        assert!(config.has_channel(ChannelKind::Relays));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.threshold_poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn channel_kind_round_trips_through_strings() {
        assert_eq!("Victron".parse::<ChannelKind>().unwrap(), ChannelKind::Victron);
        assert_eq!(ChannelKind::Relays.to_string(), "relays");
        assert_eq!(ChannelKind::Relays.default_path(), "relays/ws");
    }
}
