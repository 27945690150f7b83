//! Shared configuration for the boatmon tools.
//!
//! TOML profiles with `BOATMON_` environment overrides, settings-password
//! resolution (env + keyring + plaintext), and translation to
//! `boatmon_core::ConsoleConfig`. The CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use boatmon_core::{ChannelConfig, ChannelKind, ConsoleConfig, TlsVerification};

/// Keyring service name for stored settings passwords.
pub const KEYRING_SERVICE: &str = "boatmon";

/// Environment variable consulted for the settings password when a
/// profile does not name its own.
pub const SETTINGS_PASSWORD_ENV: &str = "BOATMON_SETTINGS_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use: explicit choice, then `default_profile`, then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Sorted profile names.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// REST timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://boat.local:8000").
    pub url: String,

    /// Path prefix for REST and channel endpoints.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Settings password (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_password: Option<String>,

    /// Environment variable name containing the settings password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_password_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Live channels to open. All three when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<ChannelKind>>,

    /// Delay between reconnect attempts, e.g. `"3s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay: Option<String>,

    /// Threshold refresh period, e.g. `"10s"`. `"0s"` disables polling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_poll: Option<String>,

    /// How long a relay command waits for the relay channel, e.g. `"2s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_fallback_window: Option<String>,
}

fn default_api_prefix() -> String {
    "api".into()
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_prefix: default_api_prefix(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "boatmon", "boatmon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("boatmon");
    p
}

/// Directory for log files written by long-running commands.
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "boatmon", "boatmon").map_or_else(
        || dirs_fallback().join("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore: `BOATMON_PROFILES__BOAT__URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOATMON_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Settings password ───────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/settings-password"))
}

/// Resolve the settings password.
///
/// Order: the profile's `settings_password_env`, `BOATMON_SETTINGS_PASSWORD`,
/// the system keyring, plaintext in the profile. `None` when nothing is set;
/// read-only commands work without it.
pub fn resolve_settings_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's settings_password_env → env var lookup
    if let Some(ref env_name) = profile.settings_password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(SETTINGS_PASSWORD_ENV) {
        return Some(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    profile
        .settings_password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Store the settings password for `profile_name` in the system keyring.
pub fn store_settings_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation to ConsoleConfig ────────────────────────────────────

fn parse_duration(field: &str, value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    value.map_or(Ok(default), |raw| {
        humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
            field: field.into(),
            reason: format!("'{raw}': {e}"),
        })
    })
}

/// Build a `ConsoleConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_console_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("expected an http(s) URL, got '{}'", url.scheme()),
        });
    }

    let mut config = ConsoleConfig::new(url);
    config.api_prefix.clone_from(&profile.api_prefix);

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    if let Some(secs) = profile.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ref kinds) = profile.channels {
        config.channels = kinds.iter().copied().map(ChannelConfig::new).collect();
    }

    config.reconnect_delay = parse_duration(
        "reconnect_delay",
        profile.reconnect_delay.as_deref(),
        config.reconnect_delay,
    )?;
    config.threshold_poll_interval = parse_duration(
        "threshold_poll",
        profile.threshold_poll.as_deref(),
        config.threshold_poll_interval,
    )?;
    config.relay_fallback_window = parse_duration(
        "relay_fallback_window",
        profile.relay_fallback_window.as_deref(),
        config.relay_fallback_window,
    )?;

    config.settings_password = resolve_settings_password(profile, profile_name);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 10);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("http://boat.local:8000");
        profile.channels = Some(vec![ChannelKind::Sensors, ChannelKind::Relays]);
        profile.reconnect_delay = Some("5s".into());
        cfg.profiles.insert("boat".into(), profile.clone());
        cfg.default_profile = Some("boat".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile.as_deref(), Some("boat"));
        assert_eq!(loaded.profile("boat").unwrap(), &profile);
    }

    #[test]
    fn profile_fields_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "yacht"

[profiles.yacht]
url = "https://yacht.local"
api_prefix = "v2/api"
insecure = true
channels = ["sensors"]
threshold_poll = "30s"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        let name = cfg.active_profile_name(None);
        let console = profile_to_console_config(cfg.profile(&name).unwrap(), &name).unwrap();

        assert_eq!(console.url.as_str(), "https://yacht.local/");
        assert_eq!(console.api_prefix, "v2/api");
        assert_eq!(console.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(console.channels, vec![ChannelConfig::new(ChannelKind::Sensors)]);
        assert_eq!(console.threshold_poll_interval, Duration::from_secs(30));
        assert_eq!(console.reconnect_delay, Duration::from_secs(3));
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("b".into(), Profile::new("http://b"));
        cfg.profiles.insert("a".into(), Profile::new("http://a"));

        match cfg.profile("c") {
            Err(ConfigError::ProfileNotFound { name, available }) => {
                assert_eq!(name, "c");
                assert_eq!(available, vec!["a".to_owned(), "b".to_owned()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(cfg.active_profile_name(Some("a")), "a");
    }

    #[test]
    fn bad_values_are_rejected() {
        let bad_url = Profile::new("not a url");
        assert!(matches!(
            profile_to_console_config(&bad_url, "x"),
            Err(ConfigError::Validation { .. })
        ));

        let ws_url = Profile::new("ws://boat.local");
        assert!(profile_to_console_config(&ws_url, "x").is_err());

        let mut bad_delay = Profile::new("http://boat.local");
        bad_delay.reconnect_delay = Some("soon".into());
        match profile_to_console_config(&bad_delay, "x") {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "reconnect_delay"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn plaintext_password_is_last_resort() {
        let mut profile = Profile::new("http://boat.local");
        profile.settings_password = Some("hunter2".into());
        profile.settings_password_env = Some("BOATMON_TEST_UNSET_PASSWORD_VAR".into());
        // Env and keyring may be populated on a developer machine; only
        // assert that a password is found.
        assert!(resolve_settings_password(&profile, "config-test-profile").is_some());
    }
}
