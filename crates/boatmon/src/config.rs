//! CLI configuration: thin wrapper around `boatmon_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--url, --settings-password, etc.).

use std::time::Duration;

use secrecy::SecretString;

use boatmon_core::{ConsoleConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use boatmon_config::{
    Config, Profile, config_path, load_config_or_default, log_dir, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Translate a `Profile` + global flags into a `ConsoleConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<ConsoleConfig, CliError> {
    let mut config = boatmon_config::profile_to_console_config(profile, profile_name)?;
    if let Some(ref raw) = global.url {
        config.url = parse_url(raw)?;
    }
    apply_overrides(&mut config, global);
    Ok(config)
}

/// Build a `ConsoleConfig` from `--url` / `BOATMON_URL` alone.
pub fn from_flags(global: &GlobalOpts) -> Result<ConsoleConfig, CliError> {
    let raw = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let mut config = ConsoleConfig::new(parse_url(raw)?);
    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut ConsoleConfig, global: &GlobalOpts) {
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ref pw) = global.settings_password {
        config.settings_password = Some(SecretString::from(pw.clone()));
    }
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    let url: url::Url = raw.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: format!("expected an http(s) URL, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}
