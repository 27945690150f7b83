//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into operator-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use boatmon_config::ConfigError;
use boatmon_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const BUSY: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(boatmon::connection_failed),
        help(
            "Check that the boat backend is running and reachable.\n\
             URL: {url}\n\
             Try: boatmon relays list --url http://<host>:8000"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("No live data arrived within {seconds}s")]
    #[diagnostic(
        code(boatmon::no_data),
        help("The {channel} channel did not deliver an update. Increase --wait or check the backend.")
    )]
    NoData { channel: String, seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(boatmon::auth_failed),
        help(
            "This operation needs the settings password.\n\
             Pass --settings-password, set BOATMON_SETTINGS_PASSWORD,\n\
             or run: boatmon config set-password"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(boatmon::not_found),
        help("Run: boatmon {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Relay rejections ─────────────────────────────────────────────

    #[error("Relay '{relay}' is disabled")]
    #[diagnostic(
        code(boatmon::relay_disabled),
        help("Enable it first: boatmon relays configure {relay} --enable")
    )]
    RelayDisabled { relay: String },

    #[error("A command for relay '{relay}' is still in flight")]
    #[diagnostic(
        code(boatmon::relay_busy),
        help("Wait for the previous command to finish and try again.")
    )]
    RelayBusy { relay: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(boatmon::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(boatmon::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(boatmon::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: boatmon config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(boatmon::no_config),
        help(
            "Create a profile with: boatmon config init\n\
             Or pass --url / set BOATMON_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(boatmon::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(boatmon::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request to the backend timed out")]
    #[diagnostic(
        code(boatmon::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(boatmon::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(boatmon::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(boatmon::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NoData { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::RelayDisabled { .. } => exit_code::REJECTED,
            Self::RelayBusy { .. } => exit_code::BUSY,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::NotConnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "console is not connected".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::RelayNotFound { relay_id } => CliError::NotFound {
                resource_type: "relay".into(),
                identifier: relay_id,
                list_command: "relays list".into(),
            },

            CoreError::RelayDisabled { relay_id } => CliError::RelayDisabled { relay: relay_id },

            CoreError::CommandInFlight { relay_id } => CliError::RelayBusy { relay: relay_id },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::ThresholdsUnavailable => CliError::ApiError {
                code: "unavailable".into(),
                message: "thresholds have not been loaded from the backend".into(),
            },

            CoreError::NotFound { resource } => CliError::ApiError {
                code: "404".into(),
                message: format!("{resource} not found"),
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "error".into(), |s| s.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_rejections_get_distinct_exit_codes() {
        let disabled: CliError = CoreError::RelayDisabled {
            relay_id: "r1".into(),
        }
        .into();
        let busy: CliError = CoreError::CommandInFlight {
            relay_id: "r1".into(),
        }
        .into();
        let missing: CliError = CoreError::RelayNotFound {
            relay_id: "r9".into(),
        }
        .into();

        assert_eq!(disabled.exit_code(), exit_code::REJECTED);
        assert_eq!(busy.exit_code(), exit_code::BUSY);
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn profile_not_found_lists_names() {
        let err: CliError = ConfigError::ProfileNotFound {
            name: "x".into(),
            available: vec!["a".into(), "b".into()],
        }
        .into();
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "a, b"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn api_error_message_includes_status() {
        let err: CliError = CoreError::Api {
            message: "Relay r1 is disabled".into(),
            status: Some(400),
        }
        .into();
        assert_eq!(err.to_string(), "API error (400): Relay r1 is disabled");
    }
}
