// ── Core error types ──
//
// Operator-facing errors from boatmon-core. Consumers never see raw
// HTTP or JSON failures; the `From<boatmon_api::Error>` impl translates
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Console is not connected")]
    NotConnected,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Backend request timed out")]
    Timeout,

    // ── Relay command rejections ─────────────────────────────────────
    #[error("Relay not found: {relay_id}")]
    RelayNotFound { relay_id: String },

    #[error("Relay {relay_id} is disabled")]
    RelayDisabled { relay_id: String },

    #[error("A command for relay {relay_id} is already in flight")]
    CommandInFlight { relay_id: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Thresholds have not been loaded")]
    ThresholdsUnavailable,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for rejections decided locally, before any request was sent.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RelayNotFound { .. }
                | Self::RelayDisabled { .. }
                | Self::CommandInFlight { .. }
                | Self::ValidationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<boatmon_api::Error> for CoreError {
    fn from(err: boatmon_api::Error) -> Self {
        match err {
            boatmon_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            boatmon_api::Error::PasswordRequired { operation } => CoreError::AuthenticationFailed {
                message: format!("{operation} needs the settings password, none is configured"),
            },
            boatmon_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            boatmon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            boatmon_api::Error::InvalidBaseUrl(url) => CoreError::Config {
                message: format!("base URL cannot carry API paths: {url}"),
            },
            boatmon_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            boatmon_api::Error::NotFound { path } => CoreError::NotFound { resource: path },
            boatmon_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            boatmon_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            boatmon_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            boatmon_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
