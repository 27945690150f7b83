use thiserror::Error;

/// Top-level error type for the `boatmon-api` crate.
///
/// Covers every failure mode of the REST surface and the live channels.
/// `boatmon-core` maps these into operator-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the settings password (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A protected endpoint was called without a settings password configured.
    #[error("Settings password required for {operation}")]
    PasswordRequired { operation: &'static str },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured base URL cannot carry a path (e.g. `mailto:`).
    #[error("Base URL cannot be used for API requests: {0}")]
    InvalidBaseUrl(String),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Resource not found (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success HTTP status.
    #[error("Backend error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the backend rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::PasswordRequired { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// REST callers never retry automatically; this is used by the
    /// channel loop and by consumers deciding what to show the operator.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Authentication { .. } => Some(401),
            _ => None,
        }
    }
}
