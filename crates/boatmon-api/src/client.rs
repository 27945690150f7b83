// Backend REST client
//
// Wraps `reqwest::Client` with URL construction under the API prefix,
// settings-password injection, and status-to-error mapping. Endpoint
// groups (thresholds, relays, calibration) are implemented as inherent
// methods in sibling files to keep this module focused on transport.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::ErrorDetail;
use crate::transport::TransportConfig;

/// Header the backend checks on settings-protected endpoints.
const PASSWORD_HEADER: &str = "password";

const DEFAULT_API_PREFIX: &str = "api";

/// Raw HTTP client for the boat monitoring backend.
///
/// Cheap to clone: the inner `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    api_prefix: String,
    settings_password: Option<SecretString>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_prefix", &self.api_prefix)
            .field("settings_password", &self.settings_password.is_some())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root (e.g. `http://boat.local:8000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            api_prefix: DEFAULT_API_PREFIX.to_owned(),
            settings_password: None,
        }
    }

    /// Attach the settings password sent on protected endpoints.
    pub fn with_settings_password(mut self, password: SecretString) -> Self {
        self.settings_password = Some(password);
        self
    }

    /// Override the path prefix every REST and channel path hangs off.
    ///
    /// Leading and trailing slashes are ignored; an empty prefix mounts
    /// endpoints directly on the base URL.
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        prefix.trim_matches('/').clone_into(&mut self.api_prefix);
        self
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a settings password is configured.
    pub fn has_settings_password(&self) -> bool {
        self.settings_password.is_some()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{prefix}/{segments...}`, percent-encoding each segment.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(self.api_prefix.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        Ok(url)
    }

    /// Build the websocket URL for a channel path such as `sensors/ws`.
    ///
    /// `http` maps to `ws`, `https` to `wss`.
    pub fn channel_url(&self, path: &str) -> Result<Url, Error> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut url = self.api_url(&segments)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?;
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::parse_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).send().await?;
        Self::parse_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PUT {}", url);
        let resp = self.http.put(url).json(body).send().await?;
        Self::parse_response(resp).await
    }

    /// Send a settings-protected request carrying the `password` header.
    pub(crate) async fn send_protected<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
        operation: &'static str,
    ) -> Result<T, Error> {
        let password = self
            .settings_password
            .as_ref()
            .ok_or(Error::PasswordRequired { operation })?;

        debug!("{} {} (protected)", method, url);
        let mut builder = self
            .http
            .request(method, url)
            .header(PASSWORD_HEADER, password.expose_secret());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        Self::parse_response(resp).await
    }

    /// Map HTTP status to errors and decode a success body.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let path = resp.url().path().to_owned();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(match status {
                reqwest::StatusCode::UNAUTHORIZED => Error::Authentication { message },
                reqwest::StatusCode::NOT_FOUND => Error::NotFound { path },
                _ => Error::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// Pull `detail` out of an error body, falling back to a preview.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(ErrorDetail {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) => preview(body).to_owned(),
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn api_url_appends_prefix_and_segments() {
        let c = client("http://boat.local:8000");
        let url = c.api_url(&["relays", "relay_0", "on"]).unwrap();
        assert_eq!(url.as_str(), "http://boat.local:8000/api/relays/relay_0/on");
    }

    #[test]
    fn api_url_keeps_base_path() {
        let c = client("https://gateway.example/boat/").with_api_prefix("/v1/api/");
        let url = c.api_url(&["thresholds"]).unwrap();
        assert_eq!(url.as_str(), "https://gateway.example/boat/v1/api/thresholds");
    }

    #[test]
    fn api_url_encodes_ids() {
        let c = client("http://boat.local");
        let url = c.api_url(&["relays", "deck light"]).unwrap();
        assert_eq!(url.path(), "/api/relays/deck%20light");
    }

    #[test]
    fn channel_url_switches_scheme() {
        assert_eq!(
            client("http://boat.local:8000")
                .channel_url("/sensors/ws")
                .unwrap()
                .as_str(),
            "ws://boat.local:8000/api/sensors/ws"
        );
        assert_eq!(
            client("https://boat.example")
                .channel_url("relays/ws")
                .unwrap()
                .as_str(),
            "wss://boat.example/api/relays/ws"
        );
    }

    #[test]
    fn cannot_be_a_base_url_is_rejected() {
        let c = client("mailto:skipper@example.com");
        assert!(matches!(
            c.api_url(&["relays"]),
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn error_message_prefers_detail() {
        assert_eq!(error_message(r#"{"detail":"Invalid password"}"#), "Invalid password");
        assert_eq!(error_message("upstream exploded"), "upstream exploded");
    }

    #[test]
    fn debug_hides_password() {
        let c = client("http://boat.local").with_settings_password("hunter2".into());
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("settings_password: true"));
    }
}
