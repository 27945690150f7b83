//! Live telemetry channel with auto-reconnect.
//!
//! Each channel is one websocket to the backend. Decoded [`Envelope`]s are
//! forwarded, in arrival order, into an `mpsc` sink owned by the consumer.
//! The channel walks an explicit state machine and publishes every
//! transition through a [`watch`] channel:
//!
//! ```text
//! connecting ──handshake ok──▶ open
//!     │                          │
//!     │ handshake failed         │ close / error
//!     ▼                          ▼
//! reconnecting ◀─────────────────┘
//!     │
//!     └──fixed delay──▶ connecting
//!
//! any state ──cancel──▶ closed
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use boatmon_api::websocket::{ChannelHandle, ChannelSpec, ReconnectPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(256);
//! let spec = ChannelSpec::new("sensors", "ws://boat.local:8000/api/sensors/ws".parse()?);
//! let handle = ChannelHandle::open(spec, ReconnectPolicy::default(), tx, CancellationToken::new());
//!
//! while let Some(envelope) = rx.recv().await {
//!     println!("{}", envelope.kind());
//! }
//!
//! handle.close().await;
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::envelope::Envelope;
use crate::error::Error;

// ── Connection state ─────────────────────────────────────────────────

/// Lifecycle phase of a channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelStatus {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Observable state of one logical channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub channel_id: String,
    pub status: ChannelStatus,
    /// Connecting attempts since the last successful open.
    pub attempt_count: u32,
}

impl ConnectionState {
    fn new(channel_id: &str, status: ChannelStatus, attempt_count: u32) -> Self {
        Self {
            channel_id: channel_id.to_owned(),
            status,
            attempt_count,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ChannelStatus::Open
    }
}

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Constant-delay reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Pause between a drop and the next connecting attempt. Default: 3s.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
        }
    }
}

// ── ChannelSpec ──────────────────────────────────────────────────────

/// What to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel_id: String,
    pub url: Url,
}

impl ChannelSpec {
    pub fn new(channel_id: impl Into<String>, url: Url) -> Self {
        Self {
            channel_id: channel_id.into(),
            url,
        }
    }
}

// ── ChannelHandle ────────────────────────────────────────────────────

/// Handle to a running channel task.
///
/// Dropping the handle cancels the task. Use [`close`](Self::close) to
/// cancel and wait until the terminal `closed` state has been published.
#[derive(Debug)]
pub struct ChannelHandle {
    channel_id: String,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Spawn the channel task. Returns immediately; the first connecting
    /// attempt happens in the background.
    ///
    /// `cancel` should be a token dedicated to this channel (typically a
    /// child of the owner's token) since it is cancelled on close.
    pub fn open(
        spec: ChannelSpec,
        policy: ReconnectPolicy,
        sink: mpsc::Sender<Envelope>,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::new(
            &spec.channel_id,
            ChannelStatus::Connecting,
            0,
        ));

        let channel_id = spec.channel_id.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            ws_loop(spec, policy, sink, state_tx, task_cancel).await;
        });

        Self {
            channel_id,
            state_rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Current state of the channel.
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// A receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Signal the task to stop without waiting for it.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Cancel the task and wait for it to exit.
    ///
    /// No reconnect is scheduled after this returns.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(channel = %self.channel_id, error = %e, "channel task ended abnormally");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// How an opened connection ended. Handshake failures are `Err` instead.
enum ReadOutcome {
    /// The stream ended without a close frame.
    Disconnected,
    /// Close frame or read error after the channel was open.
    Dropped(Error),
    /// Nobody is listening any more; stop for good.
    SinkClosed,
}

async fn ws_loop(
    spec: ChannelSpec,
    policy: ReconnectPolicy,
    sink: mpsc::Sender<Envelope>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let channel = spec.channel_id.as_str();
    let publish = |status, attempt| {
        state_tx.send_replace(ConnectionState::new(channel, status, attempt));
    };
    let mut attempt: u32 = 0;

    loop {
        publish(ChannelStatus::Connecting, attempt);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&spec, &sink, move || publish(ChannelStatus::Open, 0)) => {
                match result {
                    Ok(ReadOutcome::SinkClosed) => {
                        debug!(channel, "envelope sink closed, stopping channel");
                        break;
                    }
                    Ok(ReadOutcome::Disconnected) => {
                        info!(channel, "channel disconnected");
                        attempt = 0;
                    }
                    Ok(ReadOutcome::Dropped(e)) => {
                        warn!(channel, error = %e, "channel dropped");
                        attempt = 0;
                    }
                    Err(e) => {
                        warn!(channel, error = %e, attempt, "channel handshake failed");
                    }
                }
            }
        }

        publish(ChannelStatus::Reconnecting, attempt);
        info!(
            channel,
            delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(policy.delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    publish(ChannelStatus::Closed, attempt);
    debug!(channel, "channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one websocket connection and forward frames until it drops.
async fn connect_and_read(
    spec: &ChannelSpec,
    sink: &mpsc::Sender<Envelope>,
    on_open: impl FnOnce(),
) -> Result<ReadOutcome, Error> {
    let channel = spec.channel_id.as_str();
    info!(channel, url = %spec.url, "connecting channel");

    let uri: tungstenite::http::Uri = spec
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    info!(channel, "channel open");
    on_open();

    let (_write, mut read) = ws_stream.split();

    while let Some(frame) = read.next().await {
        match frame {
            Ok(tungstenite::Message::Text(text)) => {
                let Some(envelope) = decode_frame(channel, &text) else {
                    continue;
                };
                if sink.send(envelope).await.is_err() {
                    return Ok(ReadOutcome::SinkClosed);
                }
            }
            Ok(tungstenite::Message::Ping(_)) => {
                // tungstenite answers pings on the next read
                trace!(channel, "ping");
            }
            Ok(tungstenite::Message::Close(frame)) => {
                return Ok(ReadOutcome::Dropped(match frame {
                    Some(cf) => Error::WebSocketClosed {
                        code: cf.code.into(),
                        reason: cf.reason.to_string(),
                    },
                    None => Error::WebSocketClosed {
                        code: 1005,
                        reason: "no close payload".into(),
                    },
                }));
            }
            Ok(_) => {
                // Binary, Pong, Frame
            }
            Err(e) => {
                return Ok(ReadOutcome::Dropped(Error::WebSocketConnect(e.to_string())));
            }
        }
    }

    Ok(ReadOutcome::Disconnected)
}

/// Decode a text frame, logging and dropping anything unusable.
fn decode_frame(channel: &str, text: &str) -> Option<Envelope> {
    match Envelope::decode(text) {
        Ok(Envelope::Unknown { kind }) => {
            debug!(channel, kind, "dropping envelope with unknown type");
            None
        }
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(channel, error = %e, "dropping malformed frame");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
