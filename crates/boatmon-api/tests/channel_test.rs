#![allow(clippy::unwrap_used)]
// Integration tests for `ChannelHandle` against a local websocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use boatmon_api::{
    ChannelHandle, ChannelSpec, ChannelStatus, ConnectionState, Envelope, ReconnectPolicy,
};

const DELAY: Duration = Duration::from_millis(200);

// ── Helpers ─────────────────────────────────────────────────────────

async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("ws://{addr}/api/sensors/ws")).unwrap();
    (listener, url)
}

fn open(url: Url) -> (ChannelHandle, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = ChannelHandle::open(
        ChannelSpec::new("sensors", url),
        ReconnectPolicy { delay: DELAY },
        tx,
        CancellationToken::new(),
    );
    (handle, rx)
}

async fn wait_for(
    rx: &mut watch::Receiver<ConnectionState>,
    pred: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for channel state")
        .unwrap()
        .clone()
}

async fn recv(rx: &mut mpsc::Receiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for envelope")
        .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_frames_forwarded_in_order_and_malformed_dropped() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in [
            r#"{"type":"sensor_update","timestamp":1.0,"data":{"engine_rpm":1800.0}}"#,
            "definitely not json",
            r#"{"type":"weather_update","data":{}}"#,
            r#"{"data":{"engine_rpm":1.0}}"#,
            r#"{"type":"relay_update","data":{"r1":{"id":"r1","state":true,"enabled":true}}}"#,
        ] {
            ws.send(Message::text(frame)).await.unwrap();
        }
        // Hold the connection open until the client goes away.
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let (handle, mut rx) = open(url);

    match recv(&mut rx).await {
        Envelope::SensorUpdate(data) => assert_eq!(data["engine_rpm"], 1800.0),
        other => panic!("expected sensor update first, got {other:?}"),
    }
    match recv(&mut rx).await {
        Envelope::RelayUpdate(relays) => assert!(relays["r1"].state),
        other => panic!("expected relay update second, got {other:?}"),
    }

    assert!(handle.state().is_open());
    handle.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_forced_close_reconnects_after_fixed_delay() {
    let (listener, url) = bind().await;
    let (arrivals_tx, mut arrivals_rx) = mpsc::unbounded_channel::<Instant>();
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<Instant>();
    let connections = Arc::new(AtomicUsize::new(0));
    let server_connections = Arc::clone(&connections);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let n = server_connections.fetch_add(1, Ordering::SeqCst);
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            arrivals_tx.send(Instant::now()).unwrap();
            if n == 0 {
                closed_tx.send(Instant::now()).unwrap();
                ws.close(None).await.unwrap();
            } else {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    drop(ws);
                });
            }
        }
    });

    let (handle, _rx) = open(url);
    let mut states = handle.subscribe_state();

    arrivals_rx.recv().await.unwrap();
    let closed_at = closed_rx.recv().await.unwrap();

    let reconnecting = wait_for(&mut states, |s| s.status == ChannelStatus::Reconnecting).await;
    assert_eq!(reconnecting.channel_id, "sensors");
    assert_eq!(reconnecting.attempt_count, 0);

    let second = tokio::time::timeout(Duration::from_secs(5), arrivals_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(
        second.duration_since(closed_at) >= DELAY,
        "reconnected after {:?}, before the fixed delay",
        second.duration_since(closed_at)
    );

    let reopened = wait_for(&mut states, |s| s.status == ChannelStatus::Open).await;
    assert_eq!(reopened.attempt_count, 0);

    let mut final_states = handle.subscribe_state();
    handle.close().await;
    assert_eq!(final_states.borrow_and_update().status, ChannelStatus::Closed);

    // Nothing reconnects after an explicit close.
    tokio::time::sleep(DELAY * 3).await;
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_handshakes_count_attempts_and_stop_on_close() {
    let (listener, url) = bind().await;
    let connections = Arc::new(AtomicUsize::new(0));
    let server_connections = Arc::clone(&connections);

    // Accept TCP and hang up immediately so every handshake fails.
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            server_connections.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let (handle, _rx) = open(url);
    let mut states = handle.subscribe_state();

    let state = wait_for(&mut states, |s| {
        s.status == ChannelStatus::Reconnecting && s.attempt_count >= 1
    })
    .await;
    assert!(!state.is_open());

    handle.close().await;
    let after_close = connections.load(Ordering::SeqCst);

    tokio::time::sleep(DELAY * 3).await;
    assert_eq!(connections.load(Ordering::SeqCst), after_close);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_sink_stops_channel() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        loop {
            let frame = r#"{"type":"sensor_update","data":{"fuel_tank":40.0}}"#;
            if ws.send(Message::text(frame)).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let (handle, rx) = open(url);
    let mut states = handle.subscribe_state();
    wait_for(&mut states, ConnectionState::is_open).await;
    drop(rx);

    let state = wait_for(&mut states, |s| s.status == ChannelStatus::Closed).await;
    assert_eq!(state.channel_id, "sensors");
}
