//! Feed Ingestion Integration Tests
//!
//! Runs the feed client against a scripted local WebSocket server and checks
//! what readers observe through the snapshot store and the HTTP API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use market_data_cache::infrastructure::feed::HeartbeatConfig;
use market_data_cache::infrastructure::http::router;
use market_data_cache::{
    ApiState, AssetCatalog, CacheFacade, FeedClient, FeedClientConfig, FeedEvent,
    FeedEventHandler, FeedState, ReconnectConfig, SnapshotStore,
};

// =============================================================================
// Scripted Feed Server
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Step {
    Send(&'static str),
    Close,
    Hold,
    /// Keep the socket open without ever reading, so pings go unanswered.
    Silent,
    /// Pause for the given number of milliseconds.
    Wait(u64),
}

struct FeedServer {
    url: String,
    connections: Arc<AtomicUsize>,
    client_closed: Arc<AtomicBool>,
}

/// Serve one script per accepted connection, in order.
///
/// Connections are accepted one after another; each script then runs on its
/// own task so a silent connection never blocks the next accept.
async fn spawn_feed_server(scripts: Vec<Vec<Step>>) -> FeedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));
    let client_closed = Arc::new(AtomicBool::new(false));

    let accepted = Arc::clone(&connections);
    let closed = Arc::clone(&client_closed);
    tokio::spawn(async move {
        for script in scripts {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(run_script(ws, script, Arc::clone(&closed)));
        }
    });

    FeedServer {
        url,
        connections,
        client_closed,
    }
}

async fn run_script(
    mut ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    script: Vec<Step>,
    closed: Arc<AtomicBool>,
) {
    for step in script {
        match step {
            Step::Send(frame) => {
                ws.send(Message::text(frame.to_string())).await.unwrap();
            }
            Step::Close => {
                let _ = ws.close(None).await;
                return;
            }
            Step::Hold => {
                while let Some(Ok(msg)) = ws.next().await {
                    if msg.is_close() {
                        closed.store(true, Ordering::SeqCst);
                    }
                }
                return;
            }
            Step::Silent => {
                sleep(Duration::from_secs(5)).await;
                return;
            }
            Step::Wait(ms) => sleep(Duration::from_millis(ms)).await,
        }
    }
}

// =============================================================================
// Cache Harness
// =============================================================================

struct Cache {
    store: Arc<SnapshotStore>,
    feed_state: Arc<FeedState>,
    cancel: CancellationToken,
    client: JoinHandle<()>,
}

fn start_cache(url: &str) -> Cache {
    let store = Arc::new(SnapshotStore::new());
    let feed_state = Arc::new(FeedState::new());
    let cancel = CancellationToken::new();

    let (tx, rx) = mpsc::channel(64);
    let handler = FeedEventHandler::new(Arc::clone(&store) as _, Arc::clone(&feed_state));
    tokio::spawn(handler.run(rx));

    let mut config = FeedClientConfig::new(url.to_string());
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        ..ReconnectConfig::default()
    };
    let client = Arc::new(FeedClient::new(config, tx, cancel.clone())).start();

    Cache {
        store,
        feed_state,
        cancel,
        client,
    }
}

/// Run a bare feed client and hand back its event stream.
fn start_client(
    url: &str,
    reconnect: ReconnectConfig,
    heartbeat: HeartbeatConfig,
) -> (mpsc::Receiver<FeedEvent>, CancellationToken) {
    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();

    let mut config = FeedClientConfig::new(url.to_string());
    config.reconnect = reconnect;
    config.heartbeat = heartbeat;
    Arc::new(FeedClient::new(config, tx, cancel.clone())).start();

    (rx, cancel)
}

async fn next_event(rx: &mut mpsc::Receiver<FeedEvent>) -> FeedEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no feed event in time")
        .expect("feed client dropped its sender")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn each_frame_replaces_the_whole_snapshot() {
    let server = spawn_feed_server(vec![vec![
        Step::Send(r#"{"BTC":{"p":100,"c":1.5},"ETH":{"p":5,"c":-0.2}}"#),
        Step::Send(r#"{"ETH":{"p":6,"c":0.1}}"#),
        Step::Hold,
    ]])
    .await;
    let cache = start_cache(&server.url);

    wait_until(|| cache.store.replacements() == 2).await;

    let snapshot = cache.store.current();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("BTC").is_none());
    assert_eq!(snapshot.get("ETH").unwrap().price, Decimal::from(6));

    cache.cancel.cancel();
}

#[tokio::test]
async fn malformed_frame_keeps_previous_snapshot() {
    let server = spawn_feed_server(vec![vec![
        Step::Send(r#"{"BTC":{"p":100,"c":1.5}}"#),
        Step::Send("not json"),
        Step::Send(r#"{"BTC":{"c":2}}"#),
        Step::Hold,
    ]])
    .await;
    let cache = start_cache(&server.url);

    wait_until(|| cache.feed_state.get_decode_errors() == 2).await;

    let snapshot = cache.store.current();
    assert_eq!(cache.store.replacements(), 1);
    assert_eq!(snapshot.get("BTC").unwrap().price, Decimal::from(100));
    assert_eq!(cache.feed_state.get_frames_received(), 3);

    cache.cancel.cancel();
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let server = spawn_feed_server(vec![
        vec![Step::Send(r#"{"BTC":{"p":1}}"#), Step::Close],
        vec![Step::Send(r#"{"BTC":{"p":2}}"#), Step::Hold],
    ])
    .await;
    let cache = start_cache(&server.url);

    wait_until(|| {
        cache
            .store
            .current()
            .get("BTC")
            .is_some_and(|r| r.price == Decimal::from(2))
    })
    .await;

    assert_eq!(server.connections.load(Ordering::SeqCst), 2);
    assert!(cache.feed_state.get_state().is_open());

    cache.cancel.cancel();
}

#[tokio::test]
async fn shutdown_sends_close_frame_and_stops() {
    let server = spawn_feed_server(vec![vec![Step::Hold]]).await;
    let cache = start_cache(&server.url);

    wait_until(|| cache.feed_state.get_state().is_open()).await;

    cache.cancel.cancel();
    timeout(Duration::from_secs(2), cache.client)
        .await
        .expect("feed client should stop on cancel")
        .expect("feed client should not panic");

    wait_until(|| server.client_closed.load(Ordering::SeqCst)).await;
}

#[tokio::test]
async fn api_serves_ingested_snapshot() {
    let server = spawn_feed_server(vec![vec![
        Step::Send(r#"{"SHIB":{"p":0.00001,"c":3},"BTC":{"p":64000,"c":-1}}"#),
        Step::Hold,
    ]])
    .await;
    let cache = start_cache(&server.url);

    wait_until(|| cache.store.replacements() == 1).await;

    let state = ApiState::new(
        CacheFacade::new(Arc::clone(&cache.store) as _),
        Arc::new(AssetCatalog::builtin()),
    );
    let response = router(Arc::new(state))
        .oneshot(Request::get("/api/crypto/all").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let items = body.as_array().unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "BTC");
    assert_eq!(items[0]["price"], 64000.0);
    assert_eq!(items[1]["id"], "SHIB");
    assert_eq!(items[1]["name"], "Shiba Inu");

    cache.cancel.cancel();
}

#[tokio::test]
async fn silent_server_trips_heartbeat_and_reconnects() {
    let server = spawn_feed_server(vec![
        vec![Step::Silent],
        vec![Step::Send(r#"{"BTC":{"p":1}}"#), Step::Hold],
    ])
    .await;
    let (mut rx, cancel) = start_client(
        &server.url,
        ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            ..ReconnectConfig::default()
        },
        HeartbeatConfig {
            ping_interval: Duration::from_millis(100),
            pong_timeout: Duration::from_millis(50),
        },
    );

    let failure = loop {
        match next_event(&mut rx).await {
            FeedEvent::Failed(reason) => break reason,
            FeedEvent::Snapshot(_) => panic!("silent server sends no frames"),
            _ => {}
        }
    };
    assert!(failure.contains("heartbeat timed out"), "unexpected failure: {failure}");

    loop {
        if let FeedEvent::Snapshot(snapshot) = next_event(&mut rx).await {
            assert_eq!(snapshot.get("BTC").unwrap().price, Decimal::from(1));
            break;
        }
    }
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);

    cancel.cancel();
}

#[tokio::test]
async fn stable_connection_resets_backoff_attempts() {
    let server = spawn_feed_server(vec![
        vec![Step::Close],
        vec![Step::Close],
        vec![Step::Wait(400), Step::Close],
        vec![Step::Close],
        vec![Step::Hold],
    ])
    .await;
    let (mut rx, cancel) = start_client(
        &server.url,
        ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            stable_period: Duration::from_millis(200),
            ..ReconnectConfig::default()
        },
        HeartbeatConfig::default(),
    );

    let mut attempts = Vec::new();
    while attempts.len() < 4 {
        if let FeedEvent::Reconnecting { attempt, .. } = next_event(&mut rx).await {
            attempts.push(attempt);
        }
    }

    assert_eq!(attempts, vec![1, 2, 1, 2]);

    cancel.cancel();
}
