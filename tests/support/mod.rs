// Shared server bootstrapping and peer helpers for integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use position_sync::SyncSettings;
use position_sync::domain::{PeerId, PeerSnapshot, Position};
use position_sync::interface_adapters::protocol::{ClientUpdate, ServerMessage};
use std::{
    future::Future,
    net::SocketAddr,
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

// Global base URL used by tests that share one server.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the shared server bootstrap runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

/// Short ticks, and full syncs far enough apart that they never interleave unless asked.
pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        tick_interval: Duration::from_millis(20),
        full_sync_interval: Duration::from_secs(60),
        outbound_capacity: 64,
    }
}

/// Starts an isolated server on an ephemeral port inside the current test runtime.
pub async fn spawn_server(settings: SyncSettings) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        position_sync::run(listener, settings)
            .await
            .expect("server failed");
    });
    addr
}

/// Ensure the shared test server is running and return its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                position_sync::run(listener, fast_settings())
                    .await
                    .expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket handshake");
    client
}

/// Next binary message from the server, raw and decoded.
pub async fn recv_message(client: &mut Client) -> (Vec<u8>, ServerMessage) {
    let next = async {
        loop {
            match client.next().await {
                Some(Ok(Message::Binary(data))) => {
                    let raw = data.to_vec();
                    let msg = ServerMessage::decode(&raw).expect("server sent a valid message");
                    return (raw, msg);
                }
                Some(Ok(Message::Close(frame))) => panic!("server closed connection: {frame:?}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("websocket error: {e}"),
                None => panic!("websocket ended"),
            }
        }
    };
    tokio::time::timeout(WAIT_LIMIT, next)
        .await
        .expect("timed out waiting for a server message")
}

/// Skips messages until `pick` returns something.
pub async fn recv_until<T>(
    client: &mut Client,
    mut pick: impl FnMut(&[u8], &ServerMessage) -> Option<T>,
) -> T {
    loop {
        let (raw, msg) = recv_message(client).await;
        if let Some(found) = pick(&raw, &msg) {
            return found;
        }
    }
}

/// The first message of every connection must be the welcome.
pub async fn welcome(client: &mut Client) -> (PeerId, Vec<PeerSnapshot>) {
    match recv_message(client).await {
        (_, ServerMessage::Welcome { assigned_id, peers }) => (assigned_id, peers),
        (_, other) => panic!("expected welcome first, got {other:?}"),
    }
}

pub async fn send_update(client: &mut Client, x: i32, y: i32) {
    send_raw(client, ClientUpdate { x, y }.encode().to_vec()).await;
}

pub async fn send_raw(client: &mut Client, frame: Vec<u8>) {
    client
        .send(Message::binary(frame))
        .await
        .expect("send frame");
}

pub async fn peer_position(addr: SocketAddr, id: PeerId) -> Option<Position> {
    let response = reqwest::get(format!("http://{addr}/peers/{}", id.0))
        .await
        .expect("peer request");
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return None;
    }
    let body: serde_json::Value = response.json().await.expect("peer json");
    let x = body["x"].as_i64().expect("x") as i32;
    let y = body["y"].as_i64().expect("y") as i32;
    Some(Position::new(x, y))
}

pub async fn peer_ids(addr: SocketAddr) -> Vec<u8> {
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/peers"))
        .await
        .expect("peers request")
        .json()
        .await
        .expect("peers json");
    body["peers"]
        .as_array()
        .expect("peers array")
        .iter()
        .map(|peer| peer["id"].as_u64().expect("id") as u8)
        .collect()
}

/// Polls `check` until it holds, failing the test after a few seconds.
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}
