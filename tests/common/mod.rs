//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;

use rpc_edge_proxy::config::GatewayConfig;
use rpc_edge_proxy::http::HttpServer;
use rpc_edge_proxy::lifecycle::Shutdown;
use rpc_edge_proxy::store::{KvStore, MemoryStore, StoreError};

pub const API_KEY: &str = "test-key";

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct UpstreamState {
    seen: Arc<Mutex<Vec<RecordedRequest>>>,
    status: StatusCode,
    body: &'static str,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

async fn record(
    State(state): State<UpstreamState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.seen.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    (
        state.status,
        [("content-type", "text/plain"), ("x-upstream", "yes")],
        state.body,
    )
        .into_response()
}

/// Start an upstream that records every request and answers `status` / `body`.
#[allow(dead_code)]
pub async fn start_mock_upstream(status: StatusCode, body: &'static str) -> MockUpstream {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = UpstreamState {
        seen: seen.clone(),
        status,
        body,
    };
    let app = Router::new()
        .route("/", any(record))
        .route("/{*path}", any(record))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, seen }
}

async fn ws_root(ws: WebSocketUpgrade, Query(params): Query<HashMap<String, String>>) -> Response {
    let key = params.get("api-key").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| echo(socket, key))
}

async fn echo(mut socket: WebSocket, key: String) {
    if socket
        .send(Message::Text(format!("api-key={}", key).into()))
        .await
        .is_err()
    {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(msg).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Start a WebSocket echo upstream that only accepts upgrades on `/`.
///
/// The first message names the `api-key` the upgrade request carried.
#[allow(dead_code)]
pub async fn start_ws_upstream() -> SocketAddr {
    let app = Router::new().route("/", any(ws_root));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Gateway config pointing both upstreams at `upstream`.
///
/// Cluster traffic lands on `/`, API traffic under `/api`.
pub fn test_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.api_key = API_KEY.into();
    config.upstream.cluster_url_template = format!("http://{}", upstream);
    config.upstream.api_url = format!("http://{}/api", upstream);
    config.rate_limit.max_requests = 50;
    // Large enough that a test never straddles a window boundary.
    config.rate_limit.window_secs = 1_000_000;
    config.rate_limit.counter_ttl_secs = 1_000_000;
    config
}

/// Spawn a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig, store: Arc<dyn KvStore>) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

#[allow(dead_code)]
pub fn memory_store() -> Arc<dyn KvStore> {
    Arc::new(MemoryStore::new())
}

/// A store whose backend is always down.
#[allow(dead_code)]
pub struct DownStore;

#[async_trait]
impl KvStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
