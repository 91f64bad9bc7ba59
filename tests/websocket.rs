//! WebSocket passthrough tests.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

mod common;

use common::{memory_store, start_gateway, start_ws_upstream, test_config, API_KEY};

#[tokio::test]
async fn test_upgrade_spliced_to_cluster_root() {
    let upstream = start_ws_upstream().await;
    let (gateway, shutdown) = start_gateway(test_config(upstream), memory_store()).await;

    // The path is dropped: the upstream only serves `/`.
    let (mut ws, response) =
        tokio_tungstenite::connect_async(format!("ws://{}/ignored/path?cluster=devnet", gateway))
            .await
            .expect("upgrade through gateway");
    assert_eq!(response.status(), 101);

    let hello = ws.next().await.unwrap().unwrap();
    assert_eq!(hello.into_text().unwrap().as_str(), format!("api-key={}", API_KEY));

    ws.send(Message::Text("ping".into())).await.unwrap();
    let echoed = ws.next().await.unwrap().unwrap();
    assert_eq!(echoed.into_text().unwrap().as_str(), "ping");

    ws.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
    let echoed = ws.next().await.unwrap().unwrap();
    assert_eq!(echoed.into_data().as_ref(), &[1u8, 2, 3]);

    ws.close(None).await.unwrap();
    shutdown.trigger();
}

#[tokio::test]
async fn test_upgrade_counts_against_rate_limit() {
    let upstream = start_ws_upstream().await;
    let mut config = test_config(upstream);
    config.rate_limit.max_requests = 1;
    let (gateway, shutdown) = start_gateway(config, memory_store()).await;

    let url = format!("ws://{}/", gateway);
    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let second = tokio_tungstenite::connect_async(url.as_str()).await;
    match second {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 429);
        }
        other => panic!("expected HTTP 429, got {:?}", other.map(|(_, r)| r.status())),
    }

    first.close(None).await.unwrap();
    shutdown.trigger();
}

#[tokio::test]
async fn test_refused_upgrade_relayed() {
    // A plain HTTP upstream answers the handshake with 200, not 101.
    let upstream = common::start_mock_upstream(axum::http::StatusCode::OK, "no upgrade here").await;
    let (gateway, shutdown) = start_gateway(test_config(upstream.addr), memory_store()).await;

    let mut request = format!("ws://{}/", gateway).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-client-tag", HeaderValue::from_static("tag-1"));

    let result = tokio_tungstenite::connect_async(request).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 200);
        }
        other => panic!("expected HTTP error, got {:?}", other.map(|(_, r)| r.status())),
    }

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/");
    assert_eq!(seen[0].query.as_deref(), Some(format!("api-key={}", API_KEY).as_str()));
    assert_eq!(seen[0].headers["upgrade"], "websocket");
    assert!(seen[0].headers.get("sec-websocket-key").is_some());
    assert_eq!(seen[0].headers["x-client-tag"], "tag-1");
    assert!(
        seen[0].headers.get("x-request-id").is_none(),
        "gateway-generated request id must not reach upstream"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_client_request_id_forwarded_on_upgrade() {
    let upstream = common::start_mock_upstream(axum::http::StatusCode::OK, "no upgrade here").await;
    let (gateway, shutdown) = start_gateway(test_config(upstream.addr), memory_store()).await;

    let mut request = format!("ws://{}/", gateway).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-request-id", HeaderValue::from_static("client-chosen"));
    let _ = tokio_tungstenite::connect_async(request).await;

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].headers["x-request-id"], "client-chosen");

    shutdown.trigger();
}
