//! WebSocket hub integration tests
//!
//! Each test binds its own server on an ephemeral loopback port.
//!
//! Run with: cargo test -p integration-tests --test ws_tests

use std::time::Duration;

use axum::{routing::get, Router};
use futures_util::{SinkExt, StreamExt};
use integration_tests::{
    chat_dispatcher, echo_dispatcher, recording_client, wait_until, ChatMessage, TestServer,
    WAIT_TIMEOUT,
};
use neptune_websock::{
    ClientError, Dispatcher, Envelope, FrameKind, WsConfig, WsHeader, WsMessage,
};
use tokio_tungstenite::tungstenite::Message;

async fn next_read(recorder: &mut integration_tests::ClientRecorder) -> Envelope {
    tokio::time::timeout(WAIT_TIMEOUT, recorder.reads.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("client stopped reading")
}

/// Next data or close frame, skipping pings
async fn next_frame(socket: &mut integration_tests::RawSocket) -> Option<Message> {
    loop {
        let message = tokio::time::timeout(WAIT_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame")?;
        match message {
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(message) => return Some(message),
            Err(_) => return None,
        }
    }
}

// ============================================================================
// HTTP Surface
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_extra_routes_and_static_files() {
    let dir = std::env::temp_dir().join(format!("neptune-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("hello.txt"), "static hello").unwrap();

    let static_dir = dir.clone();
    let server = TestServer::start_with(echo_dispatcher(), WsConfig::default(), move |server| {
        server
            .with_routes(Router::new().route("/version", get(|| async { "1.0" })))
            .with_static_files("/static", static_dir)
    })
    .await
    .unwrap();

    let response = server.get("/version").await.unwrap();
    assert_eq!(response.text().await.unwrap(), "1.0");

    let response = server.get("/static/hello.txt").await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "static hello");

    let response = server.get("/static/missing.txt").await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await.unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
}

// ============================================================================
// Echo Round Trips
// ============================================================================

#[tokio::test]
async fn test_text_round_trip() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();

    client.connect(&server.address(), "/ws").await.unwrap();
    assert!(client.is_connected());
    assert_eq!(recorder.connects(), 1);

    client.send_text("ping").await;

    let echo = next_read(&mut recorder).await;
    assert_eq!(echo.kind(), FrameKind::Text);
    assert_eq!(echo.as_text(), Some("ping"));
    assert_eq!(recorder.writes(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_text_is_flattened_before_dispatch() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();

    client.send_text("  first line\nsecond line\n").await;

    let echo = next_read(&mut recorder).await;
    assert_eq!(echo.as_text(), Some("first line second line"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_binary_round_trip() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();

    client.send(FrameKind::Binary, vec![0u8, 159, 146, 150]).await;

    let echo = next_read(&mut recorder).await;
    assert_eq!(echo.kind(), FrameKind::Binary);
    assert_eq!(echo.payload().as_ref(), &[0u8, 159, 146, 150]);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();

    for i in 0..50 {
        client.send_text(format!("message {i}")).await;
    }

    for i in 0..50 {
        let echo = next_read(&mut recorder).await;
        assert_eq!(echo.as_text(), Some(format!("message {i}").as_str()));
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_tls_round_trip() {
    let server = TestServer::start_tls(echo_dispatcher()).await.unwrap();
    let mut socket = server.connect_tls().await.unwrap();

    socket.send(Message::text("over tls")).await.unwrap();
    let echo = tokio::time::timeout(WAIT_TIMEOUT, socket.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed")
        .unwrap();
    assert_eq!(echo, Message::text("over tls"));

    // The peer address reaches the session through the TLS listener
    server.wait_for_sessions(1).await.unwrap();
    let sessions = server.hub().sessions().await;
    let peer_addr = sessions[0].peer_addr().expect("peer address recorded");
    assert!(peer_addr.ip().is_loopback());

    server.stop().await.unwrap();
}

// ============================================================================
// Structured Protocols
// ============================================================================

#[tokio::test]
async fn test_protocol_dispatch() {
    let server = TestServer::start(chat_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();

    let message = WsMessage::new(
        WsHeader::new("chat", "1", "alice"),
        ChatMessage {
            text: "hello".to_string(),
        },
    );
    client.send_object(&message).await;

    let reply = next_read(&mut recorder).await;
    assert_eq!(reply.as_text(), Some("alice: HELLO"));

    // Plain text still reaches the text handler
    client.send_text("plain").await;
    assert_eq!(next_read(&mut recorder).await.as_text(), Some("plain"));

    server.stop().await.unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_server_callbacks_fire_once_per_session() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();

    let mut first = server.connect_raw().await.unwrap();
    let mut second = server.connect_raw().await.unwrap();
    server.wait_for_sessions(2).await.unwrap();
    assert_eq!(server.events.connected(), 2);

    first.close(None).await.unwrap();
    second.close(None).await.unwrap();
    server.wait_for_sessions(0).await.unwrap();

    let events = server.events.clone();
    wait_until(move || {
        let events = events.clone();
        async move { events.disconnected() == 2 }
    })
    .await
    .unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_client_disconnect_is_clean() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, mut recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();

    client.send_text("before").await;
    assert_eq!(next_read(&mut recorder).await.as_text(), Some("before"));

    client.disconnect().await.unwrap();
    tokio::time::timeout(WAIT_TIMEOUT, client.closed()).await.unwrap();

    assert!(!client.is_connected());
    assert_eq!(recorder.disconnects(), 1);

    // Nothing is written after the close handshake
    let writes = recorder.writes();
    client.send_text("after").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.writes(), writes);
    assert_eq!(recorder.disconnects(), 1);

    server.wait_for_sessions(0).await.unwrap();
    assert!(recorder.errors.lock().unwrap().is_empty());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_server_stop_closes_clients() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();

    let mut sockets = Vec::new();
    for _ in 0..3 {
        sockets.push(server.connect_raw().await.unwrap());
    }
    server.wait_for_sessions(3).await.unwrap();

    let (mut client, recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();
    server.wait_for_sessions(4).await.unwrap();

    let events = server.events.clone();
    tokio::time::timeout(WAIT_TIMEOUT, server.stop())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(events.disconnected(), 4);

    for socket in &mut sockets {
        assert!(matches!(next_frame(socket).await, Some(Message::Close(_)) | None));
    }

    tokio::time::timeout(WAIT_TIMEOUT, client.closed()).await.unwrap();
    assert_eq!(recorder.disconnects(), 1);
}

#[tokio::test]
async fn test_silent_peer_is_dropped() {
    let ws_config = WsConfig::default().with_pong_wait(Duration::from_millis(300));
    let server = TestServer::start_with(echo_dispatcher(), ws_config, |server| server)
        .await
        .unwrap();

    // A socket that is never read never answers pings
    let _silent = server.connect_raw().await.unwrap();
    server.wait_for_sessions(1).await.unwrap();

    server.wait_for_sessions(0).await.unwrap();
    assert_eq!(server.events.disconnected(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_responsive_peer_survives_pings() {
    let ws_config = WsConfig::default().with_pong_wait(Duration::from_secs(1));
    let server = TestServer::start_with(echo_dispatcher(), ws_config, |server| server)
        .await
        .unwrap();
    let (mut client, _recorder) = recording_client();
    client.connect(&server.address(), "/ws").await.unwrap();
    server.wait_for_sessions(1).await.unwrap();

    // The client's reader answers every ping with a pong
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert!(client.is_connected());
    assert_eq!(server.hub().session_count(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_oversize_frame_ends_session() {
    let ws_config = WsConfig::default().with_max_message_size(1024);
    let server = TestServer::start_with(echo_dispatcher(), ws_config, |server| server)
        .await
        .unwrap();
    let mut socket = server.connect_raw().await.unwrap();
    server.wait_for_sessions(1).await.unwrap();

    socket.send(Message::text("x".repeat(4096))).await.unwrap();

    server.wait_for_sessions(0).await.unwrap();
    assert!(!matches!(next_frame(&mut socket).await, Some(Message::Text(_))));

    server.stop().await.unwrap();
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let server = TestServer::start(Dispatcher::new()).await.unwrap();

    let mut sockets = Vec::new();
    for _ in 0..3 {
        sockets.push(server.connect_raw().await.unwrap());
    }
    server.wait_for_sessions(3).await.unwrap();

    server
        .server()
        .broadcast(Envelope::text("announcement"))
        .await
        .unwrap();

    for socket in &mut sockets {
        match next_frame(socket).await {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), "announcement"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    server.stop().await.unwrap();
}

// ============================================================================
// Client Errors
// ============================================================================

#[tokio::test]
async fn test_connect_to_stopped_server_reports_error() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let address = server.address();
    server.stop().await.unwrap();

    let (mut client, recorder) = recording_client();
    let result = client.connect(&address, "/ws").await;

    assert!(matches!(result, Err(ClientError::Connect { .. })));
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert_eq!(recorder.connects(), 0);
}

#[tokio::test]
async fn test_second_connect_is_rejected() {
    let server = TestServer::start(echo_dispatcher()).await.unwrap();
    let (mut client, _recorder) = recording_client();

    client.connect(&server.address(), "/ws").await.unwrap();
    let result = client.connect(&server.address(), "/ws").await;
    assert!(matches!(result, Err(ClientError::AlreadyConnected)));

    server.stop().await.unwrap();
}
