//! Mock realtime WebSocket server for integration tests.
//!
//! Accepts connections serially, one script per expected connection. For
//! each connection the mock waits for the client's `session.update`
//! handshake, replies with the scripted server events, then keeps reading
//! (counting audio frames) until the client goes away.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// What the mock observed over the life of one connection.
#[derive(Debug)]
pub struct MockReport {
    /// The client's `session.update` payload
    pub session_update: Value,
    /// Number of `input_audio_buffer.append` frames received
    pub audio_frames: usize,
}

/// Spawn a mock for a single connection.
pub async fn spawn_mock(script: Vec<Value>) -> (String, JoinHandle<MockReport>) {
    let (endpoint, handle) = spawn_mock_serial(vec![script], false).await;
    let handle = tokio::spawn(async move {
        handle.await.unwrap().into_iter().next().unwrap()
    });
    (endpoint, handle)
}

/// Spawn a mock that closes the connection from the server side after
/// sending its script.
pub async fn spawn_closing_mock(script: Vec<Value>) -> (String, JoinHandle<MockReport>) {
    let (endpoint, handle) = spawn_mock_serial(vec![script], true).await;
    let handle = tokio::spawn(async move {
        handle.await.unwrap().into_iter().next().unwrap()
    });
    (endpoint, handle)
}

/// Spawn a mock that serves one connection per script, in order.
pub async fn spawn_mock_serial(
    scripts: Vec<Vec<Value>>,
    close_after_script: bool,
) -> (String, JoinHandle<Vec<MockReport>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut reports = Vec::new();
        for script in scripts {
            let (stream, _) = listener.accept().await.unwrap();
            reports.push(handle_connection(stream, script, close_after_script).await);
        }
        reports
    });

    (format!("ws://{addr}"), handle)
}

async fn handle_connection(
    stream: TcpStream,
    script: Vec<Value>,
    close_after_script: bool,
) -> MockReport {
    let ws = accept_async(stream).await.unwrap();
    let (mut write, mut read) = ws.split();

    let mut report = MockReport {
        session_update: Value::Null,
        audio_frames: 0,
    };
    let mut pending_script = Some(script);

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                match value.get("type").and_then(|t| t.as_str()) {
                    Some("session.update") => {
                        report.session_update = value;
                        if let Some(events) = pending_script.take() {
                            for event in events {
                                write
                                    .send(Message::Text(event.to_string().into()))
                                    .await
                                    .unwrap();
                            }
                            if close_after_script {
                                write.send(Message::Close(None)).await.ok();
                                break;
                            }
                        }
                    }
                    Some("input_audio_buffer.append") => report.audio_frames += 1,
                    _ => {}
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await.ok();
            }
            Err(_) => break,
            _ => {}
        }
    }

    report
}
