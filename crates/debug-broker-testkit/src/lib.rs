//! Mock JS-runtime inspector WebSocket backend for integration tests.
//!
//! Plays the role of the "target": accepts a WebSocket connection, lets the
//! test script exact responses to individual `Debugger.*`/`Runtime.*` calls,
//! and push `scriptParsed`/`paused`/`resumed`/`breakpointResolved`
//! notifications on demand. One type covers both the accept loop and the
//! per-connection driver, since tests here drive a single target connection
//! turn-by-turn rather than serving many clients at once.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type WsStream = WebSocketStream<TcpStream>;

/// One call the broker sent to the mock target: `{"id","method","params"}`.
#[derive(Debug, Clone)]
pub struct IncomingCall {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// A mock inspector server. Binds to a random port; each accepted connection
/// is handed to the test as a [`MockTarget`] it drives explicitly.
pub struct MockInspectorServer {
    addr: SocketAddr,
    incoming: mpsc::Receiver<MockTarget>,
    _accept_task: tokio::task::JoinHandle<()>,
}

impl MockInspectorServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock inspector listener");
        let addr = listener.local_addr().expect("local_addr");
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _peer)) => {
                        let ws = match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => ws,
                            Err(_) => continue,
                        };
                        let (sink, stream) = ws.split();
                        let target = MockTarget { sink, stream };
                        if tx.send(target).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        MockInspectorServer { addr, incoming: rx, _accept_task: task }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("ws://{}/target", self.addr)
    }

    /// Wait for the next client connection (one per `connect_debugger` call).
    pub async fn accept(&mut self) -> MockTarget {
        self.incoming.recv().await.expect("mock inspector server accept channel closed")
    }
}

/// One connected "target" conversation, driven explicitly by the test: read
/// the next call, respond to it, or push a notification.
pub struct MockTarget {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl MockTarget {
    /// Read the next frame and decode it as an outbound call from the
    /// broker. Panics on a notification-shaped or malformed frame, since a
    /// mock target never receives unsolicited ones.
    pub async fn recv_call(&mut self) -> IncomingCall {
        let text = self.recv_text().await;
        let value: Value = serde_json::from_str(&text).expect("mock target received non-JSON frame");
        let id = value.get("id").and_then(Value::as_u64).expect("call frame missing numeric id");
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .expect("call frame missing method")
            .to_owned();
        let params = value.get("params").cloned().unwrap_or(Value::Null);
        IncomingCall { id, method, params }
    }

    /// Convenience for the common case: read the next call and assert it is
    /// for `expected_method`.
    pub async fn expect_call(&mut self, expected_method: &str) -> IncomingCall {
        let call = self.recv_call().await;
        assert_eq!(call.method, expected_method, "unexpected call from broker");
        call
    }

    /// Respond `{"id":id,"result":result}`.
    pub async fn respond_ok(&mut self, id: u64, result: Value) {
        self.send(&json!({ "id": id, "result": result })).await;
    }

    /// Respond `{"id":id,"error":{"code":code,"message":message}}`.
    pub async fn respond_error(&mut self, id: u64, code: i64, message: impl Into<String>) {
        self.send(&json!({ "id": id, "error": { "code": code, "message": message.into() } }))
            .await;
    }

    /// Acknowledge the two-step handshake (`Debugger.enable` then
    /// `Runtime.enable`) with empty results, the common case for tests that
    /// don't care about handshake failure paths.
    pub async fn ack_handshake(&mut self) {
        let enable = self.expect_call("Debugger.enable").await;
        self.respond_ok(enable.id, json!({})).await;
        let runtime_enable = self.expect_call("Runtime.enable").await;
        self.respond_ok(runtime_enable.id, json!({})).await;
    }

    /// Push a method notification: `{"method":method,"params":params}`.
    pub async fn send_event(&mut self, method: &str, params: Value) {
        self.send(&json!({ "method": method, "params": params })).await;
    }

    /// Close the connection, simulating transport loss.
    pub async fn close(&mut self) {
        let _ = self.sink.close().await;
    }

    async fn send(&mut self, value: &Value) {
        let text = serde_json::to_string(value).expect("mock frame always serializes");
        self.sink.send(Message::Text(text.into())).await.expect("mock target send failed");
    }

    async fn recv_text(&mut self) -> String {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => panic!("mock target connection closed unexpectedly"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("mock target read error: {e}"),
            }
        }
    }
}
