//! Message framer: the WebSocket transport to one target, and the
//! JSON-RPC 2.0 encode/decode boundary. Built on `tokio-tungstenite`, the
//! same crate and `connect_async`/`split()` idiom any outbound WS client in
//! this codebase uses.

use debug_protocol::{decode_inbound, encode_outbound, FrameDecodeError, InboundFrame, OutboundRequest};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("transport closed")]
    Closed,
}

/// The write half of the session's WebSocket, shared by every command call
/// so there is exactly one writer path per session.
pub struct FramerWriter {
    sink: Mutex<SplitSink<WsStream, Message>>,
}

impl FramerWriter {
    pub async fn send(&self, req: &OutboundRequest) -> Result<(), FramerError> {
        let text = encode_outbound(req).expect("OutboundRequest always serializes");
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into())).await.map_err(FramerError::Handshake)
    }

    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let _ = sink.close().await;
    }
}

/// The read half, owned exclusively by the session's reader task.
pub struct FramerReader {
    stream: SplitStream<WsStream>,
}

/// One decode step on the read half: a frame, a malformed frame (logged and
/// dropped by the caller), or transport closure.
pub enum FramerEvent {
    Frame(InboundFrame),
    Malformed(FrameDecodeError),
    Closed,
}

impl FramerReader {
    /// Read and decode the next frame. Never returns `None`; closure is a
    /// variant of [`FramerEvent`] so the caller can run teardown inline.
    pub async fn next_event(&mut self) -> FramerEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match decode_inbound(&text) {
                    Ok(frame) => return FramerEvent::Frame(frame),
                    Err(e) => return FramerEvent::Malformed(e),
                },
                Some(Ok(Message::Close(_))) | None => return FramerEvent::Closed,
                Some(Ok(_)) => continue, // ignore ping/pong/binary frames
                Some(Err(_)) => return FramerEvent::Closed,
            }
        }
    }
}

/// Open a WebSocket to `url` and split it into a shared writer and an
/// exclusively-owned reader.
pub async fn connect(url: &Url) -> Result<(FramerWriter, FramerReader), FramerError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (sink, stream) = stream.split();
    Ok((
        FramerWriter { sink: Mutex::new(sink) },
        FramerReader { stream },
    ))
}
