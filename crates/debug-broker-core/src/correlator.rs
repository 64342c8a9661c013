//! Command correlator: monotonic id allocation, the outstanding-request
//! table, per-command timeout, and fan-in of responses/errors.
//!
//! The pending-request table is an `RwLock<HashMap<u64, PendingRequest>>`
//! with `oneshot` completion sinks, the same request/reply shape as a
//! `ConfigGet { reply: oneshot::Sender<..> }`-style command channel. Per-
//! command timeout wraps the oneshot receive in `tokio::time::timeout`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use debug_protocol::{OutboundRequest, RpcError};
use serde_json::Value;
use tokio::sync::{oneshot, RwLock};

use crate::error::BrokerError;
use crate::framer::FramerWriter;

struct PendingRequest {
    sink: oneshot::Sender<Result<Value, BrokerError>>,
}

/// Allocates ids starting at 1 and matches responses back to the caller that
/// sent them. Contract: a given id is used at most once, and its sink is
/// signaled exactly once — by a response, a timeout, or transport closure,
/// whichever happens first.
pub struct Correlator {
    next_id: AtomicU64,
    pending: RwLock<HashMap<u64, PendingRequest>>,
    writer: Arc<FramerWriter>,
    default_timeout: Duration,
}

impl Correlator {
    pub fn new(writer: Arc<FramerWriter>, default_timeout: Duration) -> Self {
        Correlator {
            next_id: AtomicU64::new(1),
            pending: RwLock::new(HashMap::new()),
            writer,
            default_timeout,
        }
    }

    /// Send `method`/`params` to the target and await its response, subject
    /// to the correlator's default per-command timeout. The correlator
    /// performs no retry.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, BrokerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(id, PendingRequest { sink: tx });

        let request = OutboundRequest {
            id,
            method: method.to_owned(),
            params,
        };
        if let Err(e) = self.writer.send(&request).await {
            self.pending.write().await.remove(&id);
            return Err(BrokerError::ConnectionFailed(e.to_string()));
        }

        match tokio::time::timeout(self.default_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_canceled)) => Err(BrokerError::ConnectionFailed(
                "correlator dropped before completion".to_owned(),
            )),
            Err(_elapsed) => {
                self.pending.write().await.remove(&id);
                Err(BrokerError::Timeout)
            }
        }
    }

    /// Complete a pending entry from a target response. A response for an
    /// id with no pending entry (already timed out, or spurious) is
    /// silently discarded.
    pub async fn complete(&self, id: u64, outcome: Result<Value, RpcError>) {
        let pending = self.pending.write().await.remove(&id);
        if let Some(pending) = pending {
            let mapped = outcome.map_err(|e| BrokerError::Protocol(format!("{} ({})", e.message, e.code)));
            let _ = pending.sink.send(mapped);
        }
    }

    /// Fail every outstanding entry with a connection-lost error. Called
    /// once by the reader task on transport closure.
    pub async fn fail_all(&self) {
        let mut pending = self.pending.write().await;
        for (_, entry) in pending.drain() {
            let _ = entry
                .sink
                .send(Err(BrokerError::ConnectionFailed("transport closed".to_owned())));
        }
    }
}

// Wider scenarios (timeout, transport-loss fan-out across a live session)
// are covered in `debug-broker-core/tests` against `debug-broker-testkit`'s
// mock inspector backend. The tests below drive the real `Correlator`
// directly against that same mock target.
#[cfg(test)]
mod tests {
    use super::*;
    use debug_broker_testkit::MockInspectorServer;
    use url::Url;

    #[tokio::test]
    async fn allocates_ids_monotonically_and_completes_each_call_exactly_once() {
        let mut server = MockInspectorServer::start().await;
        let url = Url::parse(&server.url()).unwrap();

        let accept = tokio::spawn(async move {
            let target = server.accept().await;
            (server, target)
        });

        let (writer, mut reader) = crate::framer::connect(&url).await.expect("mock connect");
        let (server, mut target) = accept.await.unwrap();
        drop(server);

        let writer = Arc::new(writer);
        let correlator = Arc::new(Correlator::new(writer, Duration::from_secs(5)));

        let reader_correlator = correlator.clone();
        let reader_task = tokio::spawn(async move {
            loop {
                match reader.next_event().await {
                    crate::framer::FramerEvent::Frame(debug_protocol::InboundFrame::Response { id, outcome }) => {
                        reader_correlator.complete(id, outcome).await;
                    }
                    crate::framer::FramerEvent::Frame(debug_protocol::InboundFrame::Notification { .. }) => {}
                    crate::framer::FramerEvent::Malformed(_) => {}
                    crate::framer::FramerEvent::Closed => break,
                }
            }
        });

        let first = tokio::spawn({
            let correlator = correlator.clone();
            async move { correlator.call("Debugger.enable", serde_json::json!({})).await }
        });
        let call_one = target.expect_call("Debugger.enable").await;
        assert_eq!(call_one.id, 1);
        target.respond_ok(call_one.id, serde_json::json!({})).await;
        first.await.unwrap().expect("first call completes");

        let second = tokio::spawn({
            let correlator = correlator.clone();
            async move { correlator.call("Runtime.enable", serde_json::json!({})).await }
        });
        let call_two = target.expect_call("Runtime.enable").await;
        assert_eq!(call_two.id, 2);
        assert!(call_two.id > call_one.id, "ids must be allocated monotonically");
        target.respond_ok(call_two.id, serde_json::json!({})).await;
        second.await.unwrap().expect("second call completes");

        // A late/duplicate response for an id already completed has no
        // pending entry left to signal, so this must not panic.
        correlator.complete(call_one.id, Ok(serde_json::json!({}))).await;

        target.close().await;
        reader_task.await.unwrap();
    }
}
