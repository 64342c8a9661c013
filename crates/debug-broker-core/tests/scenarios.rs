//! End-to-end scenarios from the command surface down to a mock inspector
//! backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use debug_broker_core::admission::AdmissionPolicy;
use debug_broker_core::commands;
use debug_broker_core::error::BrokerError;
use debug_broker_core::session::SessionState;
use debug_broker_core::source_map::{DefaultSourceFetcher, SourceFetcher};
use debug_broker_core::types::GeneratedLine0;
use debug_broker_core::SessionRegistry;
use debug_broker_testkit::MockInspectorServer;
use serde_json::json;
use url::Url;

fn default_registry() -> Arc<SessionRegistry> {
    SessionRegistry::new(
        AdmissionPolicy::default(),
        8,
        Duration::from_secs(5),
        Arc::new(DefaultSourceFetcher::default()),
    )
}

/// Connect and list.
#[tokio::test]
async fn connect_and_list() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });

    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let _target = target_handle.await.unwrap();

    assert_eq!(summary.state, SessionState::Connected);
    let sessions = commands::list_sessions(&registry).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, summary.id);
    assert_eq!(sessions[0].state, SessionState::Connected);
}

/// Breakpoint lifecycle — set, resolve via event, remove.
#[tokio::test]
async fn breakpoint_lifecycle() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let mut target = target_handle.await.unwrap();

    let session_id = summary.id;
    let set_bp = tokio::spawn({
        let registry = registry.clone();
        async move {
            commands::set_breakpoint(&registry, session_id, "file:///a.js".to_owned(), GeneratedLine0(10), None, None)
                .await
        }
    });

    let call = target.expect_call("Debugger.setBreakpointByUrl").await;
    assert_eq!(call.params["url"], "file:///a.js");
    assert_eq!(call.params["lineNumber"], 10);
    target
        .respond_ok(
            call.id,
            json!({
                "breakpointId": "bp-1",
                "locations": [{"scriptId": "s-1", "lineNumber": 10, "columnNumber": 0}],
            }),
        )
        .await;

    let (bp_id, resolved) = set_bp.await.unwrap().unwrap();
    assert_eq!(bp_id.0, "bp-1");
    assert_eq!(resolved.len(), 1);

    target
        .send_event(
            "Debugger.breakpointResolved",
            json!({
                "breakpointId": "bp-1",
                "location": {"scriptId": "s-1", "lineNumber": 10, "columnNumber": 4},
            }),
        )
        .await;

    // Give the reader task a moment to process the event before polling state.
    let mut breakpoints = commands::list_breakpoints(&registry, session_id).await.unwrap();
    for _ in 0..20 {
        if breakpoints[0].resolved.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        breakpoints = commands::list_breakpoints(&registry, session_id).await.unwrap();
    }
    assert_eq!(breakpoints.len(), 1);
    assert_eq!(breakpoints[0].resolved.len(), 2);

    let remove = tokio::spawn({
        let registry = registry.clone();
        async move { commands::remove_breakpoint(&registry, session_id, &bp_id).await }
    });
    let call = target.expect_call("Debugger.removeBreakpoint").await;
    assert_eq!(call.params["breakpointId"], "bp-1");
    target.respond_ok(call.id, json!({})).await;
    remove.await.unwrap().unwrap();

    let breakpoints = commands::list_breakpoints(&registry, session_id).await.unwrap();
    assert!(breakpoints.is_empty());
}

/// A scripted fetcher serving one hand-built v3 source map so the paused
/// call-stack test below doesn't touch the filesystem or network.
struct ScriptedFetcher {
    body: Vec<u8>,
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &Url) -> Option<Vec<u8>> {
        Some(self.body.clone())
    }
}

/// Maps generated (0-based line 10, col 0) -> original (src/a.ts, 0-based
/// line 5, col 2, name "f"). See `debug_broker_core::source_map`'s module
/// doc comment for the 0-based/1-based convention this engine applies.
fn scripted_source_map_json() -> Vec<u8> {
    let doc = json!({
        "version": 3,
        "sources": ["src/a.ts"],
        "sourcesContent": ["// contents"],
        "names": ["f"],
        "mappings": ";;;;;;;;;;AAKEA",
    });
    serde_json::to_vec(&doc).unwrap()
}

/// Paused call stack projects through a loaded source map.
#[tokio::test]
async fn paused_call_stack_with_source_map() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let fetcher = Arc::new(ScriptedFetcher { body: scripted_source_map_json() });
    let registry = SessionRegistry::new(AdmissionPolicy::default(), 8, Duration::from_secs(5), fetcher);

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let mut target = target_handle.await.unwrap();
    let session_id = summary.id;

    target
        .send_event(
            "Debugger.scriptParsed",
            json!({
                "scriptId": "s-1",
                "url": "file:///d/b.js",
                "sourceMapURL": "b.js.map",
                "startLine": 0, "startColumn": 0, "endLine": 20, "endColumn": 0,
            }),
        )
        .await;

    // Let the spawned source-map load complete before pausing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    target
        .send_event(
            "Debugger.paused",
            json!({
                "reason": "other",
                "hitBreakpoints": ["bp-1"],
                "callFrames": [{
                    "callFrameId": "frame-1",
                    "functionName": "f",
                    "location": {"scriptId": "s-1", "lineNumber": 10, "columnNumber": 0},
                    "scopeChain": [{"type": "local", "object": {"objectId": "scope-obj-1"}}],
                    "this": {"type": "object", "objectId": "this-obj-1"},
                }],
            }),
        )
        .await;

    let mut result = commands::get_call_stack(&registry, session_id, true).await;
    for _ in 0..20 {
        if result.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        result = commands::get_call_stack(&registry, session_id, true).await;
    }
    let result = result.unwrap();
    assert_eq!(result.frames.len(), 1);
    assert_eq!(result.hit_breakpoints, vec!["bp-1".to_owned()]);
    let frame = &result.frames[0];
    assert_eq!(frame.line_number, 10);
    assert_eq!(frame.this.object_id.as_deref(), Some("this-obj-1"));
    let original = frame.original.as_ref().expect("expected source-map projection");
    assert_eq!(original.source, "src/a.ts");
    assert_eq!(original.line, 6);
    assert_eq!(original.column, 2);
}

/// step_over acks, then a later `paused` event carries the notification;
/// state lands back on PAUSED.
#[tokio::test]
async fn step_then_pause() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let mut target = target_handle.await.unwrap();
    let session_id = summary.id;

    // Get into PAUSED first.
    target
        .send_event(
            "Debugger.paused",
            json!({"reason": "breakpoint", "callFrames": []}),
        )
        .await;
    wait_for_state(&registry, session_id, SessionState::Paused).await;

    let session = registry.get(session_id).await.unwrap();
    let mut notifications = session.subscribe();

    let step = tokio::spawn({
        let registry = registry.clone();
        async move { commands::step_over(&registry, session_id).await }
    });
    let call = target.expect_call("Debugger.stepOver").await;
    target.respond_ok(call.id, json!({})).await;
    step.await.unwrap().unwrap();

    target
        .send_event("Debugger.paused", json!({"reason": "step", "callFrames": []}))
        .await;

    let notification = notifications.recv().await.unwrap();
    match notification {
        debug_broker_core::session::SessionNotification::Paused { reason } => {
            assert_eq!(reason, "step");
        }
        other => panic!("expected Paused notification, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Paused);
}

/// Evaluating on a frame surfaces exception details rather than failing the
/// call outright.
#[tokio::test]
async fn evaluate_with_exception_detail() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let mut target = target_handle.await.unwrap();
    let session_id = summary.id;

    target
        .send_event(
            "Debugger.paused",
            json!({
                "reason": "other",
                "callFrames": [{
                    "callFrameId": "frame-1",
                    "functionName": "f",
                    "location": {"scriptId": "s-1", "lineNumber": 0, "columnNumber": 0},
                    "scopeChain": [],
                    "this": {"type": "undefined"},
                }],
            }),
        )
        .await;
    wait_for_state(&registry, session_id, SessionState::Paused).await;

    let evaluate = tokio::spawn({
        let registry = registry.clone();
        async move {
            commands::evaluate_expression(&registry, session_id, "boom".to_owned(), Some("frame-1".to_owned()), None)
                .await
        }
    });
    let call = target.expect_call("Debugger.evaluateOnCallFrame").await;
    assert_eq!(call.params["expression"], "boom");
    target
        .respond_ok(
            call.id,
            json!({
                "result": {"type": "undefined"},
                "exceptionDetails": {"text": "ReferenceError", "lineNumber": 1, "columnNumber": 0},
            }),
        )
        .await;

    let result = evaluate.await.unwrap().unwrap();
    let exception = result.exception_details.expect("expected exception details");
    assert_eq!(exception.text, "ReferenceError");
}

/// Transport loss cancels the outstanding command and the session is
/// eventually reaped out of the registry.
#[tokio::test]
async fn transport_loss_cancels_outstanding() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let mut target = target_handle.await.unwrap();
    let session_id = summary.id;

    let resume = tokio::spawn({
        let registry = registry.clone();
        async move { commands::resume_execution(&registry, session_id).await }
    });
    // Let the call reach the pending table before we cut the connection.
    target.expect_call("Runtime.runIfWaitingForDebugger").await;
    target.close().await;

    let err = resume.await.unwrap().unwrap_err();
    assert!(matches!(err, BrokerError::ConnectionFailed(_)));

    let reaper = registry.clone().spawn_reaper(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(100)).await;
    reaper.abort();

    let err = commands::list_breakpoints(&registry, session_id).await.unwrap_err();
    assert!(matches!(err, BrokerError::SessionNotFound(_)));
}

/// Disconnecting an already-disconnected session id is rejected rather than
/// silently repeated.
#[tokio::test]
async fn disconnect_debugger_is_not_idempotent() {
    let mut server = MockInspectorServer::start().await;
    let url = server.url();
    let registry = default_registry();

    let target_handle = tokio::spawn(async move {
        let mut target = server.accept().await;
        target.ack_handshake().await;
        target
    });
    let summary = commands::connect_debugger(&registry, &url, None).await.unwrap();
    let _target = target_handle.await.unwrap();
    let session_id = summary.id;

    commands::disconnect_debugger(&registry, session_id).await.unwrap();

    let err = commands::disconnect_debugger(&registry, session_id).await.unwrap_err();
    assert!(matches!(err, BrokerError::SessionNotFound(_)));
}

async fn wait_for_state(registry: &SessionRegistry, session_id: debug_broker_core::types::SessionId, state: SessionState) {
    let session = registry.get(session_id).await.unwrap();
    for _ in 0..50 {
        if session.state().await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {state:?}");
}
