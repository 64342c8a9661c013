//! Session: the per-target aggregate binding one external id to one live
//! WebSocket conversation. Owns the correlator, the shared writer, the
//! breakpoint/script tables, the paused snapshot, and the source-map
//! engine; enforces the state machine and the operation gating.
//!
//! One reader task per session consumes the WebSocket (mirroring the
//! per-connection task shape used for other WebSocket forwarding in this
//! codebase); the write half is shared behind `Arc<FramerWriter>` so every
//! command call and the handshake itself go through the same writer path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use debug_protocol::cdp::{
    self, method, CallArgument, EvaluateOnCallFrameParams, EvaluateResult, GetPropertiesParams,
    GetPropertiesResult, GetScriptSourceParams, PauseOnExceptionsState, PausedEvent, RemoteObject,
    RemoveBreakpointParams, RuntimeEvaluateParams, ScriptParsedEvent, SetBreakpointByUrlParams,
    SetBreakpointByUrlResult, SetPauseOnExceptionsParams, SetVariableValueParams,
};
use debug_protocol::InboundFrame;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::correlator::Correlator;
use crate::error::BrokerError;
use crate::events::{self, SessionEvent};
use crate::framer::{self, FramerEvent, FramerWriter};
use crate::model::{
    AsyncCallFrameView, AsyncStackTraceView, EnrichedCallFrame, EvaluateExpressionResult,
    ExceptionDetailView, GetCallStackResult, GetOriginalLocationResult, GetScriptSourceResult,
    NamedVariable, OriginalLocationView, RemoteValueView, ResolvedLocationView, ScopeView,
    SessionDetails, SessionSummary,
};
use crate::source_map::SourceFetcher;
use crate::source_map::SourceMapEngine;
use crate::types::{BreakpointId, GeneratedLine0, OriginalLine1, ScriptId, SessionId};

/// The session state machine. `DISCONNECTED` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    Connecting,
    Connected,
    Running,
    Paused,
    Disconnected,
}

/// One breakpoint record: requested location plus resolved locations as
/// they arrive via `breakpointResolved` events.
#[derive(Debug, Clone)]
pub struct BreakpointRecord {
    pub id: BreakpointId,
    pub url: String,
    pub line: u32,
    pub column: Option<u32>,
    pub condition: Option<String>,
    pub resolved: Vec<ResolvedLocation>,
}

#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub script_id: ScriptId,
    pub line: u32,
    pub column: Option<u32>,
}

/// One script record, keyed by scriptId; never removed except on session
/// teardown. Every record here came from a received `scriptParsed` event.
#[derive(Debug, Clone)]
pub struct ScriptRecord {
    pub id: ScriptId,
    pub url: String,
    pub source_map_url: Option<String>,
    pub is_module: bool,
}

#[derive(Default)]
struct SessionInner {
    breakpoints: HashMap<BreakpointId, BreakpointRecord>,
    scripts: HashMap<ScriptId, ScriptRecord>,
    paused: Option<PausedEvent>,
}

/// Event fan-out to the controlling client: the outer layer subscribes and
/// forwards.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    Paused { reason: String },
    Resumed,
    ScriptParsed { script_id: ScriptId },
    BreakpointResolved { breakpoint_id: BreakpointId },
    Disconnected { cause: String },
}

pub struct Session {
    pub id: SessionId,
    pub name: Option<String>,
    pub target_url: Url,
    pub created_at: SystemTime,
    state: RwLock<SessionState>,
    correlator: Correlator,
    writer: Arc<FramerWriter>,
    inner: RwLock<SessionInner>,
    source_maps: Arc<SourceMapEngine>,
    notify_tx: broadcast::Sender<SessionNotification>,
    reader_task: RwLock<Option<JoinHandle<()>>>,
}

const NOTIFY_CHANNEL_CAPACITY: usize = 256;

impl Session {
    /// Open the WebSocket, spawn the reader task, and run the handshake
    /// (`Debugger.enable` then `Runtime.enable`, in order). Failure of
    /// either aborts creation; no session is installed.
    pub async fn connect(
        id: SessionId,
        name: Option<String>,
        url: Url,
        fetcher: Arc<dyn SourceFetcher>,
        command_timeout: Duration,
    ) -> Result<Arc<Session>, BrokerError> {
        let (writer, reader) = framer::connect(&url)
            .await
            .map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;
        let writer = Arc::new(writer);
        let correlator = Correlator::new(writer.clone(), command_timeout);
        let (notify_tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);

        let session = Arc::new(Session {
            id,
            name,
            target_url: url,
            created_at: SystemTime::now(),
            state: RwLock::new(SessionState::Connecting),
            correlator,
            writer,
            inner: RwLock::new(SessionInner::default()),
            source_maps: Arc::new(SourceMapEngine::new(fetcher)),
            notify_tx,
            reader_task: RwLock::new(None),
        });

        let reader_session = session.clone();
        let handle = tokio::spawn(async move { reader_session.run_reader(reader).await });
        *session.reader_task.write().await = Some(handle);

        if let Err(e) = session.handshake().await {
            session.teardown("handshake failed").await;
            return Err(e);
        }

        *session.state.write().await = SessionState::Connected;
        info!(session = %session.id, "session connected");
        Ok(session)
    }

    async fn handshake(&self) -> Result<(), BrokerError> {
        self.correlator.call(method::DEBUGGER_ENABLE, json!({})).await?;
        self.correlator.call(method::RUNTIME_ENABLE, json!({})).await?;
        Ok(())
    }

    async fn run_reader(self: Arc<Self>, mut reader: framer::FramerReader) {
        loop {
            match reader.next_event().await {
                FramerEvent::Frame(InboundFrame::Response { id, outcome }) => {
                    self.correlator.complete(id, outcome).await;
                }
                FramerEvent::Frame(InboundFrame::Notification { method, params }) => {
                    self.handle_notification(&method, params).await;
                }
                FramerEvent::Malformed(e) => {
                    warn!(session = %self.id, error = %e, "dropping malformed inbound frame");
                }
                FramerEvent::Closed => {
                    self.handle_closed().await;
                    break;
                }
            }
        }
    }

    async fn handle_notification(&self, method: &str, params: Value) {
        match events::classify(method, params) {
            SessionEvent::Paused(evt) => {
                let reason = evt.reason.clone();
                self.inner.write().await.paused = Some(evt);
                *self.state.write().await = SessionState::Paused;
                let _ = self.notify_tx.send(SessionNotification::Paused { reason });
            }
            SessionEvent::Resumed => {
                self.inner.write().await.paused = None;
                *self.state.write().await = SessionState::Running;
                let _ = self.notify_tx.send(SessionNotification::Resumed);
            }
            SessionEvent::ScriptParsed(evt) => self.handle_script_parsed(evt).await,
            SessionEvent::BreakpointResolved(evt) => {
                let bp_id = BreakpointId(evt.breakpoint_id.clone());
                let mut inner = self.inner.write().await;
                if let Some(record) = inner.breakpoints.get_mut(&bp_id) {
                    record.resolved.push(ResolvedLocation {
                        script_id: ScriptId(evt.location.script_id.clone()),
                        line: evt.location.line_number,
                        column: evt.location.column_number,
                    });
                }
                drop(inner);
                let _ = self
                    .notify_tx
                    .send(SessionNotification::BreakpointResolved { breakpoint_id: bp_id });
            }
            SessionEvent::Unhandled => {}
        }
    }

    async fn handle_script_parsed(&self, evt: ScriptParsedEvent) {
        let script_id = ScriptId(evt.script_id.clone());
        let record = ScriptRecord {
            id: script_id.clone(),
            url: evt.url.clone(),
            source_map_url: evt.source_map_url.clone(),
            is_module: evt.is_module.unwrap_or(false),
        };
        self.inner.write().await.scripts.insert(script_id.clone(), record);

        if let Some(map_url) = evt.source_map_url.clone() {
            let engine = self.source_maps.clone();
            let script_url = evt.url.clone();
            let load_script_id = script_id.clone();
            tokio::spawn(async move {
                engine.load_for_script(load_script_id, &script_url, &map_url).await;
            });
        }

        let _ = self.notify_tx.send(SessionNotification::ScriptParsed { script_id });
    }

    async fn handle_closed(&self) {
        self.correlator.fail_all().await;
        *self.state.write().await = SessionState::Disconnected;
        self.inner.write().await.paused = None;
        warn!(session = %self.id, "transport closed");
        let _ = self.notify_tx.send(SessionNotification::Disconnected {
            cause: "transport closed".to_owned(),
        });
    }

    async fn teardown(&self, cause: &str) {
        self.writer.close().await;
        if let Some(handle) = self.reader_task.write().await.take() {
            handle.abort();
        }
        self.correlator.fail_all().await;
        *self.state.write().await = SessionState::Disconnected;
        warn!(session = %self.id, cause, "session torn down");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.notify_tx.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    async fn require(&self, allowed: &[SessionState]) -> Result<(), BrokerError> {
        let state = self.state().await;
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(BrokerError::InvalidState { state })
        }
    }

    async fn require_non_terminal(&self) -> Result<(), BrokerError> {
        self.require(&[
            SessionState::Connecting,
            SessionState::Connected,
            SessionState::Running,
            SessionState::Paused,
        ])
        .await
    }

    pub async fn disconnect(&self) {
        self.teardown("disconnect_debugger").await;
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            name: self.name.clone(),
            target_url: self.target_url.to_string(),
            state: self.state().await,
        }
    }

    pub async fn details(&self) -> Result<SessionDetails, BrokerError> {
        let summary = self.summary().await;
        let breakpoints = self.list_breakpoints().await;
        let call_stack = if summary.state == SessionState::Paused {
            Some(self.get_call_stack(true).await?.frames)
        } else {
            None
        };
        Ok(SessionDetails { summary, breakpoints, call_stack })
    }

    // ---- command-surface operations ----

    pub async fn set_breakpoint(
        &self,
        url: String,
        line: GeneratedLine0,
        column: Option<u32>,
        condition: Option<String>,
    ) -> Result<(BreakpointId, Vec<ResolvedLocationView>), BrokerError> {
        self.require_non_terminal().await?;
        let params = SetBreakpointByUrlParams {
            url: url.clone(),
            line_number: line.0,
            column_number: column,
            condition: condition.clone(),
        };
        let result = self.call_typed::<SetBreakpointByUrlResult>(method::SET_BREAKPOINT_BY_URL, &params).await?;

        let bp_id = BreakpointId(result.breakpoint_id.clone());
        let resolved: Vec<ResolvedLocation> = result
            .locations
            .iter()
            .map(|loc| ResolvedLocation {
                script_id: ScriptId(loc.script_id.clone()),
                line: loc.line_number,
                column: loc.column_number,
            })
            .collect();

        let record = BreakpointRecord {
            id: bp_id.clone(),
            url,
            line: line.0,
            column,
            condition,
            resolved: resolved.clone(),
        };
        self.inner.write().await.breakpoints.insert(bp_id.clone(), record);

        let views = resolved
            .into_iter()
            .map(|r| ResolvedLocationView { script_id: r.script_id, line_number: r.line, column_number: r.column })
            .collect();
        Ok((bp_id, views))
    }

    pub async fn remove_breakpoint(&self, id: &BreakpointId) -> Result<(), BrokerError> {
        self.require_non_terminal().await?;
        let mut inner = self.inner.write().await;
        if !inner.breakpoints.contains_key(id) {
            return Err(BrokerError::BreakpointNotFound(id.to_string()));
        }
        drop(inner);

        self.call_typed::<Value>(
            method::REMOVE_BREAKPOINT,
            &RemoveBreakpointParams { breakpoint_id: id.0.clone() },
        )
        .await?;

        self.inner.write().await.breakpoints.remove(id);
        Ok(())
    }

    pub async fn list_breakpoints(&self) -> Vec<crate::model::BreakpointView> {
        self.inner
            .read()
            .await
            .breakpoints
            .values()
            .map(|bp| crate::model::BreakpointView {
                id: bp.id.clone(),
                url: bp.url.clone(),
                line: bp.line,
                column: bp.column,
                condition: bp.condition.clone(),
                resolved: bp
                    .resolved
                    .iter()
                    .map(|r| ResolvedLocationView {
                        script_id: r.script_id.clone(),
                        line_number: r.line,
                        column_number: r.column,
                    })
                    .collect(),
            })
            .collect()
    }

    pub async fn resume_execution(&self) -> Result<SessionState, BrokerError> {
        let state = self.state().await;
        match state {
            SessionState::Paused => {
                self.call_typed::<Value>(method::RESUME, &json!({})).await?;
                Ok(self.state().await)
            }
            SessionState::Connected => {
                self.call_typed::<Value>(method::RUN_IF_WAITING_FOR_DEBUGGER, &json!({})).await?;
                *self.state.write().await = SessionState::Running;
                Ok(SessionState::Running)
            }
            other => Err(BrokerError::InvalidState { state: other }),
        }
    }

    pub async fn pause_execution(&self) -> Result<(), BrokerError> {
        self.require(&[SessionState::Connected, SessionState::Running]).await?;
        self.call_typed::<Value>(method::PAUSE, &json!({})).await?;
        Ok(())
    }

    pub async fn step_over(&self) -> Result<(), BrokerError> {
        self.step(method::STEP_OVER).await
    }

    pub async fn step_into(&self) -> Result<(), BrokerError> {
        self.step(method::STEP_INTO).await
    }

    pub async fn step_out(&self) -> Result<(), BrokerError> {
        self.step(method::STEP_OUT).await
    }

    async fn step(&self, cdp_method: &str) -> Result<(), BrokerError> {
        self.require(&[SessionState::Paused]).await?;
        self.call_typed::<Value>(cdp_method, &json!({})).await?;
        Ok(())
    }

    pub async fn get_call_stack(&self, include_async: bool) -> Result<GetCallStackResult, BrokerError> {
        self.require(&[SessionState::Paused]).await?;
        let inner = self.inner.read().await;
        let snapshot = inner.paused.as_ref().ok_or(BrokerError::InvalidState { state: SessionState::Paused })?;

        let mut frames = Vec::with_capacity(snapshot.call_frames.len());
        for frame in &snapshot.call_frames {
            let script_id = ScriptId(frame.location.script_id.clone());
            let sm_line = GeneratedLine0(frame.location.line_number).to_source_map_line();
            let original = self
                .source_maps
                .generated_to_original(&script_id, sm_line, frame.location.column_number.unwrap_or(0))
                .await
                .map(|p| OriginalLocationView { source: p.source, line: p.line, column: p.column, name: p.name });

            frames.push(EnrichedCallFrame {
                call_frame_id: frame.call_frame_id.clone(),
                function_name: frame.function_name.clone(),
                script_id,
                line_number: frame.location.line_number,
                column_number: frame.location.column_number,
                original,
                scope_chain: frame
                    .scope_chain
                    .iter()
                    .map(|s| ScopeView { kind: s.kind.clone(), object_id: s.object.object_id.clone() })
                    .collect(),
                this: remote_value_view(&frame.this_object),
            });
        }

        let async_stack_trace = if include_async {
            snapshot.async_stack_trace.as_ref().map(|trace| AsyncStackTraceView {
                description: trace.description.clone(),
                call_frames: trace
                    .call_frames
                    .iter()
                    .map(|f| AsyncCallFrameView {
                        function_name: f.function_name.clone(),
                        script_id: ScriptId(f.script_id.clone()),
                        line_number: f.line_number,
                        column_number: f.column_number,
                    })
                    .collect(),
            })
        } else {
            None
        };

        Ok(GetCallStackResult { frames, async_stack_trace, hit_breakpoints: snapshot.hit_breakpoints.clone() })
    }

    pub async fn evaluate_expression(
        &self,
        expression: String,
        call_frame_id: Option<String>,
        return_by_value: Option<bool>,
    ) -> Result<EvaluateExpressionResult, BrokerError> {
        let result: EvaluateResult = if let Some(frame_id) = call_frame_id {
            self.require(&[SessionState::Paused]).await?;
            self.call_typed(
                method::EVALUATE_ON_CALL_FRAME,
                &EvaluateOnCallFrameParams { call_frame_id: frame_id, expression, return_by_value },
            )
            .await?
        } else {
            self.require_non_terminal().await?;
            self.call_typed(method::RUNTIME_EVALUATE, &RuntimeEvaluateParams { expression, return_by_value })
                .await?
        };

        Ok(EvaluateExpressionResult {
            result: remote_value_view(&result.result),
            exception_details: result.exception_details.map(|e| ExceptionDetailView {
                text: e.text,
                line_number: e.line_number,
                column_number: e.column_number,
            }),
        })
    }

    pub async fn get_scope_variables(
        &self,
        call_frame_id: &str,
        scope_index: usize,
    ) -> Result<Vec<NamedVariable>, BrokerError> {
        self.require(&[SessionState::Paused]).await?;
        let inner = self.inner.read().await;
        let snapshot = inner.paused.as_ref().ok_or(BrokerError::InvalidState { state: SessionState::Paused })?;
        let frame = snapshot
            .call_frames
            .iter()
            .find(|f| f.call_frame_id == call_frame_id)
            .ok_or_else(|| BrokerError::InvalidParameters(format!("unknown call frame id {call_frame_id}")))?;
        let scope = frame
            .scope_chain
            .get(scope_index)
            .ok_or_else(|| BrokerError::InvalidParameters(format!("scope index {scope_index} out of range")))?;
        let object_id = scope.object.object_id.clone();
        drop(inner);

        let props: GetPropertiesResult = self
            .call_typed(method::GET_PROPERTIES, &GetPropertiesParams { object_id, own_properties: true })
            .await?;

        Ok(props
            .result
            .into_iter()
            .filter_map(|p| p.value.as_ref().map(|v| NamedVariable { name: p.name.clone(), value: remote_value_view(v) }))
            .collect())
    }

    pub async fn set_variable_value(
        &self,
        call_frame_id: String,
        scope_index: u32,
        variable_name: String,
        new_value_expr: String,
    ) -> Result<(), BrokerError> {
        self.require(&[SessionState::Paused]).await?;

        let evaluated: EvaluateResult = self
            .call_typed(
                method::EVALUATE_ON_CALL_FRAME,
                &EvaluateOnCallFrameParams {
                    call_frame_id: call_frame_id.clone(),
                    expression: new_value_expr,
                    return_by_value: Some(false),
                },
            )
            .await?;

        if let Some(exc) = evaluated.exception_details {
            return Err(BrokerError::Protocol(exc.text));
        }

        let new_value = CallArgument::from_remote_object(&evaluated.result);
        self.call_typed::<Value>(
            method::SET_VARIABLE_VALUE,
            &SetVariableValueParams { scope_number: scope_index, variable_name, new_value, call_frame_id },
        )
        .await?;
        Ok(())
    }

    pub async fn set_pause_on_exceptions(&self, state: PauseOnExceptionsState) -> Result<PauseOnExceptionsState, BrokerError> {
        self.require_non_terminal().await?;
        self.call_typed::<Value>(method::SET_PAUSE_ON_EXCEPTIONS, &SetPauseOnExceptionsParams { state }).await?;
        Ok(state)
    }

    pub async fn get_original_location(
        &self,
        script_id: &ScriptId,
        line: OriginalLine1,
        column: u32,
    ) -> Result<GetOriginalLocationResult, BrokerError> {
        self.require_non_terminal().await?;
        let has_source_map = self.source_maps.has_map(script_id).await;
        let original = self
            .source_maps
            .generated_to_original(script_id, line.0, column)
            .await
            .map(|p| OriginalLocationView { source: p.source, line: p.line, column: p.column, name: p.name });
        Ok(GetOriginalLocationResult { has_source_map, original })
    }

    pub async fn get_script_source(&self, script_id: &ScriptId, prefer_original: bool) -> Result<GetScriptSourceResult, BrokerError> {
        self.require_non_terminal().await?;
        let script_url = {
            let inner = self.inner.read().await;
            inner.scripts.get(script_id).map(|s| s.url.clone()).ok_or_else(|| BrokerError::ScriptNotFound(script_id.to_string()))?
        };

        if prefer_original {
            if let Some(sources) = self.source_maps.sources(script_id).await {
                if let Some(first_source) = sources.first() {
                    if let Some(content) = self.source_maps.source_content(script_id, first_source).await {
                        return Ok(GetScriptSourceResult {
                            source: content,
                            source_url: first_source.clone(),
                            is_original: true,
                            source_map_url: None,
                        });
                    }
                }
            }
        }

        let result: cdp::GetScriptSourceResult =
            self.call_typed(method::GET_SCRIPT_SOURCE, &GetScriptSourceParams { script_id: script_id.0.clone() }).await?;
        let source_map_url = self.inner.read().await.scripts.get(script_id).and_then(|s| s.source_map_url.clone());
        Ok(GetScriptSourceResult { source: result.script_source, source_url: script_url, is_original: false, source_map_url })
    }

    pub async fn list_scripts(&self, include_internal: bool) -> Vec<crate::model::ScriptView> {
        let inner = self.inner.read().await;
        let mut scripts: Vec<_> = inner
            .scripts
            .values()
            .filter(|s| include_internal || is_visible_script(&s.url))
            .map(|s| crate::model::ScriptView {
                id: s.id.clone(),
                url: s.url.clone(),
                source_map_url: s.source_map_url.clone(),
                has_source_map: s.source_map_url.is_some(),
                is_module: s.is_module,
            })
            .collect();
        drop(inner);
        scripts.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        scripts
    }

    async fn call_typed<T: serde::de::DeserializeOwned>(&self, method: &str, params: &impl Serialize) -> Result<T, BrokerError> {
        let params = serde_json::to_value(params).map_err(|e| BrokerError::InvalidParameters(e.to_string()))?;
        let value = self.correlator.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| BrokerError::Protocol(format!("unexpected result shape: {e}")))
    }
}

fn is_visible_script(url: &str) -> bool {
    !url.is_empty() && !url.starts_with("node:") && !url.starts_with("internal/") && !url.contains("node_modules")
}

fn remote_value_view(obj: &RemoteObject) -> RemoteValueView {
    RemoteValueView {
        kind: obj.kind.clone(),
        subtype: obj.subtype.clone(),
        value: obj.value.clone(),
        description: obj.description.clone(),
        object_id: obj.object_id.clone(),
    }
}
