//! Result types returned by the command surface and by the read-only
//! `debug://...` resource projections. Plain serializable data — no
//! behavior — so both `commands.rs` and the stdio front end in
//! `services/debug-broker` can hand them straight to `serde_json`.

use serde::Serialize;

use crate::session::SessionState;
use crate::types::{BreakpointId, ScriptId, SessionId};

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: Option<String>,
    pub target_url: String,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    pub summary: SessionSummary,
    pub breakpoints: Vec<BreakpointView>,
    pub call_stack: Option<Vec<EnrichedCallFrame>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLocationView {
    pub script_id: ScriptId,
    pub line_number: u32,
    pub column_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakpointView {
    pub id: BreakpointId,
    pub url: String,
    pub line: u32,
    pub column: Option<u32>,
    pub condition: Option<String>,
    pub resolved: Vec<ResolvedLocationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptView {
    pub id: ScriptId,
    pub url: String,
    pub source_map_url: Option<String>,
    pub has_source_map: bool,
    pub is_module: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginalLocationView {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetOriginalLocationResult {
    pub has_source_map: bool,
    pub original: Option<OriginalLocationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeView {
    pub kind: String,
    pub object_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedCallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub script_id: ScriptId,
    pub line_number: u32,
    pub column_number: Option<u32>,
    pub original: Option<OriginalLocationView>,
    pub scope_chain: Vec<ScopeView>,
    pub this: RemoteValueView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AsyncCallFrameView {
    pub function_name: String,
    pub script_id: ScriptId,
    pub line_number: u32,
    pub column_number: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AsyncStackTraceView {
    pub description: Option<String>,
    pub call_frames: Vec<AsyncCallFrameView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetCallStackResult {
    pub frames: Vec<EnrichedCallFrame>,
    pub async_stack_trace: Option<AsyncStackTraceView>,
    pub hit_breakpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteValueView {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionDetailView {
    pub text: String,
    pub line_number: i64,
    pub column_number: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateExpressionResult {
    pub result: RemoteValueView,
    pub exception_details: Option<ExceptionDetailView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedVariable {
    pub name: String,
    pub value: RemoteValueView,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetScriptSourceResult {
    pub source: String,
    pub source_url: String,
    pub is_original: bool,
    pub source_map_url: Option<String>,
}
