//! Command surface: the stable, typed contract. Thin and stateless — every
//! function here looks a session up in the registry and delegates to it;
//! all the state-machine and protocol logic lives in `session.rs`.

use debug_protocol::cdp::PauseOnExceptionsState;

use crate::error::BrokerError;
use crate::model::{
    BreakpointView, EvaluateExpressionResult, GetCallStackResult, GetOriginalLocationResult,
    GetScriptSourceResult, NamedVariable, ResolvedLocationView, ScriptView, SessionDetails, SessionSummary,
};
use crate::registry::SessionRegistry;
use crate::session::SessionState;
use crate::types::{BreakpointId, GeneratedLine0, OriginalLine1, ScriptId, SessionId};

pub async fn connect_debugger(
    registry: &SessionRegistry,
    websocket_url: &str,
    name: Option<String>,
) -> Result<SessionSummary, BrokerError> {
    let session = registry.create(websocket_url, name).await?;
    Ok(session.summary().await)
}

pub async fn disconnect_debugger(registry: &SessionRegistry, session_id: SessionId) -> Result<(), BrokerError> {
    registry.destroy(session_id).await
}

pub async fn set_breakpoint(
    registry: &SessionRegistry,
    session_id: SessionId,
    url: String,
    line: GeneratedLine0,
    column: Option<u32>,
    condition: Option<String>,
) -> Result<(BreakpointId, Vec<ResolvedLocationView>), BrokerError> {
    let session = registry.get(session_id).await?;
    session.set_breakpoint(url, line, column, condition).await
}

pub async fn remove_breakpoint(
    registry: &SessionRegistry,
    session_id: SessionId,
    breakpoint_id: &BreakpointId,
) -> Result<(), BrokerError> {
    let session = registry.get(session_id).await?;
    session.remove_breakpoint(breakpoint_id).await
}

pub async fn list_breakpoints(registry: &SessionRegistry, session_id: SessionId) -> Result<Vec<BreakpointView>, BrokerError> {
    let session = registry.get(session_id).await?;
    Ok(session.list_breakpoints().await)
}

pub async fn resume_execution(registry: &SessionRegistry, session_id: SessionId) -> Result<SessionState, BrokerError> {
    let session = registry.get(session_id).await?;
    session.resume_execution().await
}

pub async fn step_over(registry: &SessionRegistry, session_id: SessionId) -> Result<(), BrokerError> {
    registry.get(session_id).await?.step_over().await
}

pub async fn step_into(registry: &SessionRegistry, session_id: SessionId) -> Result<(), BrokerError> {
    registry.get(session_id).await?.step_into().await
}

pub async fn step_out(registry: &SessionRegistry, session_id: SessionId) -> Result<(), BrokerError> {
    registry.get(session_id).await?.step_out().await
}

pub async fn pause_execution(registry: &SessionRegistry, session_id: SessionId) -> Result<(), BrokerError> {
    registry.get(session_id).await?.pause_execution().await
}

pub async fn get_call_stack(
    registry: &SessionRegistry,
    session_id: SessionId,
    include_async: bool,
) -> Result<GetCallStackResult, BrokerError> {
    registry.get(session_id).await?.get_call_stack(include_async).await
}

pub async fn evaluate_expression(
    registry: &SessionRegistry,
    session_id: SessionId,
    expression: String,
    call_frame_id: Option<String>,
    return_by_value: Option<bool>,
) -> Result<EvaluateExpressionResult, BrokerError> {
    registry.get(session_id).await?.evaluate_expression(expression, call_frame_id, return_by_value).await
}

pub async fn get_scope_variables(
    registry: &SessionRegistry,
    session_id: SessionId,
    call_frame_id: &str,
    scope_index: usize,
) -> Result<Vec<NamedVariable>, BrokerError> {
    registry.get(session_id).await?.get_scope_variables(call_frame_id, scope_index).await
}

pub async fn set_variable_value(
    registry: &SessionRegistry,
    session_id: SessionId,
    call_frame_id: String,
    scope_index: u32,
    variable_name: String,
    new_value_expr: String,
) -> Result<(), BrokerError> {
    registry
        .get(session_id)
        .await?
        .set_variable_value(call_frame_id, scope_index, variable_name, new_value_expr)
        .await
}

pub async fn set_pause_on_exceptions(
    registry: &SessionRegistry,
    session_id: SessionId,
    state: PauseOnExceptionsState,
) -> Result<PauseOnExceptionsState, BrokerError> {
    registry.get(session_id).await?.set_pause_on_exceptions(state).await
}

pub async fn get_original_location(
    registry: &SessionRegistry,
    session_id: SessionId,
    script_id: &ScriptId,
    line: OriginalLine1,
    column: u32,
) -> Result<GetOriginalLocationResult, BrokerError> {
    registry.get(session_id).await?.get_original_location(script_id, line, column).await
}

pub async fn get_script_source(
    registry: &SessionRegistry,
    session_id: SessionId,
    script_id: &ScriptId,
    prefer_original: bool,
) -> Result<GetScriptSourceResult, BrokerError> {
    registry.get(session_id).await?.get_script_source(script_id, prefer_original).await
}

pub async fn list_scripts(
    registry: &SessionRegistry,
    session_id: SessionId,
    include_internal: bool,
) -> Result<Vec<ScriptView>, BrokerError> {
    Ok(registry.get(session_id).await?.list_scripts(include_internal).await)
}

/// `debug://sessions`
pub async fn list_sessions(registry: &SessionRegistry) -> Vec<SessionSummary> {
    registry.list().await
}

/// `debug://sessions/{id}`
pub async fn get_session_details(registry: &SessionRegistry, session_id: SessionId) -> Result<SessionDetails, BrokerError> {
    registry.get(session_id).await?.details().await
}
