//! The stdio front end's line protocol: one `Command` decoded per input
//! line, one JSON result/error object written per output line. This is
//! explicitly *not* part of the stable contract in `debug-broker-core`'s
//! `commands` module — it is a thin, delegated outer layer, kept here only
//! so the workspace is runnable end-to-end.

use debug_broker_core::commands;
use debug_broker_core::error::BrokerError;
use debug_broker_core::session::SessionState;
use debug_broker_core::types::{BreakpointId, GeneratedLine0, OriginalLine1, ScriptId, SessionId};
use debug_broker_core::SessionRegistry;
use debug_protocol::cdp::PauseOnExceptionsState;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    ConnectDebugger { websocket_url: String, name: Option<String> },
    DisconnectDebugger { session_id: String },
    SetBreakpoint { session_id: String, url: String, line: u32, column: Option<u32>, condition: Option<String> },
    RemoveBreakpoint { session_id: String, breakpoint_id: String },
    ListBreakpoints { session_id: String },
    ResumeExecution { session_id: String },
    StepOver { session_id: String },
    StepInto { session_id: String },
    StepOut { session_id: String },
    PauseExecution { session_id: String },
    GetCallStack { session_id: String, #[serde(default = "default_true")] include_async: bool },
    EvaluateExpression {
        session_id: String,
        expression: String,
        call_frame_id: Option<String>,
        return_by_value: Option<bool>,
    },
    GetScopeVariables { session_id: String, call_frame_id: String, #[serde(default)] scope_index: usize },
    SetVariableValue {
        session_id: String,
        call_frame_id: String,
        scope_index: u32,
        variable_name: String,
        new_value: String,
    },
    SetPauseOnExceptions { session_id: String, state: PauseOnExceptionsState },
    GetOriginalLocation { session_id: String, script_id: String, line: u32, column: u32 },
    GetScriptSource { session_id: String, script_id: String, #[serde(default)] prefer_original: bool },
    ListScripts { session_id: String, #[serde(default)] include_internal: bool },
    ListSessions,
    GetSessionDetails { session_id: String },
}

fn default_true() -> bool {
    true
}

fn parse_session_id(raw: &str) -> Result<SessionId, BrokerError> {
    uuid::Uuid::from_str(raw)
        .map(SessionId)
        .map_err(|e| BrokerError::InvalidParameters(format!("invalid session id '{raw}': {e}")))
}

/// Decode one line, dispatch it against `registry`, and return the JSON
/// value to write back (already success/error-wrapped by the caller).
pub async fn dispatch(registry: &SessionRegistry, command: Command) -> Result<Value, BrokerError> {
    match command {
        Command::ConnectDebugger { websocket_url, name } => {
            let summary = commands::connect_debugger(registry, &websocket_url, name).await?;
            Ok(serde_json::to_value(summary).unwrap())
        }
        Command::DisconnectDebugger { session_id } => {
            commands::disconnect_debugger(registry, parse_session_id(&session_id)?).await?;
            Ok(Value::Null)
        }
        Command::SetBreakpoint { session_id, url, line, column, condition } => {
            let (id, resolved) = commands::set_breakpoint(
                registry,
                parse_session_id(&session_id)?,
                url,
                GeneratedLine0(line),
                column,
                condition,
            )
            .await?;
            Ok(serde_json::json!({ "breakpoint_id": id.0, "resolved": resolved }))
        }
        Command::RemoveBreakpoint { session_id, breakpoint_id } => {
            commands::remove_breakpoint(registry, parse_session_id(&session_id)?, &BreakpointId(breakpoint_id)).await?;
            Ok(Value::Null)
        }
        Command::ListBreakpoints { session_id } => {
            let list = commands::list_breakpoints(registry, parse_session_id(&session_id)?).await?;
            Ok(serde_json::to_value(list).unwrap())
        }
        Command::ResumeExecution { session_id } => {
            let state = commands::resume_execution(registry, parse_session_id(&session_id)?).await?;
            Ok(state_value(state))
        }
        Command::StepOver { session_id } => {
            commands::step_over(registry, parse_session_id(&session_id)?).await?;
            Ok(Value::Null)
        }
        Command::StepInto { session_id } => {
            commands::step_into(registry, parse_session_id(&session_id)?).await?;
            Ok(Value::Null)
        }
        Command::StepOut { session_id } => {
            commands::step_out(registry, parse_session_id(&session_id)?).await?;
            Ok(Value::Null)
        }
        Command::PauseExecution { session_id } => {
            commands::pause_execution(registry, parse_session_id(&session_id)?).await?;
            Ok(Value::Null)
        }
        Command::GetCallStack { session_id, include_async } => {
            let result = commands::get_call_stack(registry, parse_session_id(&session_id)?, include_async).await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::EvaluateExpression { session_id, expression, call_frame_id, return_by_value } => {
            let result = commands::evaluate_expression(
                registry,
                parse_session_id(&session_id)?,
                expression,
                call_frame_id,
                return_by_value,
            )
            .await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::GetScopeVariables { session_id, call_frame_id, scope_index } => {
            let result =
                commands::get_scope_variables(registry, parse_session_id(&session_id)?, &call_frame_id, scope_index)
                    .await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::SetVariableValue { session_id, call_frame_id, scope_index, variable_name, new_value } => {
            commands::set_variable_value(
                registry,
                parse_session_id(&session_id)?,
                call_frame_id,
                scope_index,
                variable_name,
                new_value,
            )
            .await?;
            Ok(Value::Null)
        }
        Command::SetPauseOnExceptions { session_id, state } => {
            let new_state = commands::set_pause_on_exceptions(registry, parse_session_id(&session_id)?, state).await?;
            Ok(serde_json::to_value(new_state).unwrap())
        }
        Command::GetOriginalLocation { session_id, script_id, line, column } => {
            let result = commands::get_original_location(
                registry,
                parse_session_id(&session_id)?,
                &ScriptId(script_id),
                OriginalLine1(line),
                column,
            )
            .await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::GetScriptSource { session_id, script_id, prefer_original } => {
            let result = commands::get_script_source(
                registry,
                parse_session_id(&session_id)?,
                &ScriptId(script_id),
                prefer_original,
            )
            .await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::ListScripts { session_id, include_internal } => {
            let result =
                commands::list_scripts(registry, parse_session_id(&session_id)?, include_internal).await?;
            Ok(serde_json::to_value(result).unwrap())
        }
        Command::ListSessions => Ok(serde_json::to_value(commands::list_sessions(registry).await).unwrap()),
        Command::GetSessionDetails { session_id } => {
            let details = commands::get_session_details(registry, parse_session_id(&session_id)?).await?;
            Ok(serde_json::to_value(details).unwrap())
        }
    }
}

fn state_value(state: SessionState) -> Value {
    serde_json::to_value(state).unwrap()
}

/// Render a dispatch outcome to the wire line form:
/// `{"ok":true,"result":...}` or `{"ok":false,"error":{"kind":"...","message":"..."}}`.
pub fn render(outcome: Result<Value, BrokerError>) -> Value {
    match outcome {
        Ok(result) => serde_json::json!({ "ok": true, "result": result }),
        Err(err) => serde_json::json!({ "ok": false, "error": { "kind": error_kind(&err), "message": err.to_string() } }),
    }
}

fn error_kind(err: &BrokerError) -> &'static str {
    match err {
        BrokerError::SessionNotFound(_) => "SESSION_NOT_FOUND",
        BrokerError::InvalidState { .. } => "SESSION_INVALID_STATE",
        BrokerError::ConnectionFailed(_) => "CONNECTION_FAILED",
        BrokerError::Protocol(_) => "PROTOCOL_ERROR",
        BrokerError::InvalidParameters(_) => "INVALID_PARAMETERS",
        BrokerError::Timeout => "TIMEOUT",
        BrokerError::BreakpointNotFound(_) => "BREAKPOINT_NOT_FOUND",
        BrokerError::ScriptNotFound(_) => "SCRIPT_NOT_FOUND",
        BrokerError::SourceMapError(_) => "SOURCE_MAP_ERROR",
        BrokerError::MaxSessionsReached => "MAX_SESSIONS_REACHED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_connect_debugger() {
        let raw = r#"{"op":"connect_debugger","websocket_url":"ws://localhost:9229/t"}"#;
        let cmd: Command = serde_json::from_str(raw).unwrap();
        assert!(matches!(cmd, Command::ConnectDebugger { .. }));
    }

    #[test]
    fn renders_error_with_stable_kind() {
        let value = render(Err(BrokerError::MaxSessionsReached));
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["kind"], "MAX_SESSIONS_REACHED");
    }

    #[test]
    fn renders_success() {
        let value = render(Ok(serde_json::json!({"hello": "world"})));
        assert_eq!(value["ok"], true);
        assert_eq!(value["result"]["hello"], "world");
    }
}
