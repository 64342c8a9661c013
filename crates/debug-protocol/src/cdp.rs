//! Typed params/results for the inspector-protocol methods and events this
//! broker speaks. Field names are `camelCase` on the wire, matching the
//! target's JSON-RPC domain exactly.

use serde::{Deserialize, Serialize};

/// Method names this broker sends.
pub mod method {
    pub const DEBUGGER_ENABLE: &str = "Debugger.enable";
    pub const RUNTIME_ENABLE: &str = "Runtime.enable";
    pub const SET_BREAKPOINT_BY_URL: &str = "Debugger.setBreakpointByUrl";
    pub const REMOVE_BREAKPOINT: &str = "Debugger.removeBreakpoint";
    pub const RESUME: &str = "Debugger.resume";
    pub const PAUSE: &str = "Debugger.pause";
    pub const STEP_OVER: &str = "Debugger.stepOver";
    pub const STEP_INTO: &str = "Debugger.stepInto";
    pub const STEP_OUT: &str = "Debugger.stepOut";
    pub const EVALUATE_ON_CALL_FRAME: &str = "Debugger.evaluateOnCallFrame";
    pub const SET_VARIABLE_VALUE: &str = "Debugger.setVariableValue";
    pub const SET_PAUSE_ON_EXCEPTIONS: &str = "Debugger.setPauseOnExceptions";
    pub const GET_SCRIPT_SOURCE: &str = "Debugger.getScriptSource";
    pub const RUNTIME_EVALUATE: &str = "Runtime.evaluate";
    pub const GET_PROPERTIES: &str = "Runtime.getProperties";
    pub const RUN_IF_WAITING_FOR_DEBUGGER: &str = "Runtime.runIfWaitingForDebugger";
}

/// Method names this broker receives as notifications.
pub mod event {
    pub const PAUSED: &str = "Debugger.paused";
    pub const RESUMED: &str = "Debugger.resumed";
    pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";
    pub const BREAKPOINT_RESOLVED: &str = "Debugger.breakpointResolved";
}

/// A generated-code location as the target reports it: 0-based line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: String,
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlParams {
    pub url: String,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlResult {
    pub breakpoint_id: String,
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpointParams {
    pub breakpoint_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolvedEvent {
    pub breakpoint_id: String,
    pub location: Location,
}

/// A JS value as the target's runtime domain represents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub object: ScopeObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeObject {
    pub object_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub location: Location,
    pub scope_chain: Vec<Scope>,
    #[serde(rename = "this")]
    pub this_object: RemoteObject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncStackTrace {
    #[serde(default)]
    pub description: Option<String>,
    pub call_frames: Vec<AsyncCallFrame>,
    #[serde(default)]
    pub parent: Option<Box<AsyncStackTrace>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncCallFrame {
    pub function_name: String,
    pub script_id: String,
    pub line_number: u32,
    pub column_number: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    pub call_frames: Vec<CallFrame>,
    pub reason: String,
    #[serde(default)]
    pub hit_breakpoints: Vec<String>,
    #[serde(default)]
    pub async_stack_trace: Option<AsyncStackTrace>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsedEvent {
    pub script_id: String,
    pub url: String,
    #[serde(default)]
    pub source_map_url: Option<String>,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub is_module: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOnCallFrameParams {
    pub call_frame_id: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvaluateParams {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub text: String,
    pub line_number: i64,
    pub column_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesParams {
    pub object_id: String,
    pub own_properties: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: Option<RemoteObject>,
    #[serde(default)]
    pub get: Option<RemoteObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesResult {
    #[serde(default)]
    pub result: Vec<PropertyDescriptor>,
}

/// Argument form for `Debugger.setVariableValue` — exactly one of the three
/// is populated, chosen from the evaluated remote object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl CallArgument {
    pub fn from_remote_object(obj: &RemoteObject) -> Self {
        if let Some(object_id) = &obj.object_id {
            CallArgument {
                value: None,
                unserializable_value: None,
                object_id: Some(object_id.clone()),
            }
        } else if let Some(unserializable) = &obj.unserializable_value {
            CallArgument {
                value: None,
                unserializable_value: Some(unserializable.clone()),
                object_id: None,
            }
        } else {
            CallArgument {
                value: obj.value.clone(),
                unserializable_value: None,
                object_id: None,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableValueParams {
    pub scope_number: u32,
    pub variable_name: String,
    pub new_value: CallArgument,
    pub call_frame_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOnExceptionsState {
    None,
    Uncaught,
    All,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseOnExceptionsParams {
    pub state: PauseOnExceptionsState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceParams {
    pub script_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceResult {
    pub script_source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_argument_prefers_object_id_over_value() {
        let obj = RemoteObject {
            kind: "object".into(),
            subtype: None,
            value: Some(serde_json::json!(1)),
            unserializable_value: None,
            description: None,
            object_id: Some("oid-1".into()),
        };
        let arg = CallArgument::from_remote_object(&obj);
        assert_eq!(arg.object_id.as_deref(), Some("oid-1"));
        assert!(arg.value.is_none());
    }

    #[test]
    fn call_argument_falls_back_to_unserializable_then_value() {
        let unserializable = RemoteObject {
            kind: "number".into(),
            subtype: None,
            value: None,
            unserializable_value: Some("NaN".into()),
            description: None,
            object_id: None,
        };
        assert_eq!(
            CallArgument::from_remote_object(&unserializable).unserializable_value.as_deref(),
            Some("NaN")
        );

        let plain = RemoteObject {
            kind: "string".into(),
            subtype: None,
            value: Some(serde_json::json!("hi")),
            unserializable_value: None,
            description: None,
            object_id: None,
        };
        assert_eq!(
            CallArgument::from_remote_object(&plain).value,
            Some(serde_json::json!("hi"))
        );
    }

    #[test]
    fn pause_on_exceptions_state_serializes_lowercase() {
        let params = SetPauseOnExceptionsParams {
            state: PauseOnExceptionsState::Uncaught,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"state":"uncaught"}"#);
    }
}
