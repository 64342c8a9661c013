//! Event demultiplexer: classifies an inbound notification by method name
//! into a typed [`SessionEvent`]. Mutating session state from the
//! classified event is `session.rs`'s job — this module is the pure
//! routing/decoding step, kept separate so it can be unit-tested without a
//! live session.

use debug_protocol::cdp::{event, BreakpointResolvedEvent, PausedEvent, ScriptParsedEvent};
use serde_json::Value;
use tracing::warn;

/// The result of classifying one inbound notification.
pub enum SessionEvent {
    Paused(PausedEvent),
    Resumed,
    ScriptParsed(ScriptParsedEvent),
    BreakpointResolved(BreakpointResolvedEvent),
    /// A notification whose method this broker doesn't route, or whose
    /// params didn't decode as the expected shape for a recognized method.
    /// Both cases are dropped silently; the malformed-decode case is logged
    /// at warn level first.
    Unhandled,
}

pub fn classify(method: &str, params: Value) -> SessionEvent {
    match method {
        event::PAUSED => decode(method, params).map_or(SessionEvent::Unhandled, SessionEvent::Paused),
        event::RESUMED => SessionEvent::Resumed,
        event::SCRIPT_PARSED => decode(method, params).map_or(SessionEvent::Unhandled, SessionEvent::ScriptParsed),
        event::BREAKPOINT_RESOLVED => {
            decode(method, params).map_or(SessionEvent::Unhandled, SessionEvent::BreakpointResolved)
        }
        _ => SessionEvent::Unhandled,
    }
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(method, error = %e, "dropping notification with unexpected params shape");
            None
        }
    }
}
