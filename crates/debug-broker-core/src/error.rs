//! The broker's error taxonomy, as a single `thiserror` enum returned
//! uniformly by the command surface — one enum per boundary, the same shape
//! as a `SessionError`/`ConfigError`/`UplinkError` split across crates.

use crate::session::SessionState;
use crate::types::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("operation not permitted in session state {state:?}")]
    InvalidState { state: SessionState },

    #[error("connection to target failed: {0}")]
    ConnectionFailed(String),

    #[error("target returned a protocol error: {0}")]
    Protocol(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("command timed out")]
    Timeout,

    #[error("breakpoint not found: {0}")]
    BreakpointNotFound(String),

    #[error("script not found: {0}")]
    ScriptNotFound(String),

    #[error("source map error: {0}")]
    SourceMapError(String),

    #[error("maximum concurrent session count reached")]
    MaxSessionsReached,
}
