//! Session broker: binds a controlling-client session id to one JSON-RPC
//! conversation with a JS-runtime inspector backend, correlates commands,
//! demultiplexes events into cached session state, and projects generated
//! positions onto original source via a source-map engine.
//!
//! `commands.rs` is the stable contract: a thin dispatcher over
//! `SessionRegistry` and `Session`. Everything else is the machinery behind
//! it.

pub mod admission;
pub mod commands;
pub mod correlator;
pub mod error;
pub mod events;
pub mod framer;
pub mod model;
pub mod registry;
pub mod session;
pub mod source_map;
pub mod types;

pub use error::BrokerError;
pub use registry::SessionRegistry;
pub use session::{Session, SessionState};
pub use types::{BreakpointId, GeneratedLine0, OriginalLine1, ScriptId, SessionId};
