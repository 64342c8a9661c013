//! Wire types for the dialogue with a JS-runtime inspector backend: the
//! JSON-RPC 2.0 envelope and the typed params/results/events for the
//! specific inspector-protocol methods this broker speaks.
//!
//! This crate is pure data — no I/O, no async. The WebSocket transport and
//! command correlation live in `debug-broker-core`.

pub mod cdp;
pub mod envelope;

pub use envelope::{decode_inbound, encode_outbound, FrameDecodeError, InboundFrame, OutboundRequest, RpcError};
