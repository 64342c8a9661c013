//! Identifiers and line-number newtypes.
//!
//! Line-number base is part of the type, not just a comment: a
//! `GeneratedLine0` cannot be passed where an `OriginalLine1` is expected, so
//! the 0-based/1-based split between the wire and the source-map engine
//! can't be silently crossed by caller code.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, target-issued breakpoint id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakpointId(pub String);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, target-issued script id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId(pub String);

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 0-based line number in generated (executing) code, as the target's
/// inspector protocol and `set_breakpoint`'s `line` param use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratedLine0(pub u32);

/// A 1-based line number in original (pre-transpilation) source, as source
/// maps and `get_original_location`'s `line` param use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginalLine1(pub u32);

impl GeneratedLine0 {
    /// Add 1 to project onto the 1-based convention source-map data uses
    /// internally.
    pub fn to_source_map_line(self) -> u32 {
        self.0 + 1
    }
}
