//! Identifier newtypes.
//!
//! All identifiers are thin wrappers over [`SmolStr`](smol_str::SmolStr)
//! rather than bare `String` — they are cloned constantly (every command
//! fan-out, every routing lookup, every log line) and are almost always
//! short enough to live inline.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Stable identifier for a managed browser instance, used in routing and logs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Deserialize, Serialize)]
pub struct AccountName(pub SmolStr);

impl AccountName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for AccountName {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Key into the [`RoutingTable`](crate::routing::RoutingTable).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Deserialize, Serialize)]
pub struct StrategyName(pub SmolStr);

impl StrategyName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for StrategyName {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// The well-known strategy name every routing table must define, used as
/// the fallback when an inbound intent names an unknown strategy.
pub const DEFAULT_STRATEGY: &str = "DEFAULT";

/// Unique identifier for one fan-out invocation, used to correlate logs and
/// the per-account results of a [`CommandRecord`](crate::command::CommandRecord).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Deserialize, Serialize)]
pub struct CommandId(pub uuid::Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}
