//! Identity types for barter agents
//!
//! Agents are addressed by a local name unique within the market. Correlation
//! tokens pair a request with its replies and must never collide, even across
//! overlapping negotiations of the same agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of an agent, unique within a market
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Opaque token pairing a request with its replies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Fresh token for a call-for-proposals round
    pub fn call_for_proposals() -> Self {
        Self::with_prefix("cfp")
    }

    /// Fresh token for a purchase order round
    pub fn order() -> Self {
        Self::with_prefix("order")
    }

    /// Fresh token: `<prefix>-<uuid v4>`
    pub fn with_prefix(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
