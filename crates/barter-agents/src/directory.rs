//! Agent directory (yellow pages)

use std::collections::BTreeSet;

use barter_types::AgentId;
use dashmap::DashMap;
use thiserror::Error;

/// Discovery failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("directory unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("agent {agent} is not registered")]
    NotRegistered { agent: AgentId },
}

/// Directory trait
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Advertise a capability
    async fn register(&self, agent: &AgentId, capability: &str) -> Result<(), DiscoveryError>;

    /// Withdraw every capability of an agent
    async fn deregister(&self, agent: &AgentId) -> Result<(), DiscoveryError>;

    /// Agents advertising a capability
    async fn search(&self, capability: &str) -> Result<Vec<AgentId>, DiscoveryError>;
}

/// Directory held in process memory
#[derive(Default)]
pub struct InMemoryDirectory {
    entries: DashMap<AgentId, BTreeSet<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Directory for InMemoryDirectory {
    async fn register(&self, agent: &AgentId, capability: &str) -> Result<(), DiscoveryError> {
        self.entries
            .entry(agent.clone())
            .or_default()
            .insert(capability.to_string());
        Ok(())
    }

    async fn deregister(&self, agent: &AgentId) -> Result<(), DiscoveryError> {
        self.entries
            .remove(agent)
            .map(|_| ())
            .ok_or_else(|| DiscoveryError::NotRegistered {
                agent: agent.clone(),
            })
    }

    async fn search(&self, capability: &str) -> Result<Vec<AgentId>, DiscoveryError> {
        let mut found: Vec<AgentId> = self
            .entries
            .iter()
            .filter(|entry| entry.value().contains(capability))
            .map(|entry| entry.key().clone())
            .collect();
        found.sort();
        Ok(found)
    }
}
