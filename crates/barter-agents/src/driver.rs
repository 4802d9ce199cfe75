//! Trade Cycle Driver - Periodic seller discovery and buy attempts

use barter_types::{AgentId, SELLER_CAPABILITY};
use serde::{Deserialize, Serialize};

use crate::directory::Directory;

/// Whether buy attempts of one agent may overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPolicy {
    /// Launch a new attempt every tick, pending ones included
    #[default]
    Overlapping,
    /// Skip the tick while an attempt is still pending
    Serialized,
}

/// Drives an agent's trade cycle
#[derive(Debug)]
pub struct TradeCycleDriver {
    capability: String,
    policy: SessionPolicy,
    known_sellers: Vec<AgentId>,
    cycles: u64,
}

impl TradeCycleDriver {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            capability: SELLER_CAPABILITY.to_string(),
            policy,
            known_sellers: Vec::new(),
            cycles: 0,
        }
    }

    pub fn known_sellers(&self) -> &[AgentId] {
        &self.known_sellers
    }

    /// Ticks handled so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Refresh the known sellers, excluding `me`
    ///
    /// A failed search leaves no known sellers for this cycle.
    pub async fn find_sellers(&mut self, me: &AgentId, directory: &dyn Directory) -> &[AgentId] {
        self.cycles += 1;
        self.known_sellers = match directory.search(&self.capability).await {
            Ok(found) => found.into_iter().filter(|agent| agent != me).collect(),
            Err(err) => {
                tracing::error!(agent = %me, error = %err, "seller search failed");
                Vec::new()
            }
        };
        tracing::debug!(
            agent = %me,
            sellers = ?self.known_sellers,
            "found seller agents"
        );
        &self.known_sellers
    }

    /// Whether to launch an attempt given the number still pending
    pub fn should_launch(&self, pending: usize) -> bool {
        match self.policy {
            SessionPolicy::Overlapping => true,
            SessionPolicy::Serialized => pending == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DiscoveryError, InMemoryDirectory};

    struct BrokenDirectory;

    #[async_trait::async_trait]
    impl Directory for BrokenDirectory {
        async fn register(&self, _: &AgentId, _: &str) -> Result<(), DiscoveryError> {
            Ok(())
        }

        async fn deregister(&self, _: &AgentId) -> Result<(), DiscoveryError> {
            Ok(())
        }

        async fn search(&self, _: &str) -> Result<Vec<AgentId>, DiscoveryError> {
            Err(DiscoveryError::Unavailable {
                reason: "down for maintenance".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_find_sellers_excludes_self() {
        let directory = InMemoryDirectory::new();
        for name in ["baker", "farmer", "miller"] {
            directory.register(&AgentId::from(name), SELLER_CAPABILITY).await.unwrap();
        }
        let mut driver = TradeCycleDriver::new(SessionPolicy::Overlapping);

        let sellers = driver.find_sellers(&AgentId::from("baker"), &directory).await.to_vec();

        assert_eq!(sellers, vec![AgentId::from("farmer"), AgentId::from("miller")]);
        assert_eq!(driver.cycles(), 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_yields_no_sellers() {
        let directory = InMemoryDirectory::new();
        directory.register(&AgentId::from("farmer"), SELLER_CAPABILITY).await.unwrap();
        let mut driver = TradeCycleDriver::new(SessionPolicy::Overlapping);
        driver.find_sellers(&AgentId::from("baker"), &directory).await;
        assert_eq!(driver.known_sellers().len(), 1);

        let sellers = driver.find_sellers(&AgentId::from("baker"), &BrokenDirectory).await;

        assert!(sellers.is_empty());
        assert_eq!(driver.cycles(), 2);
    }

    #[test]
    fn test_session_policy() {
        let overlapping = TradeCycleDriver::new(SessionPolicy::Overlapping);
        assert!(overlapping.should_launch(3));

        let serialized = TradeCycleDriver::new(SessionPolicy::Serialized);
        assert!(serialized.should_launch(0));
        assert!(!serialized.should_launch(1));
    }
}
