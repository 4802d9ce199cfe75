//! Agent runtime: one tokio task per agent
//!
//! The task owns the agent and multiplexes its two inputs, the mailbox and
//! the trade-cycle ticker, so the agent never handles two inputs at once.

use std::sync::Arc;

use barter_types::{AgentId, SELLER_CAPABILITY};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::agent::{AgentError, AgentReport, EconomicAgent};
use crate::bus::Mailbox;
use crate::directory::Directory;

/// Handle to a running agent
pub struct AgentHandle {
    id: AgentId,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<AgentReport>,
}

impl AgentHandle {
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the agent to stop and wait for its final report
    pub async fn stop(mut self) -> Result<AgentReport, AgentError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        Ok(self.task.await?)
    }
}

/// Run `agent` on its own task until stopped or until its mailbox closes
///
/// The caller registers the mailbox on the bus; the task registers the agent
/// as a seller in `directory` and withdraws it on the way out.
pub fn spawn_agent(
    mut agent: EconomicAgent,
    mut mailbox: Mailbox,
    directory: Arc<dyn Directory>,
) -> AgentHandle {
    let id = agent.id().clone();
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let task_id = id.clone();
    let task = tokio::spawn(async move {
        let id = task_id;
        if let Err(err) = directory.register(&id, SELLER_CAPABILITY).await {
            tracing::error!(agent = %id, error = %err, "seller registration failed");
        }
        agent.setup();

        let tick = agent.config().tick;
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                message = mailbox.recv() => match message {
                    Some(message) => agent.handle_message(message),
                    None => {
                        tracing::warn!(agent = %id, "mailbox closed");
                        break;
                    }
                },
                _ = ticker.tick() => agent.on_tick(directory.as_ref()).await,
            }
        }

        if let Err(err) = directory.deregister(&id).await {
            tracing::debug!(agent = %id, error = %err, "seller deregistration failed");
        }
        tracing::info!(
            agent = %id,
            portfolio = %agent.ledger().portfolio(),
            "terminating"
        );
        agent.report()
    });

    AgentHandle {
        id,
        stop_tx: Some(stop_tx),
        task,
    }
}
