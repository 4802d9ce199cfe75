//! In-proc message bus between agents (pluggable later)
//!
//! Every agent owns one mailbox. Mailboxes are unbounded so that a send never
//! suspends the sending agent: two agents replying to each other can never
//! wait on one another's full mailbox.

use barter_types::{AclMessage, AgentId};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Receiving end of an agent's mailbox
pub type Mailbox = mpsc::UnboundedReceiver<AclMessage>;

/// Delivery errors, reported per recipient
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no mailbox registered for agent {agent}")]
    UnknownRecipient { agent: AgentId },

    #[error("mailbox of agent {agent} is closed")]
    MailboxClosed { agent: AgentId },
}

/// Outbound side of the message transport
pub trait Transport: Send + Sync {
    /// Deliver `message` to one recipient
    fn deliver(&self, recipient: &AgentId, message: AclMessage) -> Result<(), TransportError>;

    /// Deliver to every receiver of `message`, returning those that were reached
    ///
    /// Failed deliveries are logged and left out of the result.
    fn send(&self, message: &AclMessage) -> Vec<AgentId> {
        let mut reached = Vec::with_capacity(message.receivers.len());
        for receiver in &message.receivers {
            match self.deliver(receiver, message.for_receiver(receiver)) {
                Ok(()) => reached.push(receiver.clone()),
                Err(err) => tracing::warn!(
                    sender = %message.sender,
                    performative = %message.performative(),
                    error = %err,
                    "message not delivered"
                ),
            }
        }
        reached
    }
}

/// Mailbox registry for agents living in one process
#[derive(Default)]
pub struct InProcBus {
    mailboxes: DashMap<AgentId, mpsc::UnboundedSender<AclMessage>>,
}

impl InProcBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a mailbox for `agent`, replacing any previous one
    pub fn register(&self, agent: AgentId) -> Mailbox {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.mailboxes.insert(agent, sender);
        receiver
    }

    pub fn deregister(&self, agent: &AgentId) {
        self.mailboxes.remove(agent);
    }
}

impl Transport for InProcBus {
    fn deliver(&self, recipient: &AgentId, message: AclMessage) -> Result<(), TransportError> {
        let sender = self
            .mailboxes
            .get(recipient)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownRecipient {
                agent: recipient.clone(),
            })?;
        sender.send(message).map_err(|_| TransportError::MailboxClosed {
            agent: recipient.clone(),
        })
    }
}
