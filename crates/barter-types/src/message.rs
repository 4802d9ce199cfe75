//! ACL-style messages exchanged between agents
//!
//! Every negotiation runs on the [`TRADE_CONVERSATION`] conversation. Requests
//! carry a fresh `reply_with` token and replies echo it in `in_reply_to`, so a
//! buyer matches replies by token, never by arrival order or sender alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goods::{Basket, GoodId};
use crate::identity::{AgentId, CorrelationId};
use crate::TRADE_CONVERSATION;

/// Communicative act of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Performative {
    /// Call for proposals: "quote me one unit of this good"
    Cfp,
    /// Quote: the good is available at this price vector
    Propose,
    /// Quote refused
    Refuse,
    /// Purchase order for a quoted good
    AcceptProposal,
    /// Purchase confirmed
    Inform,
    /// Purchase failed
    Failure,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Performative::Cfp => "cfp",
            Performative::Propose => "propose",
            Performative::Refuse => "refuse",
            Performative::AcceptProposal => "accept-proposal",
            Performative::Inform => "inform",
            Performative::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// Why a seller refused a quote or failed a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefusalReason {
    /// The seller holds none of the good
    NotAvailable,
    /// The good is not part of the seller's catalog
    UnknownGood,
    /// The price vector does not have one entry per good
    MalformedPrice,
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefusalReason::NotAvailable => f.write_str("not-available"),
            RefusalReason::UnknownGood => f.write_str("unknown-good"),
            RefusalReason::MalformedPrice => f.write_str("malformed-price"),
        }
    }
}

/// Typed payload of a message; the variant determines the performative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "performative", rename_all = "kebab-case")]
pub enum MessageBody {
    CallForProposal { good: GoodId },
    Propose { price: Basket },
    Refuse { reason: RefusalReason },
    AcceptProposal { good: GoodId, price: Basket },
    Inform { good: GoodId },
    Failure { reason: RefusalReason },
}

impl MessageBody {
    pub fn performative(&self) -> Performative {
        match self {
            MessageBody::CallForProposal { .. } => Performative::Cfp,
            MessageBody::Propose { .. } => Performative::Propose,
            MessageBody::Refuse { .. } => Performative::Refuse,
            MessageBody::AcceptProposal { .. } => Performative::AcceptProposal,
            MessageBody::Inform { .. } => Performative::Inform,
            MessageBody::Failure { .. } => Performative::Failure,
        }
    }
}

/// A message in flight between agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclMessage {
    pub sender: AgentId,
    pub receivers: Vec<AgentId>,
    pub conversation_id: String,
    pub reply_with: Option<CorrelationId>,
    pub in_reply_to: Option<CorrelationId>,
    pub body: MessageBody,
}

impl AclMessage {
    /// New message on the trade conversation, with no receivers yet
    pub fn new(sender: AgentId, body: MessageBody) -> Self {
        Self {
            sender,
            receivers: Vec::new(),
            conversation_id: TRADE_CONVERSATION.to_string(),
            reply_with: None,
            in_reply_to: None,
            body,
        }
    }

    pub fn to(mut self, receiver: AgentId) -> Self {
        self.receivers.push(receiver);
        self
    }

    pub fn to_all(mut self, receivers: impl IntoIterator<Item = AgentId>) -> Self {
        self.receivers.extend(receivers);
        self
    }

    pub fn with_reply_with(mut self, token: CorrelationId) -> Self {
        self.reply_with = Some(token);
        self
    }

    pub fn performative(&self) -> Performative {
        self.body.performative()
    }

    /// Reply addressed to this message's sender, echoing its token
    pub fn create_reply(&self, from: &AgentId, body: MessageBody) -> AclMessage {
        AclMessage {
            sender: from.clone(),
            receivers: vec![self.sender.clone()],
            conversation_id: self.conversation_id.clone(),
            reply_with: None,
            in_reply_to: self.reply_with.clone(),
            body,
        }
    }

    /// Whether this message answers the request tagged with `token`
    pub fn is_reply_to(&self, token: &CorrelationId) -> bool {
        self.conversation_id == TRADE_CONVERSATION && self.in_reply_to.as_ref() == Some(token)
    }

    /// Copy of this message addressed to a single receiver
    pub fn for_receiver(&self, receiver: &AgentId) -> AclMessage {
        AclMessage {
            receivers: vec![receiver.clone()],
            ..self.clone()
        }
    }
}
