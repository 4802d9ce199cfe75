//! Barter Agents - Autonomous producer/traders of the barter economy
//!
//! Every agent plays two roles at once:
//!
//! - **Seller**: answers calls for proposals with its current price and
//!   serves purchase orders from its own stock
//! - **Buyer**: on every tick, looks up the other sellers, asks them for the
//!   good it needs most and orders from the cheapest
//!
//! # Key Principle
//!
//! **An agent's ledger is touched only by the agent's own task.**
//!
//! Agents never share state. They talk through the message bus, find each
//! other through the directory and handle one input (a message or a tick) at
//! a time, which is what makes the seller's stock re-check sufficient to
//! rule out selling a unit twice.

pub mod agent;
pub mod bus;
pub mod directory;
pub mod driver;
pub mod negotiation;
pub mod runtime;
pub mod seller;

pub use agent::{AgentConfig, AgentError, AgentReport, EconomicAgent, OutcomeCounts, DEFAULT_TICK};
pub use bus::{InProcBus, Mailbox, Transport, TransportError};
pub use directory::{Directory, DiscoveryError, InMemoryDirectory};
pub use driver::{SessionPolicy, TradeCycleDriver};
pub use negotiation::{NegotiationOutcome, NegotiationSession, NegotiationState, Offer};
pub use runtime::{spawn_agent, AgentHandle};
pub use seller::{SellerResponder, SellerStats};

use barter_ledger::{Ledger, ProductionEngine};
use barter_types::AgentId;

/// What a protocol handler may touch while handling one input
pub struct TradeContext<'a> {
    pub me: &'a AgentId,
    pub ledger: &'a mut Ledger,
    pub production: &'a ProductionEngine,
    pub transport: &'a dyn Transport,
}
