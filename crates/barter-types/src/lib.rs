//! Barter Types - Canonical domain types for the barter economy
//!
//! This crate contains the foundational types shared by every agent, with
//! zero dependencies on other barter crates:
//!
//! - Good catalog, good identifiers and per-good quantity vectors
//! - Linear production rules and the flat startup argument encoding
//! - Agent identities and correlation tokens
//! - ACL-style messages exchanged between agents
//!
//! # Market Invariants
//!
//! 1. The good catalog is closed and fixed for the lifetime of a market
//! 2. Every per-good vector is positional, in catalog order
//! 3. Quantities are never negative
//! 4. Agents only affect each other through messages

pub mod error;
pub mod goods;
pub mod identity;
pub mod message;
pub mod recipe;

pub use error::*;
pub use goods::*;
pub use identity::*;
pub use message::*;
pub use recipe::*;

/// Capability under which every agent advertises that it sells goods
pub const SELLER_CAPABILITY: &str = "good-selling";

/// Conversation id shared by every trade negotiation
pub const TRADE_CONVERSATION: &str = "good-trade";
