//! Seller Responder - Answers quotes and purchase orders
//!
//! Two reactive handlers run against the agent's own ledger:
//! 1. Quote handler: `cfp` -> `propose` with the current price, or `refuse`
//! 2. Sale handler: `accept-proposal` -> re-check stock, settle, `inform`;
//!    or `failure` when the good sold out since it was quoted
//!
//! The stock re-check in the sale handler is what prevents selling the last
//! unit of a good twice: the agent processes one message at a time, so the
//! first order to arrive takes the unit and every later one fails.

use barter_types::{AclMessage, Basket, GoodId, MessageBody, RefusalReason};
use serde::{Deserialize, Serialize};

use crate::TradeContext;

/// Counters of seller-side decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStats {
    pub quotes_offered: u64,
    pub quotes_refused: u64,
    pub sales_completed: u64,
    pub sales_failed: u64,
}

/// The seller side of an agent
#[derive(Debug, Default)]
pub struct SellerResponder {
    stats: SellerStats,
}

impl SellerResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SellerStats {
        self.stats
    }

    /// Answer a call for proposals for `good`
    pub fn quote(&mut self, ctx: &mut TradeContext<'_>, request: &AclMessage, good: GoodId) {
        let body = if !ctx.ledger.catalog().contains(good) {
            self.stats.quotes_refused += 1;
            MessageBody::Refuse {
                reason: RefusalReason::UnknownGood,
            }
        } else if ctx.ledger.quantity(good) > 0 {
            self.stats.quotes_offered += 1;
            let price = ctx.ledger.price_of(good);
            tracing::debug!(
                agent = %ctx.me,
                buyer = %request.sender,
                good = ctx.ledger.catalog().name(good),
                price = %price.describe(ctx.ledger.catalog()),
                "quoting"
            );
            MessageBody::Propose { price }
        } else {
            self.stats.quotes_refused += 1;
            tracing::debug!(
                agent = %ctx.me,
                buyer = %request.sender,
                good = ctx.ledger.catalog().name(good),
                "nothing to quote"
            );
            MessageBody::Refuse {
                reason: RefusalReason::NotAvailable,
            }
        };

        ctx.transport.send(&request.create_reply(ctx.me, body));
    }

    /// Serve a purchase order for one unit of `good` paid with `price`
    pub fn sell(
        &mut self,
        ctx: &mut TradeContext<'_>,
        order: &AclMessage,
        good: GoodId,
        price: &Basket,
    ) {
        let body = if !ctx.ledger.catalog().contains(good) {
            self.stats.sales_failed += 1;
            MessageBody::Failure {
                reason: RefusalReason::UnknownGood,
            }
        } else if !ctx.ledger.catalog().fits(price) {
            self.stats.sales_failed += 1;
            tracing::warn!(
                agent = %ctx.me,
                buyer = %order.sender,
                entries = price.len(),
                goods = ctx.ledger.catalog().len(),
                "rejecting order with malformed price"
            );
            MessageBody::Failure {
                reason: RefusalReason::MalformedPrice,
            }
        } else if ctx.ledger.quantity(good) > 0 {
            ctx.ledger.settle_sale(good, price);
            self.stats.sales_completed += 1;
            tracing::info!(
                agent = %ctx.me,
                buyer = %order.sender,
                good = ctx.ledger.catalog().name(good),
                price = %price.describe(ctx.ledger.catalog()),
                "sold"
            );
            ctx.production.run(ctx.ledger);
            MessageBody::Inform { good }
        } else {
            self.stats.sales_failed += 1;
            tracing::info!(
                agent = %ctx.me,
                buyer = %order.sender,
                good = ctx.ledger.catalog().name(good),
                "sale failed, sold out since quoted"
            );
            MessageBody::Failure {
                reason: RefusalReason::NotAvailable,
            }
        };

        ctx.transport.send(&order.create_reply(ctx.me, body));
    }
}
