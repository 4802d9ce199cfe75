//! Negotiation Protocol - One buy attempt, from call for proposals to settlement
//!
//! A session walks through:
//!
//! ```text
//! SELECT_TARGET -> BROADCAST -> COLLECT -> CONFIRM -> AWAIT_RESULT -> finished
//! ```
//!
//! SELECT_TARGET, BROADCAST and CONFIRM run to completion immediately; the
//! session only ever suspends in COLLECT and AWAIT_RESULT, waiting for replies
//! tagged with the token of the current round. Replies are matched by token
//! alone, so they may arrive in any order and interleave with the replies of
//! other sessions.

use std::collections::HashSet;
use std::time::Duration;

use barter_ledger::Ledger;
use barter_types::{
    AclMessage, AgentId, Basket, CorrelationId, GoodId, MessageBody, ProductionRule,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::TradeContext;

/// A seller's quote for one unit of the target good
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub seller: AgentId,
    pub price: Basket,
    /// Aggregate scalar price: sum of the price vector
    pub total: u64,
}

impl Offer {
    pub fn new(seller: AgentId, price: Basket) -> Self {
        let total = price.total();
        Self { seller, price, total }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationOutcome {
    /// One unit bought from `seller` at `price`
    Success { seller: AgentId, price: Basket },
    /// No seller, or no seller had the good
    FailedNoSeller,
    /// The chosen seller sold out between quote and order
    FailedRaceLost { seller: AgentId },
    /// The purchase order could not be delivered
    FailedUndeliverable { seller: AgentId },
    /// The session outlived the configured wait
    FailedTimeout,
}

impl NegotiationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NegotiationOutcome::Success { .. })
    }
}

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Waiting for quotes
    Collecting,
    /// Waiting for the chosen seller to confirm
    AwaitingResult,
    Finished,
}

#[derive(Debug)]
enum Phase {
    Collecting {
        token: CorrelationId,
        pending: HashSet<AgentId>,
        best: Option<Offer>,
    },
    AwaitingResult {
        token: CorrelationId,
        offer: Offer,
    },
    Finished(NegotiationOutcome),
}

/// One buy attempt of one agent
#[derive(Debug)]
pub struct NegotiationSession {
    target: GoodId,
    sellers: Vec<AgentId>,
    phase: Phase,
    started_at: Instant,
}

impl NegotiationSession {
    /// SELECT_TARGET: the good the agent cannot produce and holds least of
    ///
    /// Starts from the reference good and moves to any good with a zero
    /// output coefficient held in strictly smaller quantity.
    pub fn select_target(rule: &ProductionRule, ledger: &Ledger) -> GoodId {
        let catalog = ledger.catalog();
        let mut target = catalog.reference();
        for good in catalog.goods() {
            if !rule.produces(good) && ledger.quantity(good) < ledger.quantity(target) {
                target = good;
            }
        }
        target
    }

    /// Start a session for the good the agent needs most
    pub fn start(ctx: &mut TradeContext<'_>, sellers: Vec<AgentId>) -> Self {
        let target = Self::select_target(ctx.production.rule(), ctx.ledger);
        Self::start_for(ctx, target, sellers)
    }

    /// BROADCAST a call for proposals for `target` to every seller
    pub fn start_for(ctx: &mut TradeContext<'_>, target: GoodId, sellers: Vec<AgentId>) -> Self {
        let mut session = Self {
            target,
            sellers,
            phase: Phase::Finished(NegotiationOutcome::FailedNoSeller),
            started_at: Instant::now(),
        };
        tracing::info!(
            agent = %ctx.me,
            good = ctx.ledger.catalog().name(target),
            sellers = session.sellers.len(),
            "wants"
        );

        if session.sellers.is_empty() {
            session.finish(ctx, NegotiationOutcome::FailedNoSeller);
            return session;
        }

        let token = CorrelationId::call_for_proposals();
        let cfp = AclMessage::new(ctx.me.clone(), MessageBody::CallForProposal { good: target })
            .to_all(session.sellers.iter().cloned())
            .with_reply_with(token.clone());
        let reached = ctx.transport.send(&cfp);

        if reached.is_empty() {
            session.finish(ctx, NegotiationOutcome::FailedNoSeller);
            return session;
        }

        session.phase = Phase::Collecting {
            token,
            pending: reached.into_iter().collect(),
            best: None,
        };
        session
    }

    pub fn target(&self) -> GoodId {
        self.target
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn state(&self) -> NegotiationState {
        match self.phase {
            Phase::Collecting { .. } => NegotiationState::Collecting,
            Phase::AwaitingResult { .. } => NegotiationState::AwaitingResult,
            Phase::Finished(_) => NegotiationState::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn outcome(&self) -> Option<&NegotiationOutcome> {
        match &self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Token of the round the session is waiting on
    pub fn awaiting(&self) -> Option<&CorrelationId> {
        match &self.phase {
            Phase::Collecting { token, .. } | Phase::AwaitingResult { token, .. } => Some(token),
            Phase::Finished(_) => None,
        }
    }

    /// Best quote received so far
    pub fn best_offer(&self) -> Option<&Offer> {
        match &self.phase {
            Phase::Collecting { best, .. } => best.as_ref(),
            Phase::AwaitingResult { offer, .. } => Some(offer),
            Phase::Finished(_) => None,
        }
    }

    /// Feed a reply to the session
    ///
    /// Returns `false` when the reply does not carry the token of the current
    /// round, so the caller can offer it to another session.
    pub fn on_reply(&mut self, ctx: &mut TradeContext<'_>, reply: &AclMessage) -> bool {
        match &mut self.phase {
            Phase::Collecting {
                token,
                pending,
                best,
            } => {
                if !reply.is_reply_to(token) {
                    return false;
                }
                if !pending.remove(&reply.sender) {
                    tracing::debug!(
                        agent = %ctx.me,
                        from = %reply.sender,
                        "discarding duplicate or unsolicited quote"
                    );
                    return true;
                }

                match &reply.body {
                    MessageBody::Propose { price } if !ctx.ledger.catalog().fits(price) => {
                        tracing::warn!(
                            agent = %ctx.me,
                            seller = %reply.sender,
                            entries = price.len(),
                            goods = ctx.ledger.catalog().len(),
                            "treating malformed quote as a refusal"
                        );
                    }
                    MessageBody::Propose { price } => {
                        let offer = Offer::new(reply.sender.clone(), price.clone());
                        tracing::debug!(
                            agent = %ctx.me,
                            seller = %offer.seller,
                            total = offer.total,
                            "quote received"
                        );
                        // strictly cheaper only: the first of equal quotes wins
                        if best.as_ref().map_or(true, |current| offer.total < current.total) {
                            *best = Some(offer);
                        }
                    }
                    MessageBody::Refuse { reason } => {
                        tracing::debug!(
                            agent = %ctx.me,
                            seller = %reply.sender,
                            reason = %reason,
                            "quote refused"
                        );
                    }
                    other => {
                        tracing::debug!(
                            agent = %ctx.me,
                            seller = %reply.sender,
                            performative = %other.performative(),
                            "unexpected reply to call for proposals"
                        );
                    }
                }

                if pending.is_empty() {
                    self.confirm(ctx);
                }
                true
            }
            Phase::AwaitingResult { token, offer } => {
                if !reply.is_reply_to(token) {
                    return false;
                }
                if reply.sender != offer.seller {
                    tracing::debug!(
                        agent = %ctx.me,
                        from = %reply.sender,
                        "discarding order reply from another agent"
                    );
                    return true;
                }

                match &reply.body {
                    MessageBody::Inform { .. } => {
                        let offer = offer.clone();
                        let paid = ctx.ledger.settle_purchase(self.target, &offer.price);
                        if paid != offer.price {
                            tracing::warn!(
                                agent = %ctx.me,
                                owed = %offer.price.describe(ctx.ledger.catalog()),
                                paid = %paid.describe(ctx.ledger.catalog()),
                                "payment clamped by insufficient holdings"
                            );
                        }
                        ctx.production.run(ctx.ledger);
                        self.finish(
                            ctx,
                            NegotiationOutcome::Success {
                                seller: offer.seller,
                                price: offer.price,
                            },
                        );
                    }
                    MessageBody::Failure { .. } | MessageBody::Refuse { .. } => {
                        let seller = offer.seller.clone();
                        self.finish(ctx, NegotiationOutcome::FailedRaceLost { seller });
                    }
                    other => {
                        tracing::debug!(
                            agent = %ctx.me,
                            performative = %other.performative(),
                            "unexpected reply to purchase order"
                        );
                    }
                }
                true
            }
            Phase::Finished(_) => false,
        }
    }

    /// Whether the session has waited longer than `timeout`
    pub fn is_expired(&self, timeout: Duration, now: Instant) -> bool {
        !self.is_finished() && now.saturating_duration_since(self.started_at) >= timeout
    }

    /// End a waiting session in FAILED_TIMEOUT
    pub fn expire(&mut self, ctx: &mut TradeContext<'_>) {
        if self.is_finished() {
            return;
        }
        if let Phase::AwaitingResult { offer, .. } = &self.phase {
            tracing::warn!(
                agent = %ctx.me,
                seller = %offer.seller,
                "giving up on an outstanding purchase order"
            );
        }
        self.finish(ctx, NegotiationOutcome::FailedTimeout);
    }

    /// CONFIRM: order from the best seller, if any
    fn confirm(&mut self, ctx: &mut TradeContext<'_>) {
        let best = match &mut self.phase {
            Phase::Collecting { best, .. } => best.take(),
            _ => return,
        };
        let Some(offer) = best else {
            self.finish(ctx, NegotiationOutcome::FailedNoSeller);
            return;
        };

        let token = CorrelationId::order();
        let order = AclMessage::new(
            ctx.me.clone(),
            MessageBody::AcceptProposal {
                good: self.target,
                price: offer.price.clone(),
            },
        )
        .to(offer.seller.clone())
        .with_reply_with(token.clone());

        if ctx.transport.send(&order).is_empty() {
            let seller = offer.seller;
            self.finish(ctx, NegotiationOutcome::FailedUndeliverable { seller });
            return;
        }

        tracing::info!(
            agent = %ctx.me,
            seller = %offer.seller,
            good = ctx.ledger.catalog().name(self.target),
            price = %offer.price.describe(ctx.ledger.catalog()),
            "ordering"
        );
        self.phase = Phase::AwaitingResult { token, offer };
    }

    fn finish(&mut self, ctx: &TradeContext<'_>, outcome: NegotiationOutcome) {
        let good = ctx.ledger.catalog().name(self.target);
        match &outcome {
            NegotiationOutcome::Success { seller, price } => tracing::info!(
                agent = %ctx.me,
                seller = %seller,
                good,
                price = %price.describe(ctx.ledger.catalog()),
                "bought"
            ),
            NegotiationOutcome::FailedNoSeller => {
                tracing::info!(agent = %ctx.me, good, "attempt failed: not available for sale")
            }
            NegotiationOutcome::FailedRaceLost { seller } => tracing::info!(
                agent = %ctx.me,
                seller = %seller,
                good,
                "attempt failed: already sold"
            ),
            NegotiationOutcome::FailedUndeliverable { seller } => tracing::warn!(
                agent = %ctx.me,
                seller = %seller,
                good,
                "attempt failed: order not delivered"
            ),
            NegotiationOutcome::FailedTimeout => {
                tracing::warn!(agent = %ctx.me, good, "attempt failed: timed out")
            }
        }
        self.phase = Phase::Finished(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InProcBus, Mailbox, Transport};
    use barter_ledger::{PriceTable, ProductionEngine};
    use barter_types::{GoodCatalog, Performative, RefusalReason};

    const GRAIN: GoodId = GoodId(0);
    const BREAD: GoodId = GoodId(1);

    struct Buyer {
        me: AgentId,
        ledger: Ledger,
        production: ProductionEngine,
        bus: InProcBus,
    }

    impl Buyer {
        /// Baker: 1 BREAD = 2 GRAIN
        fn baker(grain: u64, bread: u64) -> Self {
            let catalog = GoodCatalog::new(["GRAIN", "BREAD"]).unwrap();
            let rule = ProductionRule::new(Basket::from(vec![0, 1]), Basket::from(vec![2, 0]));
            let me = AgentId::from("baker");
            Self {
                ledger: Ledger::new(
                    me.clone(),
                    catalog.clone(),
                    Basket::from(vec![grain, bread]),
                    PriceTable::from_rule(&catalog, &rule),
                ),
                production: ProductionEngine::new(rule),
                bus: InProcBus::new(),
                me,
            }
        }

        fn ctx(&mut self) -> TradeContext<'_> {
            TradeContext {
                me: &self.me,
                ledger: &mut self.ledger,
                production: &self.production,
                transport: &self.bus,
            }
        }

        fn start(&mut self, sellers: &[&str]) -> NegotiationSession {
            let sellers = sellers.iter().map(|name| AgentId::from(*name)).collect();
            NegotiationSession::start(&mut self.ctx(), sellers)
        }

        fn feed(&mut self, session: &mut NegotiationSession, reply: AclMessage) -> bool {
            session.on_reply(&mut self.ctx(), &reply)
        }
    }

    fn answer(request: &AclMessage, seller: &str, body: MessageBody) -> AclMessage {
        request.create_reply(&AgentId::from(seller), body)
    }

    fn propose(price: Vec<u64>) -> MessageBody {
        MessageBody::Propose {
            price: Basket::from(price),
        }
    }

    fn refuse() -> MessageBody {
        MessageBody::Refuse {
            reason: RefusalReason::NotAvailable,
        }
    }

    #[test]
    fn test_select_target_prefers_scarce_unproduced_good() {
        let catalog = GoodCatalog::standard(); // BREAD, GRAIN, LAND
        let rule = ProductionRule::new(Basket::from(vec![1, 0, 0]), Basket::from(vec![0, 2, 1]));
        let ledger = Ledger::new(
            AgentId::from("baker"),
            catalog.clone(),
            Basket::from(vec![9, 4, 1]),
            PriceTable::zeros(&catalog),
        );
        assert_eq!(NegotiationSession::select_target(&rule, &ledger), GoodId(2));

        // ties keep the earlier good; the reference good is kept when nothing is scarcer
        let ledger = Ledger::new(
            AgentId::from("baker"),
            catalog.clone(),
            Basket::from(vec![0, 3, 3]),
            PriceTable::zeros(&catalog),
        );
        assert_eq!(NegotiationSession::select_target(&rule, &ledger), GoodId(0));
    }

    #[test]
    fn test_no_sellers_fails_without_messages() {
        let mut buyer = Buyer::baker(0, 0);
        let session = buyer.start(&[]);

        assert_eq!(session.outcome(), Some(&NegotiationOutcome::FailedNoSeller));
        assert!(session.awaiting().is_none());
    }

    #[test]
    fn test_unreachable_sellers_fail_as_no_seller() {
        let mut buyer = Buyer::baker(0, 0);
        let session = buyer.start(&["ghost"]);
        assert_eq!(session.outcome(), Some(&NegotiationOutcome::FailedNoSeller));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_seller() {
        let mut buyer = Buyer::baker(0, 3);
        let mut farmer = buyer.bus.register(AgentId::from("farmer"));
        let mut miller = buyer.bus.register(AgentId::from("miller"));

        let session = buyer.start(&["farmer", "miller"]);

        assert_eq!(session.state(), NegotiationState::Collecting);
        assert_eq!(session.target(), GRAIN);
        for mailbox in [&mut farmer, &mut miller] {
            let cfp = mailbox.recv().await.unwrap();
            assert_eq!(cfp.body, MessageBody::CallForProposal { good: GRAIN });
            assert_eq!(cfp.reply_with.as_ref(), session.awaiting());
        }
    }

    async fn collect(
        buyer: &mut Buyer,
        session: &mut NegotiationSession,
        mailboxes: &mut [(&str, &mut Mailbox)],
        totals: &[u64],
    ) {
        for ((name, mailbox), total) in mailboxes.iter_mut().zip(totals) {
            let cfp = mailbox.recv().await.unwrap();
            let reply = answer(&cfp, name, propose(vec![0, *total]));
            assert!(buyer.feed(session, reply));
        }
    }

    #[tokio::test]
    async fn test_tie_break_later_cheaper_offer_wins() {
        let mut buyer = Buyer::baker(0, 9);
        let mut a = buyer.bus.register(AgentId::from("a"));
        let mut b = buyer.bus.register(AgentId::from("b"));
        let mut c = buyer.bus.register(AgentId::from("c"));
        let mut session = buyer.start(&["a", "b", "c"]);

        collect(
            &mut buyer,
            &mut session,
            &mut [("a", &mut a), ("b", &mut b), ("c", &mut c)],
            &[5, 5, 4],
        )
        .await;

        assert_eq!(session.state(), NegotiationState::AwaitingResult);
        assert_eq!(session.best_offer().unwrap().seller, AgentId::from("c"));
        let order = c.recv().await.unwrap();
        assert_eq!(order.performative(), Performative::AcceptProposal);
    }

    #[tokio::test]
    async fn test_tie_break_first_of_equal_offers_wins() {
        let mut buyer = Buyer::baker(0, 9);
        let mut a = buyer.bus.register(AgentId::from("a"));
        let mut b = buyer.bus.register(AgentId::from("b"));
        let mut c = buyer.bus.register(AgentId::from("c"));
        let mut session = buyer.start(&["a", "b", "c"]);

        collect(
            &mut buyer,
            &mut session,
            &mut [("a", &mut a), ("b", &mut b), ("c", &mut c)],
            &[5, 4, 4],
        )
        .await;

        assert_eq!(session.best_offer().unwrap().seller, AgentId::from("b"));
        assert_eq!(session.best_offer().unwrap().total, 4);
    }

    #[tokio::test]
    async fn test_all_refusals_fail_as_no_seller() {
        let mut buyer = Buyer::baker(0, 0);
        let prices = buyer.ledger.price_table().clone();
        let mut a = buyer.bus.register(AgentId::from("a"));
        let mut b = buyer.bus.register(AgentId::from("b"));
        let mut session = buyer.start(&["a", "b"]);

        let cfp_b = b.recv().await.unwrap();
        assert!(buyer.feed(&mut session, answer(&cfp_b, "b", refuse())));
        assert_eq!(session.state(), NegotiationState::Collecting);

        let cfp_a = a.recv().await.unwrap();
        assert!(buyer.feed(&mut session, answer(&cfp_a, "a", refuse())));
        assert_eq!(session.outcome(), Some(&NegotiationOutcome::FailedNoSeller));
        assert_eq!(buyer.ledger.price_table(), &prices);
        assert_eq!(buyer.ledger.revision(), 0);
    }

    #[tokio::test]
    async fn test_malformed_quotes_count_as_refusals() {
        let mut buyer = Buyer::baker(0, 9);
        let mut a = buyer.bus.register(AgentId::from("a"));
        let mut b = buyer.bus.register(AgentId::from("b"));
        let mut c = buyer.bus.register(AgentId::from("c"));
        let mut session = buyer.start(&["a", "b", "c"]);

        let cfp_a = a.recv().await.unwrap();
        assert!(buyer.feed(&mut session, answer(&cfp_a, "a", propose(vec![0]))));
        let cfp_b = b.recv().await.unwrap();
        assert!(buyer.feed(&mut session, answer(&cfp_b, "b", propose(vec![0, 0, 1]))));
        assert!(session.best_offer().is_none());

        let cfp_c = c.recv().await.unwrap();
        assert!(buyer.feed(&mut session, answer(&cfp_c, "c", propose(vec![0, 3]))));

        assert_eq!(session.state(), NegotiationState::AwaitingResult);
        assert_eq!(session.best_offer().unwrap().seller, AgentId::from("c"));
    }

    #[tokio::test]
    async fn test_only_malformed_quotes_fail_as_no_seller() {
        let mut buyer = Buyer::baker(0, 9);
        let mut a = buyer.bus.register(AgentId::from("a"));
        let mut session = buyer.start(&["a"]);

        let cfp = a.recv().await.unwrap();
        buyer.feed(&mut session, answer(&cfp, "a", propose(vec![1])));

        assert_eq!(session.outcome(), Some(&NegotiationOutcome::FailedNoSeller));
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_and_duplicate_replies_are_discarded() {
        let mut buyer = Buyer::baker(0, 9);
        let mut a = buyer.bus.register(AgentId::from("a"));
        let _b = buyer.bus.register(AgentId::from("b"));
        let mut session = buyer.start(&["a", "b"]);
        let cfp = a.recv().await.unwrap();

        // another round's token: not ours
        let mut stale = answer(&cfp, "a", propose(vec![0, 1]));
        stale.in_reply_to = Some(CorrelationId::call_for_proposals());
        assert!(!buyer.feed(&mut session, stale));

        // first reply from a counts, the duplicate and an unsolicited one do not
        assert!(buyer.feed(&mut session, answer(&cfp, "a", propose(vec![0, 3]))));
        assert!(buyer.feed(&mut session, answer(&cfp, "a", propose(vec![0, 1]))));
        assert!(buyer.feed(&mut session, answer(&cfp, "z", propose(vec![0, 0]))));

        assert_eq!(session.state(), NegotiationState::Collecting);
        assert_eq!(session.best_offer().unwrap().total, 3);
    }

    #[tokio::test]
    async fn test_confirmed_purchase_settles_and_produces() {
        // 1 GRAIN held, 2 BREAD to pay with
        let mut buyer = Buyer::baker(1, 2);
        let mut farmer = buyer.bus.register(AgentId::from("farmer"));
        let mut session = buyer.start(&["farmer"]);

        let cfp = farmer.recv().await.unwrap();
        buyer.feed(&mut session, answer(&cfp, "farmer", propose(vec![0, 1])));
        let order = farmer.recv().await.unwrap();
        assert_eq!(
            order.body,
            MessageBody::AcceptProposal {
                good: GRAIN,
                price: Basket::from(vec![0, 1]),
            }
        );

        let inform = answer(&order, "farmer", MessageBody::Inform { good: GRAIN });
        assert!(buyer.feed(&mut session, inform));

        assert!(session.outcome().unwrap().is_success());
        // GRAIN 1 + 1 = 2, BREAD 2 - 1 = 1, then one cycle: GRAIN 0, BREAD 2
        assert_eq!(buyer.ledger.quantity(GRAIN), 0);
        assert_eq!(buyer.ledger.quantity(BREAD), 2);
        assert_eq!(buyer.ledger.price_of(GRAIN), Basket::from(vec![0, 1]));
    }

    #[tokio::test]
    async fn test_race_lost_leaves_ledger_untouched() {
        let mut buyer = Buyer::baker(0, 3);
        let mut farmer = buyer.bus.register(AgentId::from("farmer"));
        let mut session = buyer.start(&["farmer"]);

        let cfp = farmer.recv().await.unwrap();
        buyer.feed(&mut session, answer(&cfp, "farmer", propose(vec![0, 1])));
        let order = farmer.recv().await.unwrap();

        // a failure from another agent is ignored
        let foreign = answer(
            &order,
            "miller",
            MessageBody::Failure {
                reason: RefusalReason::NotAvailable,
            },
        );
        assert!(buyer.feed(&mut session, foreign));
        assert_eq!(session.state(), NegotiationState::AwaitingResult);

        let failure = answer(
            &order,
            "farmer",
            MessageBody::Failure {
                reason: RefusalReason::NotAvailable,
            },
        );
        assert!(buyer.feed(&mut session, failure));

        assert_eq!(
            session.outcome(),
            Some(&NegotiationOutcome::FailedRaceLost {
                seller: AgentId::from("farmer")
            })
        );
        assert_eq!(buyer.ledger.holdings(), &Basket::from(vec![0, 3]));
        assert!(buyer.ledger.price_of(GRAIN).is_zero());
    }

    #[tokio::test]
    async fn test_undeliverable_order() {
        let mut buyer = Buyer::baker(0, 3);
        let mut farmer = buyer.bus.register(AgentId::from("farmer"));
        let mut session = buyer.start(&["farmer"]);
        let cfp = farmer.recv().await.unwrap();

        buyer.bus.deregister(&AgentId::from("farmer"));
        buyer.feed(&mut session, answer(&cfp, "farmer", propose(vec![0, 1])));

        assert_eq!(
            session.outcome(),
            Some(&NegotiationOutcome::FailedUndeliverable {
                seller: AgentId::from("farmer")
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let mut buyer = Buyer::baker(0, 3);
        let _farmer = buyer.bus.register(AgentId::from("farmer"));
        let mut session = buyer.start(&["farmer"]);
        let timeout = Duration::from_secs(5);

        assert!(!session.is_expired(timeout, Instant::now()));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(session.is_expired(timeout, Instant::now()));

        session.expire(&mut buyer.ctx());
        assert_eq!(session.outcome(), Some(&NegotiationOutcome::FailedTimeout));
        assert!(!session.is_expired(timeout, Instant::now()));
    }

    #[test]
    fn test_transport_trait_object_is_usable() {
        let bus = InProcBus::new();
        let transport: &dyn Transport = &bus;
        let message = AclMessage::new(AgentId::from("baker"), refuse()).to(AgentId::from("ghost"));
        assert!(transport.send(&message).is_empty());
    }
}
