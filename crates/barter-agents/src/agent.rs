//! Economic Agent - Producer, seller and buyer in one
//!
//! An agent owns its ledger and everything that touches it: the production
//! engine, the seller responder and the pending negotiation sessions. It is
//! driven from outside by two inputs only, inbound messages and timer ticks,
//! and handles them one at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use barter_ledger::{
    Ledger, LedgerObserver, PriceTable, ProductionEngine, ProductionRun, TradeLog,
    DEFAULT_MAX_CYCLES,
};
use barter_types::{
    AclMessage, AgentId, AgentSpec, Basket, ConfigError, GoodCatalog, MessageBody,
    TRADE_CONVERSATION,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::bus::Transport;
use crate::directory::Directory;
use crate::driver::{SessionPolicy, TradeCycleDriver};
use crate::negotiation::{NegotiationOutcome, NegotiationSession};
use crate::seller::{SellerResponder, SellerStats};
use crate::TradeContext;

/// Delay between two buy attempts
pub const DEFAULT_TICK: Duration = Duration::from_millis(2000);

/// Errors that can occur starting or running an agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    TradeLog(#[from] barter_ledger::TradeLogError),

    #[error("agent task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Behaviour settings of an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Period of the trade cycle
    pub tick: Duration,
    /// Give up on sessions older than this; `None` waits forever
    pub session_timeout: Option<Duration>,
    pub session_policy: SessionPolicy,
    /// Cycle bound of a single production run
    pub max_production_cycles: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            session_timeout: None,
            session_policy: SessionPolicy::default(),
            max_production_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

/// Terminal outcomes of the agent's buy attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub success: u64,
    pub no_seller: u64,
    pub race_lost: u64,
    pub undeliverable: u64,
    pub timeout: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &NegotiationOutcome) {
        match outcome {
            NegotiationOutcome::Success { .. } => self.success += 1,
            NegotiationOutcome::FailedNoSeller => self.no_seller += 1,
            NegotiationOutcome::FailedRaceLost { .. } => self.race_lost += 1,
            NegotiationOutcome::FailedUndeliverable { .. } => self.undeliverable += 1,
            NegotiationOutcome::FailedTimeout => self.timeout += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.no_seller + self.race_lost + self.undeliverable + self.timeout
    }
}

/// Summary of an agent's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: AgentId,
    pub holdings: Basket,
    pub prices: PriceTable,
    pub outcomes: OutcomeCounts,
    pub seller: SellerStats,
    pub open_sessions: usize,
    pub trade_cycles: u64,
}

/// A barter economy agent
pub struct EconomicAgent {
    id: AgentId,
    ledger: Ledger,
    production: ProductionEngine,
    seller: SellerResponder,
    driver: TradeCycleDriver,
    sessions: Vec<NegotiationSession>,
    outcomes: OutcomeCounts,
    transport: Arc<dyn Transport>,
    config: AgentConfig,
}

impl EconomicAgent {
    /// Create an agent from decoded startup configuration
    pub fn new(
        id: AgentId,
        catalog: GoodCatalog,
        spec: AgentSpec,
        transport: Arc<dyn Transport>,
        config: AgentConfig,
    ) -> Self {
        let ledger = Ledger::from_spec(id.clone(), catalog, &spec);
        let production =
            ProductionEngine::new(spec.rule).with_max_cycles(config.max_production_cycles);
        Self {
            id,
            ledger,
            production,
            seller: SellerResponder::new(),
            driver: TradeCycleDriver::new(config.session_policy),
            sessions: Vec::new(),
            outcomes: OutcomeCounts::default(),
            transport,
            config,
        }
    }

    /// Create an agent from its flat `3 * N` argument list
    pub fn from_args<S: AsRef<str>>(
        id: AgentId,
        catalog: GoodCatalog,
        args: &[S],
        transport: Arc<dyn Transport>,
        config: AgentConfig,
    ) -> Result<Self> {
        let spec = AgentSpec::parse_args(&catalog, args).map_err(|err| {
            tracing::error!(
                agent = %id,
                goods = catalog.len(),
                error = %err,
                "write 3 x N numbers: N output coefficients, N input coefficients, \
                 N initial quantities"
            );
            err
        })?;
        Ok(Self::new(id, catalog, spec, transport, config))
    }

    pub fn add_observer(&mut self, observer: Box<dyn LedgerObserver>) {
        self.ledger.add_observer(observer);
    }

    /// Open `agent_<name>_log.txt` in `dir` and record every snapshot there
    pub fn open_trade_log(&mut self, dir: &Path) -> Result<PathBuf> {
        let log = TradeLog::create(dir, &self.id, self.ledger.catalog())?;
        let path = log.path().to_path_buf();
        self.ledger.add_observer(Box::new(log));
        Ok(path)
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn sessions(&self) -> &[NegotiationSession] {
        &self.sessions
    }

    pub fn outcomes(&self) -> OutcomeCounts {
        self.outcomes
    }

    pub fn seller_stats(&self) -> SellerStats {
        self.seller.stats()
    }

    /// Announce the configuration, publish the opening ledger and produce
    pub fn setup(&mut self) -> ProductionRun {
        let catalog = self.ledger.catalog().clone();
        tracing::info!(
            agent = %self.id,
            rule = %self.production.rule().describe(&catalog),
            "production rule"
        );
        tracing::info!(
            agent = %self.id,
            prices = %self.ledger.price_table().describe(&catalog),
            "initial prices"
        );
        tracing::info!(agent = %self.id, portfolio = %self.ledger.portfolio(), "initial portfolio");
        let rule = self.production.rule();
        if !rule.is_inert() && !rule.needs_inputs() {
            tracing::warn!(
                agent = %self.id,
                max_cycles = self.config.max_production_cycles,
                "production rule consumes nothing, every run stops at the cycle bound"
            );
        }

        self.ledger.publish();
        self.production.run(&mut self.ledger)
    }

    /// Handle one inbound message
    pub fn handle_message(&mut self, message: AclMessage) {
        if message.conversation_id != TRADE_CONVERSATION {
            tracing::debug!(
                agent = %self.id,
                conversation = %message.conversation_id,
                "ignoring message outside the trade conversation"
            );
            return;
        }

        let mut ctx = TradeContext {
            me: &self.id,
            ledger: &mut self.ledger,
            production: &self.production,
            transport: self.transport.as_ref(),
        };

        match &message.body {
            MessageBody::CallForProposal { good } => self.seller.quote(&mut ctx, &message, *good),
            MessageBody::AcceptProposal { good, price } => {
                self.seller.sell(&mut ctx, &message, *good, price)
            }
            MessageBody::Propose { .. }
            | MessageBody::Refuse { .. }
            | MessageBody::Inform { .. }
            | MessageBody::Failure { .. } => {
                let matched = self
                    .sessions
                    .iter_mut()
                    .position(|session| session.on_reply(&mut ctx, &message));
                match matched {
                    Some(index) if self.sessions[index].is_finished() => {
                        let session = self.sessions.remove(index);
                        if let Some(outcome) = session.outcome() {
                            self.outcomes.record(outcome);
                        }
                    }
                    Some(_) => {}
                    None => tracing::debug!(
                        agent = %self.id,
                        from = %message.sender,
                        performative = %message.performative(),
                        "discarding stale reply"
                    ),
                }
            }
        }
    }

    /// One trade cycle: expire, rediscover sellers, launch a buy attempt
    pub async fn on_tick(&mut self, directory: &dyn Directory) {
        if let Some(timeout) = self.config.session_timeout {
            self.expire_sessions(timeout, Instant::now());
        }

        let sellers = self.driver.find_sellers(&self.id, directory).await.to_vec();
        if self.driver.should_launch(self.sessions.len()) {
            self.launch_negotiation(sellers);
        } else {
            tracing::debug!(
                agent = %self.id,
                pending = self.sessions.len(),
                "previous attempt still pending, skipping"
            );
        }
    }

    /// Start a buy attempt against `sellers`
    pub fn launch_negotiation(&mut self, sellers: Vec<AgentId>) {
        let mut ctx = TradeContext {
            me: &self.id,
            ledger: &mut self.ledger,
            production: &self.production,
            transport: self.transport.as_ref(),
        };
        let session = NegotiationSession::start(&mut ctx, sellers);
        match session.outcome() {
            Some(outcome) => self.outcomes.record(outcome),
            None => self.sessions.push(session),
        }
    }

    /// End every session older than `timeout`
    pub fn expire_sessions(&mut self, timeout: Duration, now: Instant) {
        let mut ctx = TradeContext {
            me: &self.id,
            ledger: &mut self.ledger,
            production: &self.production,
            transport: self.transport.as_ref(),
        };
        let outcomes = &mut self.outcomes;
        self.sessions.retain_mut(|session| {
            if !session.is_expired(timeout, now) {
                return true;
            }
            session.expire(&mut ctx);
            if let Some(outcome) = session.outcome() {
                outcomes.record(outcome);
            }
            false
        });
    }

    pub fn report(&self) -> AgentReport {
        AgentReport {
            agent: self.id.clone(),
            holdings: self.ledger.holdings().clone(),
            prices: self.ledger.price_table().clone(),
            outcomes: self.outcomes,
            seller: self.seller.stats(),
            open_sessions: self.sessions.len(),
            trade_cycles: self.driver.cycles(),
        }
    }
}
