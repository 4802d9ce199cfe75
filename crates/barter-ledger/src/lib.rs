//! Barter Ledger - Goods holdings and barter prices of one agent
//!
//! The ledger is:
//! - Owned by exactly one agent (never shared across agents)
//! - Catalog-scoped (one quantity and one price row per good)
//! - Clamped (no quantity ever goes below zero)
//! - Observable (every published mutation reaches the snapshot observers)
//!
//! # Invariants
//!
//! 1. No negative quantities: an over-debit clamps at zero and is logged
//! 2. A settlement is published once, after all of its credits and debits
//! 3. A price row changes only when its good is bought or sold

pub mod observer;
pub mod production;

pub use observer::*;
pub use production::*;

use std::fmt;

use barter_types::{AgentId, AgentSpec, Basket, GoodCatalog, GoodId, ProductionRule};
use serde::{Deserialize, Serialize};

/// Barter prices: for each sold good, the units of every good asked in return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    rows: Vec<Basket>,
}

impl PriceTable {
    /// All-zero prices
    pub fn zeros(catalog: &GoodCatalog) -> Self {
        Self {
            rows: catalog.goods().map(|_| catalog.zeros()).collect(),
        }
    }

    /// Production-cost prices: every good the rule produces is priced at the
    /// rule's inputs; every other good starts at zero
    pub fn from_rule(catalog: &GoodCatalog, rule: &ProductionRule) -> Self {
        let rows = catalog
            .goods()
            .map(|good| {
                if rule.produces(good) {
                    let mut row = catalog.zeros();
                    for (input, q) in rule.input.iter() {
                        row.set(input, q);
                    }
                    row
                } else {
                    catalog.zeros()
                }
            })
            .collect();
        Self { rows }
    }

    pub fn get(&self, good: GoodId) -> Option<&Basket> {
        self.rows.get(good.index())
    }

    pub fn set(&mut self, good: GoodId, price: Basket) {
        if let Some(row) = self.rows.get_mut(good.index()) {
            *row = price;
        }
    }

    /// One `GOOD: price` line per good with a non-zero price
    pub fn describe(&self, catalog: &GoodCatalog) -> String {
        let lines: Vec<String> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_zero())
            .map(|(i, row)| format!("{}: {}", catalog.name(GoodId(i)), row.describe(catalog)))
            .collect();
        lines.join("\n")
    }
}

/// Point-in-time view of an agent's holdings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub owner: AgentId,
    pub revision: u64,
    pub quantities: Basket,
}

/// The ledger of one agent
pub struct Ledger {
    owner: AgentId,
    catalog: GoodCatalog,
    property: Basket,
    prices: PriceTable,
    revision: u64,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl Ledger {
    /// Create a ledger with explicit holdings and prices
    pub fn new(owner: AgentId, catalog: GoodCatalog, initial: Basket, prices: PriceTable) -> Self {
        let mut property = catalog.zeros();
        for (good, q) in initial.iter().filter(|(good, _)| catalog.contains(*good)) {
            property.set(good, q);
        }
        Self {
            owner,
            catalog,
            property,
            prices,
            revision: 0,
            observers: Vec::new(),
        }
    }

    /// Create a ledger from startup configuration, with production-cost prices
    pub fn from_spec(owner: AgentId, catalog: GoodCatalog, spec: &AgentSpec) -> Self {
        let prices = PriceTable::from_rule(&catalog, &spec.rule);
        Self::new(owner, catalog, spec.initial.clone(), prices)
    }

    /// Attach a snapshot observer
    pub fn add_observer(&mut self, observer: Box<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    pub fn catalog(&self) -> &GoodCatalog {
        &self.catalog
    }

    pub fn quantity(&self, good: GoodId) -> u64 {
        self.property.get(good)
    }

    pub fn holdings(&self) -> &Basket {
        &self.property
    }

    /// Barter price asked for one unit of `good`
    pub fn price_of(&self, good: GoodId) -> Basket {
        self.prices
            .get(good)
            .cloned()
            .unwrap_or_else(|| self.catalog.zeros())
    }

    pub fn price_table(&self) -> &PriceTable {
        &self.prices
    }

    /// Record the price of `good`; entries for goods outside the catalog are dropped
    pub fn set_price(&mut self, good: GoodId, price: Basket) {
        let price = self.conform(&price);
        self.prices.set(good, price);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Add `amount` units of `good`
    pub fn credit(&mut self, good: GoodId, amount: u64) {
        if !self.admits(good) {
            return;
        }
        let current = self.property.get(good);
        self.property.set(good, current.saturating_add(amount));
    }

    /// Remove `amount` units of `good`, clamping at zero
    ///
    /// Returns the units actually removed.
    pub fn debit(&mut self, good: GoodId, amount: u64) -> u64 {
        if !self.admits(good) {
            return 0;
        }
        let current = self.property.get(good);
        if amount > current {
            tracing::warn!(
                agent = %self.owner,
                good = self.catalog.name(good),
                held = current,
                requested = amount,
                "debit exceeds holdings, clamping at zero"
            );
            self.property.set(good, 0);
            current
        } else {
            self.property.set(good, current - amount);
            amount
        }
    }

    /// Buyer side of a trade: one unit of `good` in, `price` out
    ///
    /// Returns what was actually paid after clamping.
    pub fn settle_purchase(&mut self, good: GoodId, price: &Basket) -> Basket {
        let price = self.conform(price);
        self.credit(good, 1);
        let mut paid = self.catalog.zeros();
        for (payment, q) in price.entries() {
            let removed = self.debit(payment, q);
            paid.set(payment, removed);
        }
        self.prices.set(good, price);
        self.publish();
        paid
    }

    /// Seller side of a trade: `price` in, one unit of `good` out
    ///
    /// Returns the units of `good` actually delivered.
    pub fn settle_sale(&mut self, good: GoodId, price: &Basket) -> u64 {
        let price = self.conform(price);
        for (payment, q) in price.entries() {
            self.credit(payment, q);
        }
        let delivered = self.debit(good, 1);
        self.prices.set(good, price);
        self.publish();
        delivered
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            owner: self.owner.clone(),
            revision: self.revision,
            quantities: self.property.clone(),
        }
    }

    /// Bump the revision and hand a snapshot to every observer
    pub fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        for observer in self.observers.iter_mut() {
            observer.on_snapshot(&snapshot);
        }
    }

    fn admits(&self, good: GoodId) -> bool {
        if !self.catalog.contains(good) {
            tracing::warn!(agent = %self.owner, good = %good, "ignoring good outside the catalog");
            return false;
        }
        true
    }

    /// Catalog-width copy of `price`, zero for missing goods
    fn conform(&self, price: &Basket) -> Basket {
        let mut conformed = self.catalog.zeros();
        for (good, q) in price.iter().filter(|(good, _)| self.catalog.contains(*good)) {
            conformed.set(good, q);
        }
        conformed
    }

    /// Render holdings as `(BREAD: 1) (GRAIN: 0)`
    pub fn portfolio(&self) -> String {
        let parts: Vec<String> = self
            .property
            .iter()
            .map(|(good, q)| format!("({}: {})", self.catalog.name(good), q))
            .collect();
        parts.join(" ")
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("owner", &self.owner)
            .field("property", &self.property)
            .field("prices", &self.prices)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}
