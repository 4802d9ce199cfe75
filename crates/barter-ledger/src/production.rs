//! Greedy production from a fixed linear rule
//!
//! A run keeps applying the rule while every input is covered, so one call
//! converts all usable stock. Runs are bounded by `max_cycles`, which only
//! matters for rules that consume nothing.

use barter_types::ProductionRule;

use crate::Ledger;

/// Upper bound on cycles applied by a single run
pub const DEFAULT_MAX_CYCLES: u32 = 1_000;

/// Result of one production run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductionRun {
    /// Cycles applied
    pub cycles: u32,
    /// The run stopped at the cycle bound rather than on missing inputs
    pub capped: bool,
}

/// Applies an agent's production rule to its ledger
#[derive(Debug, Clone)]
pub struct ProductionEngine {
    rule: ProductionRule,
    max_cycles: u32,
}

impl ProductionEngine {
    pub fn new(rule: ProductionRule) -> Self {
        Self {
            rule,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn rule(&self) -> &ProductionRule {
        &self.rule
    }

    /// Whether the ledger covers every input of one cycle
    pub fn can_produce(&self, ledger: &Ledger) -> bool {
        self.rule
            .input
            .iter()
            .all(|(good, needed)| ledger.quantity(good) >= needed)
    }

    /// Produce until inputs run out (or the cycle bound is hit)
    pub fn run(&self, ledger: &mut Ledger) -> ProductionRun {
        let mut run = ProductionRun::default();
        if self.rule.is_inert() {
            return run;
        }

        loop {
            if !self.can_produce(ledger) {
                break;
            }
            if run.cycles >= self.max_cycles {
                tracing::warn!(
                    agent = %ledger.owner(),
                    cycles = run.cycles,
                    "production stopped at cycle bound"
                );
                run.capped = true;
                break;
            }

            for (good, q) in self.rule.output.entries() {
                ledger.credit(good, q);
            }
            for (good, q) in self.rule.input.entries() {
                ledger.debit(good, q);
            }
            run.cycles += 1;

            tracing::info!(
                agent = %ledger.owner(),
                produced = %self.rule.output.describe(ledger.catalog()),
                consumed = %self.rule.input.describe(ledger.catalog()),
                "produced goods"
            );
            ledger.publish();
        }

        run
    }
}
