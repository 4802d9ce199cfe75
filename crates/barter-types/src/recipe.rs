//! Linear production rules and the flat startup encoding
//!
//! An agent is configured with `3 * N` integers for a catalog of `N` goods:
//!
//! ```text
//! [ output_1 .. output_N | input_1 .. input_N | initial_1 .. initial_N ]
//! ```
//!
//! Each production cycle consumes `input[g]` and yields `output[g]` of every
//! good `g`. The rule never changes after startup.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::goods::{Basket, GoodCatalog, GoodId};

/// Fixed linear recipe: `input` is consumed to yield `output`, per cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub output: Basket,
    pub input: Basket,
}

impl ProductionRule {
    pub fn new(output: Basket, input: Basket) -> Self {
        Self { output, input }
    }

    /// Whether a cycle yields any of `good`
    pub fn produces(&self, good: GoodId) -> bool {
        self.output.get(good) > 0
    }

    /// A rule that consumes nothing can cycle without bound
    pub fn needs_inputs(&self) -> bool {
        !self.input.is_zero()
    }

    /// A rule with neither inputs nor outputs does nothing
    pub fn is_inert(&self) -> bool {
        self.output.is_zero() && self.input.is_zero()
    }

    /// Render as `1 * BREAD = 2 * GRAIN`
    pub fn describe(&self, catalog: &GoodCatalog) -> String {
        let side = |basket: &Basket| {
            let terms: Vec<String> = basket
                .entries()
                .map(|(good, q)| format!("{} * {}", q, catalog.name(good)))
                .collect();
            if terms.is_empty() {
                "0".to_string()
            } else {
                terms.join(" + ")
            }
        };
        format!("{} = {}", side(&self.output), side(&self.input))
    }
}

/// Everything an agent is configured with at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub rule: ProductionRule,
    pub initial: Basket,
}

impl AgentSpec {
    /// Decode the flat `3 * N` integer list, in catalog order
    pub fn decode(catalog: &GoodCatalog, values: &[i64]) -> Result<Self> {
        let n = catalog.len();
        if values.len() != 3 * n {
            return Err(ConfigError::WrongArgumentCount {
                expected: 3 * n,
                goods: n,
                actual: values.len(),
            });
        }

        let mut unsigned = Vec::with_capacity(values.len());
        for (position, value) in values.iter().enumerate() {
            let value = u64::try_from(*value).map_err(|_| ConfigError::NegativeValue {
                position,
                value: *value,
            })?;
            unsigned.push(value);
        }

        Ok(Self {
            rule: ProductionRule {
                output: Basket::from(unsigned[..n].to_vec()),
                input: Basket::from(unsigned[n..2 * n].to_vec()),
            },
            initial: Basket::from(unsigned[2 * n..].to_vec()),
        })
    }

    /// Decode string arguments, as handed over by a launcher
    pub fn parse_args<S: AsRef<str>>(catalog: &GoodCatalog, args: &[S]) -> Result<Self> {
        let mut values = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            let raw = arg.as_ref().trim();
            let value = raw.parse::<i64>().map_err(|_| ConfigError::InvalidNumber {
                position,
                value: raw.to_string(),
            })?;
            values.push(value);
        }
        Self::decode(catalog, &values)
    }

    /// Decode a comma or whitespace separated list such as `1,0,0,0,2,0,0,5,0`
    pub fn parse_list(catalog: &GoodCatalog, list: &str) -> Result<Self> {
        let args: Vec<&str> = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .collect();
        Self::parse_args(catalog, &args)
    }
}
