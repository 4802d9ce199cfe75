//! Goods, the good catalog and per-good quantity vectors
//!
//! A market trades a closed set of goods fixed at configuration time. Goods are
//! identified by their position in the catalog, and every per-good vector
//! (quantities, coefficients, prices) is laid out in catalog order.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Goods traded when no catalog is configured
pub const STANDARD_GOODS: [&str; 3] = ["BREAD", "GRAIN", "LAND"];

/// Identifier of a good: its position in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoodId(pub usize);

impl GoodId {
    /// Position of the good in catalog order
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "good#{}", self.0)
    }
}

/// The closed, ordered set of goods traded in a market
///
/// Cheap to clone: every agent of a market holds the same catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoodCatalog {
    names: Arc<[String]>,
}

impl GoodCatalog {
    /// Build a catalog from good names, in enumeration order
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = Vec::new();
        for name in names {
            let name = name.into().trim().to_string();
            if collected.iter().any(|existing| existing.eq_ignore_ascii_case(&name)) {
                return Err(ConfigError::DuplicateGood { name });
            }
            collected.push(name);
        }
        if collected.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(Self {
            names: collected.into(),
        })
    }

    /// The default `BREAD, GRAIN, LAND` catalog
    pub fn standard() -> Self {
        Self {
            names: STANDARD_GOODS.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Number of goods (N)
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All goods in enumeration order
    pub fn goods(&self) -> impl Iterator<Item = GoodId> + '_ {
        (0..self.names.len()).map(GoodId)
    }

    /// The reference good: the first one in enumeration order
    pub fn reference(&self) -> GoodId {
        GoodId(0)
    }

    pub fn contains(&self, good: GoodId) -> bool {
        good.0 < self.names.len()
    }

    /// Whether `basket` has exactly one entry per good
    pub fn fits(&self, basket: &Basket) -> bool {
        basket.len() == self.names.len()
    }

    /// Name of a good, `?` for goods outside the catalog
    pub fn name(&self, good: GoodId) -> &str {
        self.names.get(good.0).map(String::as_str).unwrap_or("?")
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look a good up by name (case-insensitive)
    pub fn parse(&self, name: &str) -> Result<GoodId> {
        let name = name.trim();
        self.names
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name))
            .map(GoodId)
            .ok_or_else(|| ConfigError::UnknownGood {
                name: name.to_string(),
            })
    }

    /// An all-zero vector sized for this catalog
    pub fn zeros(&self) -> Basket {
        Basket::zeros(self.len())
    }
}

impl Default for GoodCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// A non-negative quantity per good, in catalog order
///
/// Used for holdings, production coefficients and barter price vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Basket(Vec<u64>);

impl Basket {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Quantity of a good; goods outside the vector hold zero
    pub fn get(&self, good: GoodId) -> u64 {
        self.0.get(good.0).copied().unwrap_or(0)
    }

    /// Set the quantity of a good, growing the vector if needed
    pub fn set(&mut self, good: GoodId, quantity: u64) {
        if good.0 >= self.0.len() {
            self.0.resize(good.0 + 1, 0);
        }
        self.0[good.0] = quantity;
    }

    /// Aggregate scalar size of the vector (sum of its components)
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, q| acc.saturating_add(*q))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|q| *q == 0)
    }

    /// Non-zero entries
    pub fn entries(&self) -> impl Iterator<Item = (GoodId, u64)> + '_ {
        self.iter().filter(|(_, q)| *q > 0)
    }

    /// Every entry, zeros included, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (GoodId, u64)> + '_ {
        self.0.iter().enumerate().map(|(i, q)| (GoodId(i), *q))
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Render as `2 GRAIN + 1 LAND` using catalog names
    pub fn describe(&self, catalog: &GoodCatalog) -> String {
        let parts: Vec<String> = self
            .entries()
            .map(|(good, q)| format!("{} {}", q, catalog.name(good)))
            .collect();
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(" + ")
        }
    }
}

impl From<Vec<u64>> for Basket {
    fn from(quantities: Vec<u64>) -> Self {
        Self(quantities)
    }
}

impl fmt::Display for Basket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", q)?;
        }
        write!(f, "]")
    }
}
