//! Error types for barter configuration
//!
//! Every variant is fatal at startup: an agent with a bad configuration never
//! starts any behaviour.

use thiserror::Error;

/// Result type for configuration decoding
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Startup configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The flat argument list does not hold 3 * N values
    #[error("expected {expected} values (3 x {goods} goods), got {actual}")]
    WrongArgumentCount {
        expected: usize,
        goods: usize,
        actual: usize,
    },

    /// An argument is not an integer
    #[error("argument {position} is not an integer: {value:?}")]
    InvalidNumber { position: usize, value: String },

    /// An argument is negative
    #[error("argument {position} must not be negative, got {value}")]
    NegativeValue { position: usize, value: i64 },

    /// The good catalog has no goods
    #[error("good catalog must contain at least one good")]
    EmptyCatalog,

    /// The same good appears twice in the catalog
    #[error("good {name} appears more than once in the catalog")]
    DuplicateGood { name: String },

    /// A good name is not part of the catalog
    #[error("unknown good: {name}")]
    UnknownGood { name: String },
}
