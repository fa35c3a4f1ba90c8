use bitcoin::OutPoint;
use thiserror::Error;

/// Errors surfaced to callers.
///
/// Heuristic extractors never return these: malformed scripts and signatures
/// degrade to `unknown`/`false`, and missing collaborator data fails closed.
/// Only building a [`crate::TxContext`], indexed accessors and rule-table
/// loading can fail.
#[derive(Error, Debug)]
pub enum Error {
    /// A non-coinbase input whose spent output was not supplied
    #[error("spent output for input {input} ({outpoint}) could not be resolved")]
    MissingPrevout { input: usize, outpoint: OutPoint },

    /// An output-indexed operation was called with an index past the end
    #[error("output index {index} out of range for a transaction with {len} outputs")]
    OutputIndexOutOfRange { index: usize, len: usize },

    /// The rule table could not be parsed
    #[error("rule table parse error: {0}")]
    RuleTable(#[from] toml::de::Error),

    /// A rule without conditions matches everything, so it may only come last
    #[error("rule {index} has no conditions and would shadow every rule after it")]
    UnconditionalRule { index: usize },
}

/// Failure reported by an [`crate::AddressHistory`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("address history unavailable: {0}")]
    Unavailable(String),

    #[error("address history lookup timed out")]
    Timeout,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
