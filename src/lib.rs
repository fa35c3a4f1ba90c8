//! Detects which wallet software built a Bitcoin transaction from what the
//! transaction itself reveals: script types, signature encoding, input and
//! output ordering, locktime and sequence numbers.
//!
//! Every heuristic takes a [`TxContext`], which pairs a transaction with the
//! outputs its inputs spend. [`Heuristics`] collects all signals at once and a
//! [`RuleTable`] maps them to a [`WalletType`].
//!
//! ```no_run
//! use wallet_attribution::{detect_wallet, TxContext};
//! # fn run(tx: bitcoin::Transaction, prev_txs: Vec<bitcoin::Transaction>) -> wallet_attribution::Result<()> {
//! let ctx = TxContext::from_prev_txs(&tx, &prev_txs)?.with_confirmation_height(800_370);
//! println!("{}", detect_wallet(&ctx));
//! # Ok(())
//! # }
//! ```
//! Heuristics are based on https://github.com/ishaanam/wallet-fingerprinting

pub mod aggregate;
pub mod context;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod global;
pub mod heuristics;
pub mod input;
pub mod output;
pub mod rules;
pub mod script;
pub mod signature;
pub mod util;
pub mod wallet;

pub use aggregate::{
    analyze_block, analyze_range, BlockSource, ResolvedTransaction, WalletAnalyzeResult,
    WalletTally,
};
pub use context::{AddressHistory, HeuristicParams, TxContext};
pub use error::{Error, HistoryError, Result};
pub use heuristics::Heuristics;
pub use input::{InputOrder, InputSortingType};
pub use output::{ChangeIndex, ChangeTypeMatch, OutputStructure, OutputStructureType};
pub use rules::{Condition, Rule, RuleTable};
pub use script::ScriptType;
pub use util::{ChainPosition, SpentOutput, TagSet};
pub use wallet::{detect_wallet, Classification, MatchedRule, WalletClassifier, WalletType};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();
