//! Per-wallet tallies over blocks of transactions.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use bitcoin::{Transaction, Txid};
use tracing::{debug, warn};

use crate::context::{AddressHistory, TxContext};
use crate::util::SpentOutput;
use crate::wallet::{WalletClassifier, WalletType};

/// Transactions attributed to one wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletTally {
    pub total: u64,
    pub txs: Vec<Txid>,
}

/// Tallies for every [`WalletType`], `Unknown` included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAnalyzeResult {
    tallies: BTreeMap<WalletType, WalletTally>,
}

impl Default for WalletAnalyzeResult {
    fn default() -> Self {
        Self {
            tallies: WalletType::ALL
                .iter()
                .map(|wallet| (*wallet, WalletTally::default()))
                .collect(),
        }
    }
}

impl WalletAnalyzeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, wallet: WalletType, txid: Txid) {
        let tally = self.tallies.entry(wallet).or_default();
        tally.total += 1;
        tally.txs.push(txid);
    }

    /// Adds `other`'s counts to these, keeping transaction order.
    pub fn merge(&mut self, other: WalletAnalyzeResult) {
        for (wallet, tally) in other.tallies {
            let ours = self.tallies.entry(wallet).or_default();
            ours.total += tally.total;
            ours.txs.extend(tally.txs);
        }
    }

    pub fn get(&self, wallet: WalletType) -> &WalletTally {
        static EMPTY: WalletTally = WalletTally {
            total: 0,
            txs: Vec::new(),
        };
        self.tallies.get(&wallet).unwrap_or(&EMPTY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WalletType, &WalletTally)> {
        self.tallies.iter().map(|(wallet, tally)| (*wallet, tally))
    }

    /// Number of transactions recorded across all wallets.
    pub fn total(&self) -> u64 {
        self.tallies.values().map(|tally| tally.total).sum()
    }
}

/// Classifies every transaction of one block.
pub fn analyze_block<'a>(
    classifier: &WalletClassifier,
    contexts: impl IntoIterator<Item = TxContext<'a>>,
) -> WalletAnalyzeResult {
    let mut result = WalletAnalyzeResult::new();
    for ctx in contexts {
        result.record(classifier.detect(&ctx), ctx.tx().compute_txid());
    }
    result
}

/// A transaction with the outputs its inputs spend, as fetched from a node or
/// an indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransaction {
    pub tx: Transaction,
    pub spent_outputs: Vec<SpentOutput>,
}

/// Where blocks come from. Fetching may block or fail; classification itself
/// does neither.
pub trait BlockSource {
    type Error;

    /// Transactions of the block at `height`, in block order.
    fn block_transactions(&self, height: u32) -> Result<Vec<ResolvedTransaction>, Self::Error>;

    /// Prior address usage, when the source indexes it.
    fn address_history(&self) -> Option<&dyn AddressHistory> {
        None
    }
}

/// Classifies every block in `heights`. Transactions whose spent outputs do
/// not line up with their inputs are skipped; a failed block fetch aborts.
pub fn analyze_range<S: BlockSource>(
    classifier: &WalletClassifier,
    source: &S,
    heights: RangeInclusive<u32>,
) -> Result<WalletAnalyzeResult, S::Error> {
    let mut result = WalletAnalyzeResult::new();
    for height in heights {
        let block = source.block_transactions(height)?;
        let mut block_result = WalletAnalyzeResult::new();
        for ResolvedTransaction { tx, spent_outputs } in block {
            let ctx = match TxContext::new(&tx, spent_outputs) {
                Ok(ctx) => ctx.with_confirmation_height(height),
                Err(e) => {
                    warn!(height, txid = %tx.compute_txid(), error = %e, "skipping transaction");
                    continue;
                }
            };
            let ctx = match source.address_history() {
                Some(history) => ctx.with_history(history),
                None => ctx,
            };
            block_result.record(classifier.detect(&ctx), tx.compute_txid());
        }
        debug!(height, transactions = block_result.total(), "analyzed block");
        result.merge(block_result);
    }
    Ok(result)
}
