use std::collections::{HashMap, HashSet};
use std::fmt;

use bitcoin::{OutPoint, Script, ScriptBuf, Transaction, TxOut, Txid};
use serde::{Deserialize, Serialize};

use crate::error::{Error, HistoryError, Result};
use crate::util::SpentOutput;

/// Prior on-chain usage of output scripts, supplied by whoever indexes the
/// chain. Implementations may perform I/O; the heuristics only call it and
/// treat any error as "not reused".
pub trait AddressHistory {
    /// Whether `script_pubkey` received funds before the transaction under
    /// analysis.
    fn has_prior_usage(&self, script_pubkey: &Script) -> Result<bool, HistoryError>;
}

/// A plain set of previously seen scripts.
impl AddressHistory for HashSet<ScriptBuf> {
    fn has_prior_usage(&self, script_pubkey: &Script) -> Result<bool, HistoryError> {
        Ok(self.contains(script_pubkey))
    }
}

/// Tunables for the heuristics that need a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicParams {
    /// Maximum distance between confirmation height and locktime for a
    /// locktime to count as anti-fee-sniping
    pub anti_fee_sniping_window: u32,
    /// Payment amounts are assumed to be multiples of this many sats
    pub round_amount_sats: u64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            anti_fee_sniping_window: 100,
            round_amount_sats: 100,
        }
    }
}

/// A transaction together with everything the heuristics need to know about
/// it: the outputs its inputs spend and, optionally, where it confirmed and
/// how to look up address history.
///
/// Borrowed for the duration of an analysis; nothing here outlives the call.
pub struct TxContext<'a> {
    tx: &'a Transaction,
    spent_outputs: Vec<Option<SpentOutput>>,
    confirmation_height: Option<u32>,
    history: Option<&'a dyn AddressHistory>,
    params: HeuristicParams,
}

impl<'a> TxContext<'a> {
    /// Pairs every input with its spent output, matched by outpoint.
    ///
    /// Coinbase inputs spend nothing. Any other input without a matching
    /// entry in `spent_outputs` is an error.
    pub fn new(tx: &'a Transaction, spent_outputs: Vec<SpentOutput>) -> Result<Self> {
        let mut by_outpoint: HashMap<OutPoint, SpentOutput> = spent_outputs
            .into_iter()
            .map(|spent| (spent.outpoint, spent))
            .collect();

        let is_coinbase = tx.is_coinbase();
        let mut resolved = Vec::with_capacity(tx.input.len());
        for (index, txin) in tx.input.iter().enumerate() {
            if is_coinbase {
                resolved.push(None);
                continue;
            }
            // remove() so a duplicated outpoint cannot be served twice
            let spent = by_outpoint
                .remove(&txin.previous_output)
                .ok_or(Error::MissingPrevout {
                    input: index,
                    outpoint: txin.previous_output,
                })?;
            resolved.push(Some(spent));
        }

        Ok(Self::from_resolved(tx, resolved))
    }

    /// Resolves spent outputs from the full previous transactions.
    pub fn from_prev_txs(tx: &'a Transaction, prev_txs: &[Transaction]) -> Result<Self> {
        let by_txid: HashMap<Txid, &Transaction> = prev_txs
            .iter()
            .map(|prev_tx| (prev_tx.compute_txid(), prev_tx))
            .collect();

        let mut spent_outputs = Vec::with_capacity(tx.input.len());
        if !tx.is_coinbase() {
            for (index, txin) in tx.input.iter().enumerate() {
                let outpoint = txin.previous_output;
                let txout = by_txid
                    .get(&outpoint.txid)
                    .and_then(|prev_tx| prev_tx.output.get(outpoint.vout as usize))
                    .ok_or(Error::MissingPrevout {
                        input: index,
                        outpoint,
                    })?;
                spent_outputs.push(SpentOutput::new(outpoint, txout.clone()));
            }
        }

        Self::new(tx, spent_outputs)
    }

    fn from_resolved(tx: &'a Transaction, spent_outputs: Vec<Option<SpentOutput>>) -> Self {
        Self {
            tx,
            spent_outputs,
            confirmation_height: None,
            history: None,
            params: HeuristicParams::default(),
        }
    }

    /// Height of the block that confirmed the transaction.
    pub fn with_confirmation_height(mut self, height: u32) -> Self {
        self.confirmation_height = Some(height);
        self
    }

    pub fn with_history(mut self, history: &'a dyn AddressHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_params(mut self, params: HeuristicParams) -> Self {
        self.params = params;
        self
    }

    pub fn tx(&self) -> &'a Transaction {
        self.tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx.is_coinbase()
    }

    /// The output spent by input `index`; `None` for coinbase inputs.
    pub fn spent_output(&self, index: usize) -> Option<&SpentOutput> {
        self.spent_outputs.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn spent_txout(&self, index: usize) -> Option<&TxOut> {
        self.spent_output(index).map(|spent| &spent.txout)
    }

    /// Spent outputs in input order.
    pub fn spent_outputs(&self) -> impl Iterator<Item = Option<&SpentOutput>> + '_ {
        self.spent_outputs.iter().map(Option::as_ref)
    }

    pub fn confirmation_height(&self) -> Option<u32> {
        self.confirmation_height
    }

    pub fn history(&self) -> Option<&'a dyn AddressHistory> {
        self.history
    }

    pub fn params(&self) -> &HeuristicParams {
        &self.params
    }
}

impl fmt::Debug for TxContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("txid", &self.tx.compute_txid())
            .field("spent_outputs", &self.spent_outputs)
            .field("confirmation_height", &self.confirmation_height)
            .field("has_history", &self.history.is_some())
            .field("params", &self.params)
            .finish()
    }
}
