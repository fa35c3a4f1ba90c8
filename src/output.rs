use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::TxContext;
use crate::error::{Error, Result};
use crate::input::get_spending_types;
use crate::script::{classify_output_script, ScriptType};
use crate::util::TagSet;

/// Script type of each output, in output order.
pub fn get_sending_types(ctx: &TxContext<'_>) -> Vec<ScriptType> {
    ctx.tx()
        .output
        .iter()
        .map(|txout| classify_output_script(&txout.script_pubkey))
        .collect()
}

/// Script type of output `index`.
pub fn sending_type_at(ctx: &TxContext<'_>, index: usize) -> Result<ScriptType> {
    let outputs = &ctx.tx().output;
    outputs
        .get(index)
        .map(|txout| classify_output_script(&txout.script_pubkey))
        .ok_or(Error::OutputIndexOutOfRange {
            index,
            len: outputs.len(),
        })
}

/// Returns true if any output is an OP_RETURN
pub fn creates_op_return(ctx: &TxContext<'_>) -> bool {
    ctx.tx()
        .output
        .iter()
        .any(|txout| txout.script_pubkey.is_op_return())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeIndex {
    /// Coinbase, or nothing to split change from
    NoChange,
    /// Several candidates and nothing to tell them apart
    Inconclusive,
    /// Index of change output
    Found(usize),
}

impl ChangeIndex {
    pub fn index(&self) -> Option<usize> {
        match self {
            ChangeIndex::NoChange | ChangeIndex::Inconclusive => None,
            ChangeIndex::Found(index) => Some(*index),
        }
    }

    /// `-1` for no change, `-2` for inconclusive, otherwise the index.
    pub fn as_sentinel(&self) -> i64 {
        match self {
            ChangeIndex::NoChange => -1,
            ChangeIndex::Inconclusive => -2,
            ChangeIndex::Found(index) => *index as i64,
        }
    }
}

fn unique<I: IntoIterator<Item = usize>>(candidates: I) -> Option<usize> {
    let mut candidates = candidates.into_iter();
    let first = candidates.next()?;
    candidates.next().is_none().then_some(first)
}

/// Attempts to identify the change output. The first heuristic with exactly
/// one candidate decides:
/// 1. every input spends the same known type and one output has that type
/// 2. one output pays back to a script the inputs spent from
/// 3. one output amount is not a round number
pub fn get_change_index(ctx: &TxContext<'_>) -> ChangeIndex {
    let tx = ctx.tx();
    if ctx.is_coinbase() || tx.output.len() <= 1 {
        return ChangeIndex::NoChange;
    }

    let spending_types = get_spending_types(ctx);
    let sending_types = get_sending_types(ctx);
    if let Some(&input_type) = spending_types.first() {
        if input_type != ScriptType::Unknown && spending_types.iter().all(|t| *t == input_type) {
            let matching = sending_types
                .iter()
                .enumerate()
                .filter(|(_, t)| **t == input_type)
                .map(|(i, _)| i);
            if let Some(index) = unique(matching) {
                debug!(index, %input_type, "change found by input type");
                return ChangeIndex::Found(index);
            }
        }
    }

    let spent_scripts: HashSet<_> = ctx
        .spent_outputs()
        .flatten()
        .map(|spent| &spent.txout.script_pubkey)
        .collect();
    let paid_back = tx
        .output
        .iter()
        .enumerate()
        .filter(|(_, txout)| spent_scripts.contains(&txout.script_pubkey))
        .map(|(i, _)| i);
    if let Some(index) = unique(paid_back) {
        debug!(index, "change found by script reuse");
        return ChangeIndex::Found(index);
    }

    let round = ctx.params().round_amount_sats.max(1);
    let unround = tx
        .output
        .iter()
        .enumerate()
        .filter(|(_, txout)| txout.value.to_sat() % round != 0)
        .map(|(i, _)| i);
    if let Some(index) = unique(unround) {
        debug!(index, round, "change found by non-round amount");
        return ChangeIndex::Found(index);
    }

    ChangeIndex::Inconclusive
}

/// Returns true if the change output has the most common known input type.
/// A tie for most common counts as no match. In the integer encoding this is
/// `1` for true and `0` for false.
pub fn change_type_matched_inputs(ctx: &TxContext<'_>) -> bool {
    let Some(index) = get_change_index(ctx).index() else {
        return false;
    };
    let Ok(change_type) = sending_type_at(ctx, index) else {
        return false;
    };

    let mut counts: HashMap<ScriptType, usize> = HashMap::new();
    for spending_type in get_spending_types(ctx) {
        if spending_type != ScriptType::Unknown {
            *counts.entry(spending_type).or_default() += 1;
        }
    }
    let Some(&top) = counts.values().max() else {
        return false;
    };
    let mut majority = counts.iter().filter(|(_, count)| **count == top);
    match (majority.next(), majority.next()) {
        (Some((majority_type, _)), None) => *majority_type == change_type,
        _ => false,
    }
}

/// How the change output's type relates to the rest of the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ChangeTypeMatch {
    /// No change output or could not determine
    NoChangeOrInconclusive,
    /// Change has the type of every input
    MatchesInputs,
    /// Change has the type of every other output
    MatchesOutputs,
    /// Change has the type of every input and every other output
    MatchesInputsAndOutputs,
    /// Change type matches neither side
    MatchesNeither,
}

pub fn change_type_match(ctx: &TxContext<'_>) -> ChangeTypeMatch {
    let Some(index) = get_change_index(ctx).index() else {
        return ChangeTypeMatch::NoChangeOrInconclusive;
    };
    let sending_types = get_sending_types(ctx);
    let Some(&change_type) = sending_types.get(index) else {
        return ChangeTypeMatch::NoChangeOrInconclusive;
    };

    let matches_inputs = get_spending_types(ctx)
        .iter()
        .all(|t| *t == change_type);
    let matches_outputs = sending_types
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .all(|(_, t)| *t == change_type);

    match (matches_inputs, matches_outputs) {
        (true, true) => ChangeTypeMatch::MatchesInputsAndOutputs,
        (true, false) => ChangeTypeMatch::MatchesInputs,
        (false, true) => ChangeTypeMatch::MatchesOutputs,
        (false, false) => ChangeTypeMatch::MatchesNeither,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum OutputStructureType {
    /// Single output
    Single,
    /// Two outputs
    Double,
    /// More than two outputs
    Multi,
    /// Outputs are sorted according to BIP 69
    Bip69,
    /// Change output is the last output
    ChangeLast,
    /// Change output is the first output
    ChangeFirst,
}

/// Every output structure tag that applies, cardinality first.
pub type OutputStructure = TagSet<OutputStructureType, 6>;

/// Returns the output structure types detected in the transaction.
///
/// BIP69 here is the ordering BIP 69 itself defines for outputs: amount
/// ascending, then locking script bytes ascending for equal amounts.
pub fn get_output_structure(ctx: &TxContext<'_>) -> OutputStructure {
    let outputs = &ctx.tx().output;
    let mut structure = OutputStructure::new();
    match outputs.len() {
        0 => return structure,
        1 => return OutputStructure::single(OutputStructureType::Single),
        2 => structure.insert(OutputStructureType::Double),
        _ => structure.insert(OutputStructureType::Multi),
    };

    // BIP 69: amount ascending, ties broken by script bytes
    if outputs.windows(2).all(|pair| {
        (pair[0].value, pair[0].script_pubkey.as_bytes())
            <= (pair[1].value, pair[1].script_pubkey.as_bytes())
    }) {
        structure.insert(OutputStructureType::Bip69);
    }

    if let ChangeIndex::Found(index) = get_change_index(ctx) {
        if index == 0 {
            structure.insert(OutputStructureType::ChangeFirst);
        } else if index == outputs.len() - 1 {
            structure.insert(OutputStructureType::ChangeLast);
        }
    }

    structure
}
