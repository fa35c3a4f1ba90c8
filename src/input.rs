use std::collections::HashSet;

use bitcoin::hashes::Hash;
use serde::{Deserialize, Serialize};

use crate::context::TxContext;
use crate::script::{classify_input, ScriptType};
use crate::util::TagSet;

/// Ordering conventions an input list can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum InputSortingType {
    /// Only one input, so no order to speak of
    Single,
    /// Spent values never decrease
    Ascending,
    /// Spent values never increase
    Descending,
    /// Sorted by previous txid, then vout (BIP 69)
    Bip69,
    /// Spent outputs appear in the order they were created on chain
    Historical,
    Unknown,
}

/// Every input order satisfied by a transaction, in evaluation order.
pub type InputOrder = TagSet<InputSortingType, 6>;

/// Script type spent by each input, in input order.
pub fn get_spending_types(ctx: &TxContext<'_>) -> Vec<ScriptType> {
    ctx.tx()
        .input
        .iter()
        .enumerate()
        .map(|(index, txin)| classify_input(txin, ctx.spent_txout(index)))
        .collect()
}

/// Returns true if the inputs spend more than one known script type
pub fn has_multi_type_vin(ctx: &TxContext<'_>) -> bool {
    let types: HashSet<ScriptType> = get_spending_types(ctx)
        .into_iter()
        .filter(|spending_type| *spending_type != ScriptType::Unknown)
        .collect();
    types.len() > 1
}

fn is_sorted_by_key<T, K: PartialOrd>(items: &[T], key: impl Fn(&T) -> K) -> bool {
    items.windows(2).all(|pair| key(&pair[0]) <= key(&pair[1]))
}

/// Returns the input orders the transaction satisfies as given. Inputs are
/// never re-sorted; each convention is checked against the order on the wire.
pub fn get_input_order(ctx: &TxContext<'_>) -> InputOrder {
    let inputs = &ctx.tx().input;
    if inputs.len() == 1 {
        return InputOrder::single(InputSortingType::Single);
    }

    let Some(spent) = ctx.spent_outputs().collect::<Option<Vec<_>>>() else {
        return InputOrder::single(InputSortingType::Unknown);
    };
    if spent.is_empty() {
        return InputOrder::single(InputSortingType::Unknown);
    }

    let mut order = InputOrder::new();
    if is_sorted_by_key(&spent, |s| s.txout.value) {
        order.insert(InputSortingType::Ascending);
    }
    if is_sorted_by_key(&spent, |s| std::cmp::Reverse(s.txout.value)) {
        order.insert(InputSortingType::Descending);
    }
    // BIP 69 compares txids as displayed, which is the reverse of the
    // internal byte order.
    if is_sorted_by_key(inputs, |txin| {
        let mut txid = txin.previous_output.txid.to_byte_array();
        txid.reverse();
        (txid, txin.previous_output.vout)
    }) {
        order.insert(InputSortingType::Bip69);
    }
    if let Some(keys) = spent
        .iter()
        .map(|s| s.historical_key())
        .collect::<Option<Vec<_>>>()
    {
        if is_sorted_by_key(&keys, |key| *key) {
            order.insert(InputSortingType::Historical);
        }
    }

    if order.is_empty() {
        order.insert(InputSortingType::Unknown);
    }
    order
}
