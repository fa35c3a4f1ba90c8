use serde::Serialize;
use tracing::trace;

use crate::context::TxContext;
use crate::global::{address_reuse, compressed_public_keys_only, is_anti_fee_sniping, signals_rbf};
use crate::input::{get_input_order, get_spending_types, has_multi_type_vin, InputOrder};
use crate::output::{
    change_type_match, change_type_matched_inputs, creates_op_return, get_change_index,
    get_output_structure, get_sending_types, ChangeIndex, ChangeTypeMatch, OutputStructure,
};
use crate::script::ScriptType;
use crate::signature::low_r_only;

/// Every signal the wallet rules look at, computed once per transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heuristics {
    /* Global heuristics */
    /// The version of the transaction
    pub tx_version: i32,
    /// Whether the transaction is a coinbase
    pub coinbase: bool,
    /// Whether the locktime protects against fee sniping attacks
    /// https://bitcoinops.org/en/topics/fee-sniping/
    pub anti_fee_sniping: bool,
    /// Whether every ECDSA signature has a low R value
    /// https://bitcoinops.org/en/topics/low-r-grinding/
    pub low_r_only: bool,
    /// Whether an output pays a previously used script
    pub address_reuse: bool,
    /// Whether no input reveals an uncompressed public key
    pub compressed_keys_only: bool,
    /* Input heuristics */
    /// The types of the inputs
    pub spending_types: Vec<ScriptType>,
    /// Whether the inputs spend more than one script type
    pub multi_type_vin: bool,
    /// Whether any input signals RBF via BIP 125 (Replace-by-Fee)
    pub signals_rbf: bool,
    /// The orderings the inputs satisfy
    pub input_order: InputOrder,
    /* Output heuristics */
    /// The types of the outputs
    pub sending_types: Vec<ScriptType>,
    pub creates_op_return: bool,
    /// The structure of the outputs
    pub output_structure: OutputStructure,
    /// The index of the change output
    pub change_index: ChangeIndex,
    /// Whether the change output has the majority input type
    pub change_type_matched_inputs: bool,
    pub change_type_match: ChangeTypeMatch,
}

impl Heuristics {
    pub fn new(ctx: &TxContext<'_>) -> Self {
        let heuristics = Self {
            tx_version: ctx.tx().version.0,
            coinbase: ctx.is_coinbase(),
            anti_fee_sniping: is_anti_fee_sniping(ctx),
            low_r_only: low_r_only(ctx),
            address_reuse: address_reuse(ctx),
            compressed_keys_only: compressed_public_keys_only(ctx),
            spending_types: get_spending_types(ctx),
            multi_type_vin: has_multi_type_vin(ctx),
            signals_rbf: signals_rbf(ctx),
            input_order: get_input_order(ctx),
            sending_types: get_sending_types(ctx),
            creates_op_return: creates_op_return(ctx),
            output_structure: get_output_structure(ctx),
            change_index: get_change_index(ctx),
            change_type_matched_inputs: change_type_matched_inputs(ctx),
            change_type_match: change_type_match(ctx),
        };
        trace!(txid = %ctx.tx().compute_txid(), ?heuristics, "computed heuristics");
        heuristics
    }

    pub fn spends(&self, script_type: ScriptType) -> bool {
        self.spending_types.contains(&script_type)
    }

    pub fn sends(&self, script_type: ScriptType) -> bool {
        self.sending_types.contains(&script_type)
    }

    pub fn change_found(&self) -> bool {
        self.change_index.index().is_some()
    }
}
