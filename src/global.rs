use std::collections::HashSet;

use bitcoin::script::Instruction;
use bitcoin::{absolute, Script, TxIn};
use tracing::warn;

use crate::context::TxContext;
use crate::input::get_spending_types;
use crate::script::ScriptType;

/// Returns true if the transaction signals RBF (Replace-By-Fee)
/// by having at least one input with sequence number below 0xfffffffe
pub fn signals_rbf(ctx: &TxContext<'_>) -> bool {
    ctx.tx().input.iter().any(|input| input.sequence.is_rbf())
}

/// Returns true if the locktime looks like anti-fee-sniping: a non-zero block
/// height. When the confirmation height is known the locktime must also sit
/// at or below it and within `anti_fee_sniping_window` blocks. In the integer
/// encoding this is `1` for true and `-1` for false.
/// https://bitcoinops.org/en/topics/fee-sniping/
pub fn is_anti_fee_sniping(ctx: &TxContext<'_>) -> bool {
    let absolute::LockTime::Blocks(height) = ctx.tx().lock_time else {
        return false;
    };
    let locktime = height.to_consensus_u32();
    if locktime == 0 {
        return false;
    }

    match ctx.confirmation_height() {
        Some(confirmed) => {
            locktime <= confirmed
                && confirmed - locktime < ctx.params().anti_fee_sniping_window
        }
        None => true,
    }
}

/// Returns true if an output pays a script that has received funds before:
/// either one of the scripts this transaction spends from, or one the
/// address history knows about. History errors count as no reuse.
pub fn address_reuse(ctx: &TxContext<'_>) -> bool {
    let spent_scripts: HashSet<&Script> = ctx
        .spent_outputs()
        .flatten()
        .map(|spent| spent.txout.script_pubkey.as_script())
        .collect();
    let outputs = &ctx.tx().output;
    if outputs
        .iter()
        .any(|txout| spent_scripts.contains(txout.script_pubkey.as_script()))
    {
        return true;
    }

    let Some(history) = ctx.history() else {
        return false;
    };
    outputs.iter().enumerate().any(|(index, txout)| {
        match history.has_prior_usage(&txout.script_pubkey) {
            Ok(used) => used,
            Err(e) => {
                warn!(output = index, error = %e, "address history lookup failed, assuming no reuse");
                false
            }
        }
    })
}

fn is_uncompressed(key: &[u8]) -> bool {
    key.len() == 65 && key[0] == 0x04
}

fn last_push(script_sig: &Script) -> Option<&[u8]> {
    script_sig
        .instructions()
        .filter_map(|instruction| match instruction {
            Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes()),
            _ => None,
        })
        .last()
}

fn pubkey(txin: &TxIn, spending_type: ScriptType) -> Option<&[u8]> {
    match spending_type {
        ScriptType::PubKeyHash => last_push(&txin.script_sig),
        ScriptType::WitnessV0KeyHash => txin.witness.nth(1),
        _ => None,
    }
}

/// Returns false if any key-hash input reveals an uncompressed public key
pub fn compressed_public_keys_only(ctx: &TxContext<'_>) -> bool {
    !ctx.tx()
        .input
        .iter()
        .zip(get_spending_types(ctx))
        .filter_map(|(txin, spending_type)| pubkey(txin, spending_type))
        .any(is_uncompressed)
}
