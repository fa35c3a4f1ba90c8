//! ECDSA signature extraction and low-R detection.
//! https://bitcoinops.org/en/topics/low-r-grinding

use bitcoin::blockdata::script::Instruction;
use bitcoin::secp256k1::ecdsa::Signature as SecpSignature;
use bitcoin::{ecdsa::Signature as EcdsaSignature, Script, Witness};

use crate::context::TxContext;
use crate::input::get_spending_types;
use crate::script::ScriptType;

/// Longest DER signature (72 bytes) plus the sighash byte.
const MAX_SIGNATURE_LEN: usize = 73;
/// Shortest DER signature (8 bytes) plus the sighash byte.
const MIN_SIGNATURE_LEN: usize = 9;

/// Returns true if the signature's R value fits in 32 bytes without a sign
/// padding byte, i.e. R < 2^255.
///
/// Accepts DER with or without the trailing sighash byte. Anything that does
/// not parse is not low-R.
pub fn is_low_r(signature: &[u8]) -> bool {
    let parsed = EcdsaSignature::from_slice(signature)
        .map(|sig| sig.signature)
        .or_else(|_| SecpSignature::from_der(signature));

    match parsed {
        Ok(sig) => sig.serialize_compact()[0] < 0x80,
        Err(_) => false,
    }
}

/// Returns true if every ECDSA signature in the transaction is low-R.
/// Inputs without extractable signatures (coinbase, taproot) do not count
/// against it.
pub fn low_r_only(ctx: &TxContext<'_>) -> bool {
    extract_all_signatures(ctx)
        .iter()
        .all(|signature| is_low_r(signature))
}

/// Shape check for `DER || sighash`: a SEQUENCE whose length byte covers the
/// rest of the data minus the sighash byte.
fn looks_like_signature(data: &[u8]) -> bool {
    (MIN_SIGNATURE_LEN..=MAX_SIGNATURE_LEN).contains(&data.len())
        && data[0] == 0x30
        && data[1] as usize == data.len() - 3
}

/// Extracts ECDSA signatures from a scriptSig
fn extract_signatures_from_scriptsig(script_sig: &Script, skip_last: bool) -> Vec<Vec<u8>> {
    let mut pushes: Vec<&[u8]> = script_sig
        .instructions()
        .map_while(|instruction| match instruction {
            Ok(Instruction::PushBytes(bytes)) => Some(Some(bytes.as_bytes())),
            Ok(Instruction::Op(_)) => Some(None),
            Err(_) => None,
        })
        .flatten()
        .collect();
    if skip_last {
        pushes.pop();
    }

    pushes
        .into_iter()
        .filter(|data| looks_like_signature(data))
        .map(<[u8]>::to_vec)
        .collect()
}

/// Extracts ECDSA signatures from witness stack
fn extract_signatures_from_witness(witness: &Witness, skip_last: bool) -> Vec<Vec<u8>> {
    let take = if skip_last {
        witness.len().saturating_sub(1)
    } else {
        witness.len()
    };

    witness
        .iter()
        .take(take)
        .filter(|data| looks_like_signature(data))
        .map(<[u8]>::to_vec)
        .collect()
}

/// Extract all ECDSA signatures from the inputs, picking scriptSig or witness
/// per input according to what the input spends.
pub(crate) fn extract_all_signatures(ctx: &TxContext<'_>) -> Vec<Vec<u8>> {
    ctx.tx()
        .input
        .iter()
        .zip(get_spending_types(ctx))
        .flat_map(|(txin, spending_type)| match spending_type {
            // Schnorr signatures have no DER encoding
            ScriptType::WitnessV1Taproot => vec![],
            ScriptType::WitnessV0KeyHash | ScriptType::WitnessV0ScriptHash => {
                extract_signatures_from_witness(&txin.witness, spending_type.is_script_hash())
            }
            ScriptType::PubKeyHash | ScriptType::ScriptHash | ScriptType::Multisig => {
                extract_signatures_from_scriptsig(
                    &txin.script_sig,
                    spending_type.is_script_hash(),
                )
            }
            ScriptType::Unknown => {
                if !txin.script_sig.is_empty() {
                    extract_signatures_from_scriptsig(&txin.script_sig, false)
                } else {
                    extract_signatures_from_witness(&txin.witness, false)
                }
            }
        })
        .collect()
}
