//! Script-type classification of locking scripts and of the inputs spending them.

use std::fmt;

use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHNUM_1, OP_PUSHNUM_16};
use bitcoin::script::Instruction;
use bitcoin::{Script, TxIn, TxOut};
use serde::{Deserialize, Serialize};

/// Semantic category of a locking script, named the way bitcoind reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ScriptType {
    #[serde(rename = "pubkeyhash")]
    PubKeyHash,
    #[serde(rename = "scripthash")]
    ScriptHash,
    #[serde(rename = "witness_v0_keyhash")]
    WitnessV0KeyHash,
    #[serde(rename = "witness_v0_scripthash")]
    WitnessV0ScriptHash,
    #[serde(rename = "witness_v1_taproot")]
    WitnessV1Taproot,
    #[serde(rename = "multisig")]
    Multisig,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::PubKeyHash => "pubkeyhash",
            ScriptType::ScriptHash => "scripthash",
            ScriptType::WitnessV0KeyHash => "witness_v0_keyhash",
            ScriptType::WitnessV0ScriptHash => "witness_v0_scripthash",
            ScriptType::WitnessV1Taproot => "witness_v1_taproot",
            ScriptType::Multisig => "multisig",
            ScriptType::Unknown => "unknown",
        }
    }

    /// Types whose spends carry the script (redeem or witness script) as the
    /// final unlocking element.
    pub(crate) fn is_script_hash(&self) -> bool {
        matches!(self, ScriptType::ScriptHash | ScriptType::WitnessV0ScriptHash)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a locking script. Anything outside the known templates,
/// OP_RETURN and P2PK included, is [`ScriptType::Unknown`].
pub fn classify_output_script(script: &Script) -> ScriptType {
    if script.is_p2pkh() {
        ScriptType::PubKeyHash
    } else if script.is_p2sh() {
        ScriptType::ScriptHash
    } else if script.is_p2wpkh() {
        ScriptType::WitnessV0KeyHash
    } else if script.is_p2wsh() {
        ScriptType::WitnessV0ScriptHash
    } else if script.is_p2tr() {
        ScriptType::WitnessV1Taproot
    } else if is_bare_multisig(script) {
        ScriptType::Multisig
    } else {
        ScriptType::Unknown
    }
}

/// Classifies an input by the output it spends.
///
/// A P2SH spend whose scriptSig pushes a v0 witness program is reported as the
/// wrapped witness type. Without a spent output (coinbase) the input is
/// [`ScriptType::Unknown`].
pub fn classify_input(txin: &TxIn, spent: Option<&TxOut>) -> ScriptType {
    let Some(spent) = spent else {
        return ScriptType::Unknown;
    };

    match classify_output_script(&spent.script_pubkey) {
        ScriptType::ScriptHash => nested_witness_type(txin).unwrap_or(ScriptType::ScriptHash),
        other => other,
    }
}

/// Type of the witness program pushed by a P2SH-wrapped segwit scriptSig.
///
/// `script_sig: [ <OP_0 OP_PUSHBYTES_20 <20-byte hash>> ]` or
/// `script_sig: [ <OP_0 OP_PUSHBYTES_32 <32-byte hash>> ]`
fn nested_witness_type(txin: &TxIn) -> Option<ScriptType> {
    let mut instructions = txin.script_sig.instructions();
    let redeem_script = match instructions.next()? {
        Ok(Instruction::PushBytes(bytes)) => Script::from_bytes(bytes.as_bytes()),
        _ => return None,
    };
    if instructions.next().is_some() {
        return None;
    }

    if redeem_script.is_p2wpkh() {
        Some(ScriptType::WitnessV0KeyHash)
    } else if redeem_script.is_p2wsh() {
        Some(ScriptType::WitnessV0ScriptHash)
    } else {
        None
    }
}

/// Bare multisig: `OP_m <pubkey>... OP_n OP_CHECKMULTISIG` with `1 <= m <= n <= 16`
/// and exactly `n` compressed or uncompressed keys.
fn is_bare_multisig(script: &Script) -> bool {
    let Ok(instructions) = script.instructions().collect::<Result<Vec<_>, _>>() else {
        return false;
    };
    if instructions.len() < 4 {
        return false;
    }

    let last = instructions.len() - 1;
    if !matches!(instructions[last], Instruction::Op(op) if op == OP_CHECKMULTISIG) {
        return false;
    }
    let (Some(m), Some(n)) = (
        pushnum(&instructions[0]),
        pushnum(&instructions[last - 1]),
    ) else {
        return false;
    };

    let keys = &instructions[1..last - 1];
    m <= n
        && keys.len() == n as usize
        && keys.iter().all(|instruction| {
            matches!(instruction, Instruction::PushBytes(bytes) if bytes.len() == 33 || bytes.len() == 65)
        })
}

fn pushnum(instruction: &Instruction<'_>) -> Option<u8> {
    match instruction {
        Instruction::Op(op)
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8()) =>
        {
            Some(op.to_u8() - OP_PUSHNUM_1.to_u8() + 1)
        }
        _ => None,
    }
}
