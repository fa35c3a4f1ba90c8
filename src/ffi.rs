//! Foreign-language bindings over hex-encoded transactions.

use bitcoin::consensus::deserialize;
use bitcoin::Transaction;

use crate::context::TxContext;
use crate::wallet::{detect_wallet, WalletType};

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum FfiError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid transaction: {0}")]
    Decode(#[from] bitcoin::consensus::encode::Error),

    #[error(transparent)]
    Context(#[from] crate::error::Error),
}

fn decode_tx(tx_hex: &str) -> Result<Transaction, FfiError> {
    let bytes = hex::decode(tx_hex.trim())?;
    Ok(deserialize(&bytes)?)
}

/// Detects the wallet behind `tx_hex`. `prev_tx_hexes` must contain every
/// transaction whose outputs `tx_hex` spends, in any order.
#[uniffi::export]
pub fn detect_wallet_from_hex(
    tx_hex: String,
    prev_tx_hexes: Vec<String>,
) -> Result<WalletType, FfiError> {
    let tx = decode_tx(&tx_hex)?;
    let prev_txs = prev_tx_hexes
        .iter()
        .map(|prev_tx_hex| decode_tx(prev_tx_hex))
        .collect::<Result<Vec<_>, _>>()?;

    let ctx = TxContext::from_prev_txs(&tx, &prev_txs)?;
    Ok(detect_wallet(&ctx))
}
