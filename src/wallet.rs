use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::TxContext;
use crate::heuristics::Heuristics;
use crate::rules::RuleTable;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum WalletType {
    BitcoinCore,
    Electrum,
    BlueWallet,
    /// Coinbase wallet, and coinbase transactions
    Coinbase,
    Exodus,
    Trust,
    Trezor,
    Ledger,
    Unknown,
}

impl WalletType {
    pub const ALL: [WalletType; 9] = [
        WalletType::BitcoinCore,
        WalletType::Electrum,
        WalletType::BlueWallet,
        WalletType::Coinbase,
        WalletType::Exodus,
        WalletType::Trust,
        WalletType::Trezor,
        WalletType::Ledger,
        WalletType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::BitcoinCore => "Bitcoin Core",
            WalletType::Electrum => "Electrum",
            WalletType::BlueWallet => "Blue Wallet",
            WalletType::Coinbase => "Coinbase Wallet",
            WalletType::Exodus => "Exodus Wallet",
            WalletType::Trust => "Trust Wallet",
            WalletType::Trezor => "Trezor",
            WalletType::Ledger => "Ledger",
            WalletType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that produced a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRule {
    /// Position in the rule table
    pub index: usize,
    pub description: String,
}

/// A wallet label together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub wallet: WalletType,
    /// `None` when no rule matched
    pub rule: Option<MatchedRule>,
    pub heuristics: Heuristics,
}

/// Labels transactions with a [`RuleTable`].
#[derive(Debug, Clone, Default)]
pub struct WalletClassifier {
    rules: RuleTable,
}

impl WalletClassifier {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn classify(&self, ctx: &TxContext<'_>) -> Classification {
        let heuristics = Heuristics::new(ctx);
        match self.rules.first_match(&heuristics) {
            Some((index, rule)) => {
                debug!(
                    txid = %ctx.tx().compute_txid(),
                    wallet = %rule.wallet,
                    rule = index,
                    "{}",
                    rule.description
                );
                Classification {
                    wallet: rule.wallet,
                    rule: Some(MatchedRule {
                        index,
                        description: rule.description.clone(),
                    }),
                    heuristics,
                }
            }
            None => {
                debug!(txid = %ctx.tx().compute_txid(), "no wallet rule matched");
                Classification {
                    wallet: WalletType::Unknown,
                    rule: None,
                    heuristics,
                }
            }
        }
    }

    pub fn detect(&self, ctx: &TxContext<'_>) -> WalletType {
        self.classify(ctx).wallet
    }
}

fn default_classifier() -> &'static WalletClassifier {
    static CLASSIFIER: OnceLock<WalletClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(WalletClassifier::default)
}

/// Attempts to detect the wallet that built the transaction, using the
/// built-in rule table. Always returns a label; `Unknown` when no rule
/// matches.
pub fn detect_wallet(ctx: &TxContext<'_>) -> WalletType {
    default_classifier().detect(ctx)
}
