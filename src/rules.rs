//! Wallet rules as data.
//!
//! A [`RuleTable`] is an ordered list of [`Rule`]s. Each rule names a wallet
//! and a conjunction of [`Condition`]s over the [`Heuristics`] of a
//! transaction; the first rule whose conditions all hold decides the label.
//! Tables can be loaded from TOML:
//!
//! ```toml
//! [[rules]]
//! wallet = "ELECTRUM"
//! description = "Electrum"
//! all_of = [
//!     { signal = "anti_fee_sniping" },
//!     { signal = "tx_version", value = 2 },
//!     { signal = "not", value = { signal = "sends_type", value = "witness_v1_taproot" } },
//!     { signal = "any_of", value = [{ signal = "input_order", value = "SINGLE" }, { signal = "input_order", value = "BIP69" }] },
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::heuristics::Heuristics;
use crate::input::InputSortingType;
use crate::output::{ChangeTypeMatch, OutputStructureType};
use crate::script::ScriptType;
use crate::wallet::WalletType;

/// A predicate over the signals of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Coinbase,
    CompressedKeysOnly,
    AntiFeeSniping,
    LowROnly,
    SignalsRbf,
    MultiTypeVin,
    AddressReuse,
    ChangeFound,
    ChangeTypeMatchedInputs,
    CreatesOpReturn,
    TxVersion(i32),
    /// Some input spends this type
    SpendsType(ScriptType),
    /// Some output pays this type
    SendsType(ScriptType),
    InputOrder(InputSortingType),
    OutputStructure(OutputStructureType),
    ChangeTypeMatch(ChangeTypeMatch),
    Not(Box<Condition>),
    AnyOf(Vec<Condition>),
    AllOf(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, heuristics: &Heuristics) -> bool {
        match self {
            Condition::Coinbase => heuristics.coinbase,
            Condition::CompressedKeysOnly => heuristics.compressed_keys_only,
            Condition::AntiFeeSniping => heuristics.anti_fee_sniping,
            Condition::LowROnly => heuristics.low_r_only,
            Condition::SignalsRbf => heuristics.signals_rbf,
            Condition::MultiTypeVin => heuristics.multi_type_vin,
            Condition::AddressReuse => heuristics.address_reuse,
            Condition::ChangeFound => heuristics.change_found(),
            Condition::ChangeTypeMatchedInputs => heuristics.change_type_matched_inputs,
            Condition::CreatesOpReturn => heuristics.creates_op_return,
            Condition::TxVersion(version) => heuristics.tx_version == *version,
            Condition::SpendsType(script_type) => heuristics.spends(*script_type),
            Condition::SendsType(script_type) => heuristics.sends(*script_type),
            Condition::InputOrder(order) => heuristics.input_order.contains(order),
            Condition::OutputStructure(structure) => {
                heuristics.output_structure.contains(structure)
            }
            Condition::ChangeTypeMatch(change_match) => {
                heuristics.change_type_match == *change_match
            }
            Condition::Not(condition) => !condition.holds(heuristics),
            Condition::AnyOf(conditions) => conditions.iter().any(|c| c.holds(heuristics)),
            Condition::AllOf(conditions) => conditions.iter().all(|c| c.holds(heuristics)),
        }
    }

    pub fn not(condition: Condition) -> Condition {
        Condition::Not(Box::new(condition))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub wallet: WalletType,
    pub description: String,
    /// Conditions that must all hold. An empty list always matches.
    #[serde(default)]
    pub all_of: Vec<Condition>,
}

impl Rule {
    pub fn new(wallet: WalletType, description: impl Into<String>, all_of: Vec<Condition>) -> Self {
        Self {
            wallet,
            description: description.into(),
            all_of,
        }
    }

    pub fn matches(&self, heuristics: &Heuristics) -> bool {
        self.all_of.iter().all(|condition| condition.holds(heuristics))
    }
}

/// Ordered rules; earlier rules win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
struct RawRuleTable {
    #[serde(default)]
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Fails if a rule without conditions is followed by other rules, since
    /// they could never match.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        if let Some(index) = rules
            .iter()
            .take(rules.len().saturating_sub(1))
            .position(|rule| rule.all_of.is_empty())
        {
            return Err(Error::UnconditionalRule { index });
        }
        Ok(Self { rules })
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawRuleTable = toml::from_str(s)?;
        Self::new(raw.rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule that matches, with its position in the table.
    pub fn first_match(&self, heuristics: &Heuristics) -> Option<(usize, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(heuristics))
    }
}

/// Change, when there is any, comes last.
fn change_last_if_found() -> Condition {
    Condition::AnyOf(vec![
        Condition::not(Condition::ChangeFound),
        Condition::OutputStructure(OutputStructureType::ChangeLast),
    ])
}

fn input_order_any(orders: &[InputSortingType]) -> Condition {
    Condition::AnyOf(orders.iter().copied().map(Condition::InputOrder).collect())
}

fn output_structure_any(structures: &[OutputStructureType]) -> Condition {
    Condition::AnyOf(
        structures
            .iter()
            .copied()
            .map(Condition::OutputStructure)
            .collect(),
    )
}

impl Default for RuleTable {
    fn default() -> Self {
        use crate::input::InputSortingType as In;
        use crate::output::OutputStructureType as Out;
        use crate::rules::Condition as C;
        use crate::script::ScriptType as St;

        let not = Condition::not;
        let rules = vec![
            Rule::new(WalletType::Coinbase, "Coinbase transaction", vec![C::Coinbase]),
            Rule::new(
                WalletType::Unknown,
                "Uncompressed public key(s)",
                vec![not(C::CompressedKeysOnly)],
            ),
            Rule::new(
                WalletType::Unknown,
                "Non-standard nVersion number",
                vec![not(C::AnyOf(vec![C::TxVersion(1), C::TxVersion(2)]))],
            ),
            Rule::new(
                WalletType::Electrum,
                "Electrum: anti-fee-sniping, nVersion 2, low-r, RBF, BIP 69",
                vec![
                    C::AntiFeeSniping,
                    C::TxVersion(2),
                    C::LowROnly,
                    C::SignalsRbf,
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::MultiTypeVin),
                    not(C::AddressReuse),
                    input_order_any(&[In::Single, In::Bip69]),
                    output_structure_any(&[Out::Single, Out::Bip69]),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::BitcoinCore,
                "Bitcoin Core: anti-fee-sniping, nVersion 2, low-r, RBF",
                vec![
                    C::AntiFeeSniping,
                    C::TxVersion(2),
                    C::LowROnly,
                    C::SignalsRbf,
                    not(C::AddressReuse),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesInputs)),
                ],
            ),
            Rule::new(
                WalletType::Trezor,
                "Trezor: nVersion 1, RBF, BIP 69",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(1),
                    C::SignalsRbf,
                    not(C::MultiTypeVin),
                    not(C::AddressReuse),
                    not(C::SpendsType(St::WitnessV0ScriptHash)),
                    input_order_any(&[In::Single, In::Bip69]),
                    output_structure_any(&[Out::Single, Out::Bip69]),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::Ledger,
                "Ledger: nVersion 1, RBF, historical input order, change last",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(1),
                    C::SignalsRbf,
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::CreatesOpReturn),
                    not(C::MultiTypeVin),
                    not(C::AddressReuse),
                    input_order_any(&[In::Single, In::Historical]),
                    not(C::OutputStructure(Out::Multi)),
                    change_last_if_found(),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::Trust,
                "Trust: nVersion 1, RBF, address reuse",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(1),
                    C::SignalsRbf,
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::SpendsType(St::PubKeyHash)),
                    not(C::SpendsType(St::WitnessV0ScriptHash)),
                    not(C::CreatesOpReturn),
                    not(C::MultiTypeVin),
                    C::AddressReuse,
                    not(C::OutputStructure(Out::Multi)),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::BlueWallet,
                "BlueWallet: nVersion 2, RBF, change last",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(2),
                    C::SignalsRbf,
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::CreatesOpReturn),
                    not(C::MultiTypeVin),
                    not(C::AddressReuse),
                    change_last_if_found(),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::Exodus,
                "Exodus: nVersion 2, no RBF, address reuse",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(2),
                    not(C::SignalsRbf),
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::SpendsType(St::PubKeyHash)),
                    not(C::SpendsType(St::WitnessV0ScriptHash)),
                    not(C::CreatesOpReturn),
                    not(C::MultiTypeVin),
                    C::AddressReuse,
                    not(C::OutputStructure(Out::Multi)),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
            Rule::new(
                WalletType::Coinbase,
                "Coinbase wallet: nVersion 2, no RBF, change last",
                vec![
                    not(C::AntiFeeSniping),
                    C::TxVersion(2),
                    not(C::SignalsRbf),
                    not(C::SendsType(St::WitnessV1Taproot)),
                    not(C::SpendsType(St::WitnessV1Taproot)),
                    not(C::SpendsType(St::WitnessV0ScriptHash)),
                    not(C::CreatesOpReturn),
                    not(C::AddressReuse),
                    not(C::OutputStructure(Out::Multi)),
                    change_last_if_found(),
                    not(C::ChangeTypeMatch(ChangeTypeMatch::MatchesOutputs)),
                ],
            ),
        ];

        Self { rules }
    }
}
