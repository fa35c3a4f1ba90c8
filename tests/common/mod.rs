#![allow(dead_code)]

use std::sync::OnceLock;

use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::{
    absolute, ecdsa, transaction, Amount, CompressedPublicKey, OutPoint, ScriptBuf, Sequence,
    Transaction, TxIn, TxOut, Txid, Witness,
};
use rand::Rng;
use wallet_attribution::{ChainPosition, ScriptType, SpentOutput};

// mainnet 5d857401648a667303cde43295bce1326e6329353eac3dddf15b151e701405e7 (Electrum)
pub const ELECTRUM_TX: &str = "02000000000102ac5718a0e7b3ee13ce2f273aa9c6a04becf8a1696edb75d3217c0d3790a620860000000000fdffffff74e1d8045cfe6b823943db609ceb3aa13216a936a9e18b92e26db770a8e4eae60000000000fdffffff02f6250000000000001600145333aa7bcef7bd632edaf5a326d4c6085417282d133f0000000000001976a914c8f57d6b8bc08fa211c71b8d255e7c4b25bd432288ac02473044022037059673792d5af9ab1cf5fc8ccf3c1c1ad300e9e6c25edda7a172e455d49e07022046d2c2638c129a8c9a54ca5adb5df01bde564066c36edade43c3845b3d25940101210202ca6c82b9cc52f7a8c34de6a6ccd807d8437a8368ddf7638a2b50002e745b360247304402207b3d3c39ee66bdaa509094072ae629794bd7ef0f14694f0e3695d89ed573c57202205cc9b6d059500ccf621621a657115e33c51064efad2dcf352ad32c69b0ae6ab301210202ca6c82b9cc52f7a8c34de6a6ccd807d8437a8368ddf7638a2b50002e745b3670360c00";
pub const ELECTRUM_PREV_TXS: [&str; 2] = [
    "01000000000101b6d971c9ca363c5f901780d578bd0449d74b80bb565f367d56278c3b1601f94301000000000000000001f41400000000000016001460ac2a83f14bdc2016edf615138aabdd52d6c331024730440220560c4bdf1acc416517bd9d50ef65f0a99ac1633a5b1a7a3cb69ee486ed688a3a022079db25e85e6b34690456ad49f952302a80e1c146a7bc7af5387e92c2d4277c7a01210281bfdda07273f79522c04bff9e43c03655ebf96e482c8f3e262ccb5551c969f200000000",
    "02000000000101b6d971c9ca363c5f901780d578bd0449d74b80bb565f367d56278c3b1601f9430000000000fdffffff019e5700000000000016001460ac2a83f14bdc2016edf615138aabdd52d6c331014079a93a95b32520c99a08cfae6f1dfca31242359ca42ba56873cf2be60f472ea330ab7273753602fa362ce106287b365bae5542cb7358157641d8e2a7a052245400000000",
];

pub fn tx_from_hex(hex: &str) -> Transaction {
    deserialize(&hex::decode(hex).unwrap()).unwrap()
}

pub fn electrum() -> (Transaction, Vec<Transaction>) {
    (
        tx_from_hex(ELECTRUM_TX),
        ELECTRUM_PREV_TXS.iter().map(|hex| tx_from_hex(hex)).collect(),
    )
}

fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

/// Random txid whose displayed form starts with `first_display_byte`, for
/// controlling BIP 69 order.
pub fn txid_starting_with(first_display_byte: u8) -> Txid {
    let mut bytes: [u8; 32] = rand::random();
    bytes[31] = first_display_byte;
    Txid::from_byte_array(bytes)
}

#[derive(Debug, Clone)]
pub struct Key {
    secret: SecretKey,
    public: PublicKey,
}

impl Key {
    pub fn random() -> Self {
        let (secret, public) = secp().generate_keypair(&mut rand::thread_rng());
        Self { secret, public }
    }

    fn witness_script(&self) -> ScriptBuf {
        Builder::new()
            .push_slice(self.public.serialize())
            .push_opcode(bitcoin::opcodes::all::OP_CHECKSIG)
            .into_script()
    }

    /// Locking script of `kind` for this key.
    pub fn script(&self, kind: ScriptType) -> ScriptBuf {
        match kind {
            ScriptType::PubKeyHash => {
                ScriptBuf::new_p2pkh(&bitcoin::PublicKey::new(self.public).pubkey_hash())
            }
            ScriptType::WitnessV0KeyHash => {
                ScriptBuf::new_p2wpkh(&CompressedPublicKey(self.public).wpubkey_hash())
            }
            ScriptType::WitnessV0ScriptHash => ScriptBuf::new_p2wsh(&self.witness_script().wscript_hash()),
            ScriptType::ScriptHash => ScriptBuf::new_p2sh(&self.witness_script().script_hash()),
            ScriptType::WitnessV1Taproot => {
                ScriptBuf::new_p2tr(secp(), self.public.x_only_public_key().0, None)
            }
            ScriptType::Multisig => Builder::new()
                .push_opcode(bitcoin::opcodes::all::OP_PUSHNUM_1)
                .push_slice(self.public.serialize())
                .push_opcode(bitcoin::opcodes::all::OP_PUSHNUM_1)
                .push_opcode(bitcoin::opcodes::all::OP_CHECKMULTISIG)
                .into_script(),
            ScriptType::Unknown => ScriptBuf::new_op_return([0xde, 0xad]),
        }
    }

    /// `DER || SIGHASH_ALL` over a random message.
    pub fn sign(&self, high_r: bool) -> Vec<u8> {
        let msg = Message::from_digest(rand::random());
        let sig = if high_r {
            loop {
                let sig = secp().sign_ecdsa_with_noncedata(&msg, &self.secret, &rand::random());
                if sig.serialize_compact()[0] >= 0x80 {
                    break sig;
                }
            }
        } else {
            secp().sign_ecdsa_low_r(&msg, &self.secret)
        };
        ecdsa::Signature::sighash_all(sig).to_vec()
    }

    pub fn pubkey_bytes(&self, uncompressed: bool) -> Vec<u8> {
        if uncompressed {
            self.public.serialize_uncompressed().to_vec()
        } else {
            self.public.serialize().to_vec()
        }
    }
}

fn push(bytes: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(bytes.to_vec()).unwrap()
}

/// One signed input and the output it spends.
#[derive(Debug, Clone)]
pub struct Input {
    kind: ScriptType,
    key: Key,
    outpoint: OutPoint,
    value: u64,
    sequence: Sequence,
    position: Option<ChainPosition>,
    high_r: bool,
    uncompressed: bool,
    nested: bool,
}

impl Input {
    pub fn new(kind: ScriptType, value: u64) -> Self {
        Self {
            kind,
            key: Key::random(),
            outpoint: OutPoint::new(Txid::from_byte_array(rand::random()), 0),
            value,
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            position: None,
            high_r: false,
            uncompressed: false,
            nested: false,
        }
    }

    pub fn outpoint(mut self, txid: Txid, vout: u32) -> Self {
        self.outpoint = OutPoint::new(txid, vout);
        self
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = Sequence(sequence);
        self
    }

    pub fn at(mut self, height: u32, tx_index: u32) -> Self {
        self.position = Some(ChainPosition::new(height, tx_index));
        self
    }

    pub fn high_r(mut self) -> Self {
        self.high_r = true;
        self
    }

    pub fn uncompressed(mut self) -> Self {
        self.uncompressed = true;
        self
    }

    /// P2SH-wrapped P2WPKH.
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Script this input spends from.
    pub fn spent_script(&self) -> ScriptBuf {
        if self.nested {
            let program = self.key.script(ScriptType::WitnessV0KeyHash);
            ScriptBuf::new_p2sh(&program.script_hash())
        } else {
            self.key.script(self.kind)
        }
    }

    fn into_parts(self) -> (TxIn, SpentOutput) {
        let signature = self.key.sign(self.high_r);
        let pubkey = self.key.pubkey_bytes(self.uncompressed);
        let mut txin = TxIn {
            previous_output: self.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: self.sequence,
            witness: Witness::new(),
        };

        match self.kind {
            ScriptType::PubKeyHash => {
                txin.script_sig = Builder::new()
                    .push_slice(push(&signature))
                    .push_slice(push(&pubkey))
                    .into_script();
            }
            ScriptType::WitnessV0KeyHash => {
                txin.witness = Witness::from_slice(&[signature, pubkey]);
                if self.nested {
                    let program = self.key.script(ScriptType::WitnessV0KeyHash);
                    txin.script_sig = Builder::new()
                        .push_slice(push(program.as_bytes()))
                        .into_script();
                }
            }
            ScriptType::WitnessV0ScriptHash => {
                txin.witness =
                    Witness::from_slice(&[signature, self.key.witness_script().to_bytes()]);
            }
            ScriptType::ScriptHash => {
                txin.script_sig = Builder::new()
                    .push_slice(push(&signature))
                    .push_slice(push(self.key.witness_script().as_bytes()))
                    .into_script();
            }
            ScriptType::WitnessV1Taproot => {
                txin.witness = Witness::from_slice(&[[0x01u8; 64]]);
            }
            ScriptType::Multisig => {
                txin.script_sig = Builder::new()
                    .push_int(0)
                    .push_slice(push(&signature))
                    .into_script();
            }
            ScriptType::Unknown => {}
        }

        let spent = SpentOutput {
            outpoint: self.outpoint,
            txout: TxOut {
                value: Amount::from_sat(self.value),
                script_pubkey: self.spent_script(),
            },
            position: self.position,
        };
        (txin, spent)
    }
}

#[derive(Debug, Clone)]
pub struct TxBuilder {
    tx: Transaction,
    spent: Vec<SpentOutput>,
}

impl TxBuilder {
    pub fn new(version: i32) -> Self {
        Self {
            tx: Transaction {
                version: transaction::Version(version),
                lock_time: absolute::LockTime::ZERO,
                input: vec![],
                output: vec![],
            },
            spent: vec![],
        }
    }

    pub fn coinbase(value: u64) -> Self {
        let mut builder = Self::new(2);
        builder.tx.input.push(TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(vec![0x03, 0x70, 0x36, 0x0c]),
            sequence: Sequence::MAX,
            witness: Witness::from_slice(&[[0u8; 32]]),
        });
        builder.pay(ScriptType::WitnessV0KeyHash, value)
    }

    pub fn lock_time(mut self, height: u32) -> Self {
        self.tx.lock_time = absolute::LockTime::from_consensus(height);
        self
    }

    pub fn input(mut self, input: Input) -> Self {
        let (txin, spent) = input.into_parts();
        self.tx.input.push(txin);
        self.spent.push(spent);
        self
    }

    pub fn output(mut self, value: u64, script_pubkey: ScriptBuf) -> Self {
        self.tx.output.push(TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        });
        self
    }

    /// Pays `value` to a fresh key of type `kind`.
    pub fn pay(self, kind: ScriptType, value: u64) -> Self {
        self.output(value, Key::random().script(kind))
    }

    pub fn build(self) -> (Transaction, Vec<SpentOutput>) {
        (self.tx, self.spent)
    }
}

const SPENDABLE: [ScriptType; 6] = [
    ScriptType::PubKeyHash,
    ScriptType::ScriptHash,
    ScriptType::WitnessV0KeyHash,
    ScriptType::WitnessV0ScriptHash,
    ScriptType::WitnessV1Taproot,
    ScriptType::Multisig,
];

/// A transaction of random shape: version, locktime, sequence numbers,
/// input and output types, values and signature encodings all vary.
/// One in ten is a coinbase.
pub fn random_tx(rng: &mut impl Rng) -> (Transaction, Vec<SpentOutput>) {
    if rng.gen_ratio(1, 10) {
        let mut builder = TxBuilder::coinbase(rng.gen_range(1..5_000_000_000));
        for _ in 0..rng.gen_range(0..3) {
            builder = builder.output(0, ScriptBuf::new_op_return([0xaa; 4]));
        }
        return builder.build();
    }

    let mut builder = TxBuilder::new(rng.gen_range(1..=3));
    if rng.gen_bool(0.5) {
        builder = builder.lock_time(rng.gen_range(1..900_000));
    }
    for _ in 0..rng.gen_range(1..=5) {
        let kind = SPENDABLE[rng.gen_range(0..SPENDABLE.len())];
        let mut input = Input::new(kind, rng.gen_range(1_000..10_000_000))
            .sequence(rng.gen_range(0xfffffffd..=0xffffffff));
        if kind == ScriptType::WitnessV0KeyHash && rng.gen_bool(0.3) {
            input = input.nested();
        }
        if rng.gen_bool(0.2) {
            input = input.high_r();
        }
        if kind == ScriptType::PubKeyHash && rng.gen_bool(0.2) {
            input = input.uncompressed();
        }
        if rng.gen_bool(0.5) {
            input = input.at(rng.gen_range(1..900_000), rng.gen_range(0..3_000));
        }
        builder = builder.input(input);
    }
    for _ in 0..rng.gen_range(0..=5) {
        let kind = SPENDABLE[rng.gen_range(0..SPENDABLE.len())];
        let value = if rng.gen_bool(0.5) {
            rng.gen_range(1..1_000) * 1_000
        } else {
            rng.gen_range(546..10_000_000)
        };
        builder = builder.pay(kind, value);
    }
    builder.build()
}
