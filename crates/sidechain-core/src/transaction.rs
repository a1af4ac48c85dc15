//! Transactions: inputs, outputs, attributes, programs and payloads.
//!
//! A transaction is immutable once built. Its kind is the variant of its
//! [`Payload`], so the declared type and the payload can never disagree.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::amount::{Fixed64, TokenValue};
use crate::canonical::{decode, encode, unsigned_transaction_bytes};
use crate::crypto::{self, Keypair};
use crate::error::CoreError;
use crate::types::{AssetId, Hash256, ProgramHash, TxId};

/// Sequence value an input must carry to spend a time-locked output.
pub const SEQUENCE_FINAL: u32 = u32::MAX - 1;

/// Output index of the synthetic coinbase input.
pub const COINBASE_INPUT_INDEX: u16 = u16::MAX;

/// Transaction type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
    CoinBase = 0x00,
    RegisterAsset = 0x01,
    TransferAsset = 0x02,
    Record = 0x03,
    RechargeToSideChain = 0x06,
    TransferCrossChainAsset = 0x08,
    RegisterIdentification = 0x09,
}

impl TxType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::CoinBase),
            0x01 => Some(Self::RegisterAsset),
            0x02 => Some(Self::TransferAsset),
            0x03 => Some(Self::Record),
            0x06 => Some(Self::RechargeToSideChain),
            0x08 => Some(Self::TransferCrossChainAsset),
            0x09 => Some(Self::RegisterIdentification),
            _ => None,
        }
    }
}

/// Recognized attribute usage codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeUsage {
    Nonce = 0x00,
    Script = 0x20,
    Memo = 0x81,
    Description = 0x90,
    DescriptionUrl = 0x91,
    Confirmations = 0x92,
}

impl AttributeUsage {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Nonce),
            0x20 => Some(Self::Script),
            0x81 => Some(Self::Memo),
            0x90 => Some(Self::Description),
            0x91 => Some(Self::DescriptionUrl),
            0x92 => Some(Self::Confirmations),
            _ => None,
        }
    }
}

/// Reference to an output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub index: u16,
}

impl OutPoint {
    pub const fn new(tx_id: TxId, index: u16) -> Self {
        Self { tx_id, index }
    }

    /// The synthetic reference carried by a coinbase input.
    pub const fn coinbase() -> Self {
        Self {
            tx_id: Hash256::ZERO,
            index: COINBASE_INPUT_INDEX,
        }
    }

    pub fn is_coinbase_sentinel(&self) -> bool {
        self.tx_id.is_zero() && self.index == COINBASE_INPUT_INDEX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Input {
    pub previous: OutPoint,
    pub sequence: u32,
}

impl Input {
    pub const fn new(previous: OutPoint, sequence: u32) -> Self {
        Self { previous, sequence }
    }
}

/// A transaction output.
///
/// Native-asset outputs carry `value` and a zero `token_value`; every other
/// asset carries `token_value` and a zero `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub asset_id: AssetId,
    pub value: Fixed64,
    pub token_value: TokenValue,
    pub program_hash: ProgramHash,
    /// Earliest height at which the output may be spent (0 = unlocked).
    pub output_lock: u32,
}

impl Output {
    /// A native-asset output.
    pub fn native(asset_id: AssetId, value: Fixed64, program_hash: ProgramHash) -> Self {
        Self {
            asset_id,
            value,
            token_value: TokenValue::from(0),
            program_hash,
            output_lock: 0,
        }
    }

    /// A token output.
    pub fn token(asset_id: AssetId, token_value: TokenValue, program_hash: ProgramHash) -> Self {
        Self {
            asset_id,
            value: Fixed64::ZERO,
            token_value,
            program_hash,
            output_lock: 0,
        }
    }

    pub fn with_lock(mut self, height: u32) -> Self {
        self.output_lock = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Raw usage code; see [`AttributeUsage`].
    pub usage: u8,
    pub data: Bytes,
}

impl Attribute {
    pub fn new(usage: AttributeUsage, data: impl Into<Bytes>) -> Self {
        Self {
            usage: usage.to_u8(),
            data: data.into(),
        }
    }
}

/// A signature script: `code` is the redeem script, `parameter` the
/// signatures satisfying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Bytes,
    pub parameter: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    Token,
    Share,
}

/// A registered asset.
///
/// The controller is not part of the asset's identity; it is carried by the
/// registering transaction in [`RegisterAssetPayload::controller`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub description: String,
    pub precision: u8,
    pub asset_type: AssetType,
}

impl Asset {
    pub fn new(name: impl Into<String>, precision: u8) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            precision,
            asset_type: AssetType::Token,
        }
    }

    /// The asset's identity.
    pub fn hash(&self) -> AssetId {
        Hash256::digest(&encode(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinBasePayload {
    pub coinbase_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAssetPayload {
    pub asset: Asset,
    pub amount: Fixed64,
    pub controller: ProgramHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub record_type: String,
    pub record_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeToSideChainPayload {
    /// Encoded [`crate::MerkleProof`] of the main-chain transaction.
    pub merkle_proof: Bytes,
    /// Encoded main-chain [`Transaction`].
    pub main_chain_transaction: Bytes,
}

/// Maps a subset of a transaction's outputs to addresses on the other chain.
/// The three vectors are parallel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferCrossChainAssetPayload {
    pub cross_chain_addresses: Vec<String>,
    pub output_indexes: Vec<u64>,
    pub cross_chain_amounts: Vec<Fixed64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationValue {
    pub data_hash: Hash256,
    pub proof: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationContent {
    pub path: String,
    pub values: Vec<IdentificationValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterIdentificationPayload {
    pub id: String,
    pub sign: Bytes,
    pub contents: Vec<IdentificationContent>,
}

/// Transaction payload, one variant per transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    CoinBase(CoinBasePayload),
    RegisterAsset(RegisterAssetPayload),
    TransferAsset,
    Record(RecordPayload),
    RechargeToSideChain(RechargeToSideChainPayload),
    TransferCrossChainAsset(TransferCrossChainAssetPayload),
    RegisterIdentification(RegisterIdentificationPayload),
}

impl Payload {
    pub fn tx_type(&self) -> TxType {
        match self {
            Payload::CoinBase(_) => TxType::CoinBase,
            Payload::RegisterAsset(_) => TxType::RegisterAsset,
            Payload::TransferAsset => TxType::TransferAsset,
            Payload::Record(_) => TxType::Record,
            Payload::RechargeToSideChain(_) => TxType::RechargeToSideChain,
            Payload::TransferCrossChainAsset(_) => TxType::TransferCrossChainAsset,
            Payload::RegisterIdentification(_) => TxType::RegisterIdentification,
        }
    }
}

/// A transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payload_version: u8,
    pub payload: Payload,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub lock_time: u32,
    pub programs: Vec<Program>,
}

impl Transaction {
    pub fn tx_type(&self) -> TxType {
        self.payload.tx_type()
    }

    /// Content hash over everything except the programs.
    pub fn hash(&self) -> TxId {
        Hash256::digest(&unsigned_transaction_bytes(self))
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        decode(bytes)
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self.payload, Payload::CoinBase(_))
    }

    pub fn is_register_asset(&self) -> bool {
        matches!(self.payload, Payload::RegisterAsset(_))
    }

    pub fn is_recharge_to_side_chain(&self) -> bool {
        matches!(self.payload, Payload::RechargeToSideChain(_))
    }

    pub fn is_transfer_cross_chain_asset(&self) -> bool {
        matches!(self.payload, Payload::TransferCrossChainAsset(_))
    }

    /// Whether this moves value between chains.
    pub fn is_cross_chain(&self) -> bool {
        self.is_recharge_to_side_chain() || self.is_transfer_cross_chain_asset()
    }
}

/// Builder for assembling transactions.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    payload: Payload,
    payload_version: u8,
    attributes: Vec<Attribute>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    lock_time: u32,
    programs: Vec<Program>,
}

impl TransactionBuilder {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            payload_version: 0,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            programs: Vec::new(),
        }
    }

    pub fn payload_version(mut self, version: u8) -> Self {
        self.payload_version = version;
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Spend `previous` with the default sequence.
    pub fn input(mut self, previous: OutPoint) -> Self {
        self.inputs.push(Input::new(previous, u32::MAX));
        self
    }

    pub fn input_with_sequence(mut self, previous: OutPoint, sequence: u32) -> Self {
        self.inputs.push(Input::new(previous, sequence));
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn program(mut self, program: Program) -> Self {
        self.programs.push(program);
        self
    }

    /// Build without programs.
    pub fn build(self) -> Transaction {
        Transaction {
            payload_version: self.payload_version,
            payload: self.payload,
            attributes: self.attributes,
            inputs: self.inputs,
            outputs: self.outputs,
            lock_time: self.lock_time,
            programs: self.programs,
        }
    }

    /// Build and append one standard program per keypair, each signing the
    /// unsigned transaction bytes.
    pub fn sign(self, keypairs: &[&Keypair]) -> Transaction {
        let mut tx = self.build();
        let message = unsigned_transaction_bytes(&tx);
        for keypair in keypairs {
            tx.programs.push(crypto::standard_program(keypair, &message));
        }
        tx
    }
}
