//! Error types for transaction admission.
//!
//! [`ErrorKind`] is the categorical verdict a phase returns; the numeric
//! codes are stable and shared with peers. [`ValidationError`] carries the
//! detailed reason a single rule failed and is only ever logged.

use std::fmt;

use sidechain_core::{AssetId, CoreError, Fixed64, OutPoint, TxId};
use sidechain_store::StoreError;
use thiserror::Error;

/// Code reported for an accepted transaction.
pub const SUCCESS_CODE: u32 = 0;

/// Why a transaction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InvalidOutput,
    AssetPrecision,
    TransactionBalance,
    AttributeProgram,
    TransactionSignature,
    TransactionPayload,
    DoubleSpend,
    TxHashDuplicate,
    TransactionSize,
    UnknownReferencedTx,
    InvalidReferencedTx,
    IneffectiveCoinbase,
    UTXOLocked,
    RechargeToSideChain,
}

impl ErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::InvalidInput => 45003,
            ErrorKind::InvalidOutput => 45004,
            ErrorKind::AssetPrecision => 45005,
            ErrorKind::TransactionBalance => 45006,
            ErrorKind::AttributeProgram => 45007,
            ErrorKind::TransactionSignature => 45008,
            ErrorKind::TransactionPayload => 45009,
            ErrorKind::DoubleSpend => 45010,
            ErrorKind::TxHashDuplicate => 45011,
            ErrorKind::TransactionSize => 45013,
            ErrorKind::UnknownReferencedTx => 45014,
            ErrorKind::InvalidReferencedTx => 45015,
            ErrorKind::IneffectiveCoinbase => 45016,
            ErrorKind::UTXOLocked => 45017,
            ErrorKind::RechargeToSideChain => 45018,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            45003 => ErrorKind::InvalidInput,
            45004 => ErrorKind::InvalidOutput,
            45005 => ErrorKind::AssetPrecision,
            45006 => ErrorKind::TransactionBalance,
            45007 => ErrorKind::AttributeProgram,
            45008 => ErrorKind::TransactionSignature,
            45009 => ErrorKind::TransactionPayload,
            45010 => ErrorKind::DoubleSpend,
            45011 => ErrorKind::TxHashDuplicate,
            45013 => ErrorKind::TransactionSize,
            45014 => ErrorKind::UnknownReferencedTx,
            45015 => ErrorKind::InvalidReferencedTx,
            45016 => ErrorKind::IneffectiveCoinbase,
            45017 => ErrorKind::UTXOLocked,
            45018 => ErrorKind::RechargeToSideChain,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

impl std::error::Error for ErrorKind {}

/// Numeric code of a phase result.
pub fn verdict_code(result: &std::result::Result<(), ErrorKind>) -> u32 {
    match result {
        Ok(()) => SUCCESS_CODE,
        Err(kind) => kind.code(),
    }
}

/// Failures of the ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An input references an output the ledger does not know.
    #[error("unknown reference {0:?}")]
    UnknownReference(OutPoint),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Failures computing a fee map.
#[derive(Debug, Error)]
pub enum FeeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("malformed main-chain transaction: {0}")]
    MalformedMainChainTx(CoreError),

    #[error("main-chain transaction does not carry a cross-chain payload")]
    NotCrossChainPayload,

    #[error("cross-chain payload arrays are inconsistent")]
    MalformedCrossChainPayload,

    #[error("output address cannot be rendered: {0}")]
    UnrenderableAddress(CoreError),

    #[error("main-chain output index {0} out of range")]
    OutputIndexOutOfRange(u64),

    #[error("fee amount overflow")]
    Overflow,
}

/// Chain parameter errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse chain parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid chain parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// The detailed reason a single validation rule failed.
#[derive(Debug, Error)]
pub enum ValidationError {
    // Size
    #[error("invalid transaction size: {0} bytes")]
    InvalidSize(usize),

    // Inputs
    #[error("coinbase must have exactly one input, got {0}")]
    CoinbaseInputCount(usize),

    #[error("invalid coinbase input")]
    InvalidCoinbaseInput,

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("input {0} references the coinbase sentinel")]
    SentinelInput(usize),

    #[error("duplicated input {0:?}")]
    DuplicateInput(OutPoint),

    // Outputs
    #[error("coinbase needs at least 2 outputs, got {0}")]
    CoinbaseOutputCount(usize),

    #[error("foundation reward {foundation} is below 30% of {total}")]
    FoundationRewardTooLow { foundation: Fixed64, total: Fixed64 },

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("output {0} has a null asset id")]
    NullAssetId(usize),

    #[error("output {0} is not a valid native-asset output")]
    InvalidNativeOutput(usize),

    #[error("output {0} is not a valid token output")]
    InvalidTokenOutput(usize),

    #[error("cross-chain transaction output {0} uses a non-native asset")]
    CrossChainNonNativeAsset(usize),

    #[error("output {0} pays an unrecognized address kind")]
    InvalidOutputAddress(usize),

    // Precision
    #[error("asset {0} is not registered")]
    UnknownAsset(AssetId),

    #[error("output {index} value is finer than asset precision {precision}")]
    OutOfPrecision { index: usize, precision: u8 },

    // Attributes and programs
    #[error("invalid attribute usage {0:#04x}")]
    InvalidAttributeUsage(u8),

    #[error("program {0} has empty code")]
    EmptyProgramCode(usize),

    #[error("program {0} has empty parameter")]
    EmptyProgramParameter(usize),

    #[error("program {index} code is invalid: {source}")]
    InvalidProgramCode { index: usize, source: CoreError },

    // Payload
    #[error("asset precision {0} outside configured bounds")]
    InvalidAssetPrecision(u8),

    #[error("registered amount {0} is finer than asset precision")]
    RegisterAmountOutOfPrecision(Fixed64),

    #[error("payload does not match the transaction kind")]
    WrongPayload,

    // Signatures
    #[error("signature check failed: {0}")]
    Signature(String),

    // Recharge
    #[error("exchange rate {0} is not positive")]
    InvalidExchangeRate(f64),

    #[error("malformed merkle proof: {0}")]
    MalformedProof(CoreError),

    #[error("malformed main-chain transaction: {0}")]
    MalformedMainChainTx(CoreError),

    #[error("main-chain transaction {0} already recharged")]
    DuplicateMainChainTx(TxId),

    #[error("main-chain transaction does not carry a cross-chain payload")]
    MainChainPayloadNotCrossChain,

    #[error("genesis block hash unavailable")]
    MissingGenesisBlock,

    #[error("cross-chain payload arrays are inconsistent")]
    InvalidCrossChainPayload,

    #[error("cross-chain output index {0} invalid")]
    InvalidCrossChainIndex(u64),

    #[error("cross-chain amount {index} out of range")]
    InvalidCrossChainAmount { index: usize },

    #[error("invalid cross-chain address {0}")]
    InvalidCrossChainAddress(String),

    #[error("no output pays {amount} to {address}")]
    MissingRechargeOutput { address: String, amount: Fixed64 },

    #[error("output {0} has a negative value")]
    NegativeOutputValue(usize),

    #[error("recharge outputs total {actual}, expected {expected}")]
    RechargeTotalMismatch { expected: Fixed64, actual: Fixed64 },

    // Transfer cross-chain
    #[error("{declared} cross-chain addresses declared, {actual} null-destination outputs")]
    CrossChainCountMismatch { declared: usize, actual: usize },

    #[error("cross-chain output {0} does not have the null destination")]
    CrossChainOutputNotNull(u64),

    #[error("cross-chain fee {fee} below minimum {min}")]
    InsufficientCrossChainFee { fee: Fixed64, min: Fixed64 },

    // Asset registration
    #[error("asset name {0:?} already registered")]
    AssetNameTaken(String),

    #[error("output {0} of the new asset does not pay the controller")]
    ControllerMismatch(usize),

    #[error("registered outputs total {actual}, expected {expected}")]
    RegisterAmountMismatch { expected: String, actual: String },

    // Double spend / duplicates
    #[error("transaction {0} already in ledger")]
    DuplicateTransaction(TxId),

    #[error("transaction spends an output already spent")]
    DoubleSpend,

    // UTXO lock
    #[error("input {0:?} spends a locked output without the final sequence")]
    InvalidSequence(OutPoint),

    #[error("output locked until {lock}, transaction lock time {lock_time}")]
    OutputLocked { lock: u32, lock_time: u32 },

    // Fees
    #[error("transaction fee {fee} below minimum {min}")]
    InsufficientFee { fee: Fixed64, min: Fixed64 },

    #[error("token amount is not balanced")]
    TokenUnbalanced,

    #[error("amount overflow")]
    AmountOverflow,

    // Referenced outputs
    #[error("referenced transaction {0} not found")]
    UnknownReferencedTx(TxId),

    #[error("referenced output {0:?} is invalid")]
    InvalidReferencedOutput(OutPoint),

    #[error("coinbase {0} is not mature")]
    ImmatureCoinbase(TxId),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("fee error: {0}")]
    Fee(#[from] FeeError),
}

/// Result type for a single validation rule.
pub type Result<T> = std::result::Result<T, ValidationError>;
