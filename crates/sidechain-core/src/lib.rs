//! # Side-chain Core
//!
//! Pure primitives for side-chain transaction admission: hashes and
//! destinations, native and token amounts, transactions and their payloads,
//! canonical encoding, and signature scripts.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Transaction`] - Inputs, outputs, attributes, programs and a [`Payload`]
//! - [`Fixed64`] - Native amount at 10^-8 scale
//! - [`TokenValue`] - Arbitrary-precision amount of a registered token
//! - [`Hash256`] - Transaction, asset and block identifiers
//! - [`ProgramHash`] - Output destination, renderable as an address
//!
//! ## Canonicalization
//!
//! Transactions and proofs are encoded with deterministic CBOR. See the
//! [`canonical`] module.

pub mod amount;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod transaction;
pub mod types;

pub use amount::{
    check_amount_precise, check_token_precise, is_positive_token, Fixed64, TokenValue,
    NATIVE_PRECISION, TOKEN_PRECISION,
};
pub use canonical::unsigned_transaction_bytes;
pub use crypto::{genesis_program_hash, to_program_hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::CoreError;
pub use merkle::MerkleProof;
pub use transaction::{
    Asset, AssetType, Attribute, AttributeUsage, CoinBasePayload, IdentificationContent,
    IdentificationValue, Input, OutPoint, Output, Payload, Program, RechargeToSideChainPayload,
    RecordPayload, RegisterAssetPayload, RegisterIdentificationPayload, Transaction,
    TransactionBuilder, TransferCrossChainAssetPayload, TxType, COINBASE_INPUT_INDEX,
    SEQUENCE_FINAL,
};
pub use types::{
    AssetId, Hash256, ProgramHash, TxId, PREFIX_CROSS_CHAIN, PREFIX_MULTISIG,
    PREFIX_REGISTER_ID, PREFIX_STANDARD,
};
