//! # Side-chain Admission
//!
//! Decides whether a candidate transaction may enter the side-chain ledger.
//!
//! ## Overview
//!
//! - **Sanity checks**: self-contained shape rules (size, inputs, outputs,
//!   precision, attributes and programs, payload)
//! - **Context checks**: rules against committed state (duplicates,
//!   signatures, cross-chain reconciliation, double spends, time locks, fees,
//!   referenced outputs)
//! - **Fee accounting**: the signed per-asset balance of a transaction
//! - **Cross-chain verification**: recharges from the main chain and
//!   transfers back to it
//!
//! ## Lifecycle
//!
//! `Received → SanityChecked → {AcceptedCoinbase | ContextChecking} → {Accepted | Rejected}`.
//! Rejection is terminal for a transaction instance.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sidechain_admission::{ChainParams, Ledger, TxValidator, Verdict};
//! use sidechain_admission::core::Transaction;
//!
//! async fn example<L: Ledger>(ledger: Arc<L>, tx: Transaction) {
//!     let params = ChainParams::from_json(r#"{"exchange_rate": 1.0}"#).unwrap();
//!     let validator = TxValidator::new(ledger, params);
//!
//!     match validator.admit(&tx).await {
//!         Verdict::Rejected(kind) => println!("rejected with code {}", kind.code()),
//!         _ => println!("accepted"),
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sidechain_admission::core` - Transactions, amounts, hashes, scripts
//! - `sidechain_admission::store` - Key/value storage and the staged state cache

pub mod config;
pub mod crosschain;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod signature;
pub mod validator;

#[cfg(test)]
mod testing;

// Re-export component crates
pub use sidechain_core as core;
pub use sidechain_store as store;

// Re-export main types for convenience
pub use config::ChainParams;
pub use crosschain::CrossChainVerifier;
pub use error::{
    verdict_code, ConfigError, ErrorKind, FeeError, LedgerError, ValidationError, SUCCESS_CODE,
};
pub use fee::{FeeHelper, FeeMap};
pub use ledger::{Ledger, LedgerResult};
pub use signature::{ProgramVerifier, SignatureVerifier};
pub use validator::{TxValidator, Verdict};
