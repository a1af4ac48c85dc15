//! Ledger trait: the read-only view of committed chain state that
//! admission checks run against.
//!
//! The surrounding node provides the implementation. Every method takes
//! `&self` so many checks can share one frozen view concurrently; the
//! implementation is responsible for serializing acceptance decisions so
//! two conflicting transactions are never both marked accepted.

use async_trait::async_trait;
use sidechain_core::{Asset, AssetId, Hash256, Input, Output, Transaction, TxId};

use crate::error::LedgerError;

/// Result type for ledger lookups.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Id of the chain's native asset.
    fn native_asset_id(&self) -> AssetId;

    /// Resolve every input of `tx` to the output it spends, in input order.
    ///
    /// Fails with [`LedgerError::UnknownReference`] if any input cannot be
    /// resolved.
    async fn get_tx_reference(&self, tx: &Transaction) -> LedgerResult<Vec<(Input, Output)>>;

    /// Whether a transaction with this hash is already committed.
    async fn is_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool>;

    /// Whether a recharge embedding this main-chain transaction is committed.
    async fn is_mainchain_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool>;

    /// A committed transaction and the height of its block.
    async fn get_transaction(&self, hash: &TxId) -> LedgerResult<Option<(Transaction, u32)>>;

    /// Current chain height.
    async fn get_height(&self) -> LedgerResult<u32>;

    async fn get_block_hash(&self, height: u32) -> LedgerResult<Option<Hash256>>;

    /// All registered assets.
    async fn get_assets(&self) -> LedgerResult<Vec<Asset>>;

    async fn get_asset(&self, id: &AssetId) -> LedgerResult<Option<Asset>>;

    /// Whether any input of `tx` is already spent or spent by an in-flight
    /// transaction.
    async fn is_double_spend(&self, tx: &Transaction) -> LedgerResult<bool>;
}
