//! In-memory ledger for tests.
//!
//! Holds committed transactions, registered assets, block hashes and the
//! set of spent outputs. Committing a transaction marks its inputs spent
//! and, for a recharge, records the embedded main-chain transaction hash.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use sidechain_admission::{Ledger, LedgerError, LedgerResult};
use sidechain_core::{
    Asset, AssetId, Hash256, Input, OutPoint, Output, Payload, Transaction, TxId,
};

#[derive(Default)]
struct Inner {
    transactions: HashMap<TxId, (Transaction, u32)>,
    assets: HashMap<AssetId, Asset>,
    block_hashes: HashMap<u32, Hash256>,
    spent: HashSet<OutPoint>,
    recharged: HashSet<TxId>,
    height: u32,
}

/// A [`Ledger`] backed by in-memory maps.
pub struct MockLedger {
    native_asset_id: AssetId,
    inner: RwLock<Inner>,
}

impl MockLedger {
    /// A ledger with `native` registered and `genesis` as the block at
    /// height 0.
    pub fn new(native: Asset, genesis: Hash256) -> Self {
        let native_asset_id = native.hash();
        let mut inner = Inner::default();
        inner.assets.insert(native_asset_id, native);
        inner.block_hashes.insert(0, genesis);
        Self {
            native_asset_id,
            inner: RwLock::new(inner),
        }
    }

    /// Commit `tx` in a block at `height`.
    pub fn commit(&self, tx: Transaction, height: u32) -> TxId {
        let id = tx.hash();
        let mut inner = self.inner.write().unwrap();
        for input in &tx.inputs {
            inner.spent.insert(input.previous);
        }
        if let Payload::RechargeToSideChain(payload) = &tx.payload {
            if let Ok(main_tx) = Transaction::from_bytes(&payload.main_chain_transaction) {
                inner.recharged.insert(main_tx.hash());
            }
        }
        if let Payload::RegisterAsset(payload) = &tx.payload {
            inner.assets.insert(payload.asset.hash(), payload.asset.clone());
        }
        inner.height = inner.height.max(height);
        inner.transactions.insert(id, (tx, height));
        id
    }

    pub fn register_asset(&self, asset: Asset) -> AssetId {
        let id = asset.hash();
        self.inner.write().unwrap().assets.insert(id, asset);
        id
    }

    /// Replace the registered native asset's metadata.
    pub fn set_native_precision(&self, precision: u8) {
        let mut inner = self.inner.write().unwrap();
        if let Some(asset) = inner.assets.get_mut(&self.native_asset_id) {
            asset.precision = precision;
        }
    }

    pub fn set_height(&self, height: u32) {
        self.inner.write().unwrap().height = height;
    }

    /// Mark an output spent by an in-flight transaction.
    pub fn mark_spent(&self, point: OutPoint) {
        self.inner.write().unwrap().spent.insert(point);
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.read().unwrap().transactions.len()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn native_asset_id(&self) -> AssetId {
        self.native_asset_id
    }

    async fn get_tx_reference(&self, tx: &Transaction) -> LedgerResult<Vec<(Input, Output)>> {
        let inner = self.inner.read().unwrap();
        tx.inputs
            .iter()
            .map(|input| {
                let previous = input.previous;
                inner
                    .transactions
                    .get(&previous.tx_id)
                    .and_then(|(tx, _)| tx.outputs.get(usize::from(previous.index)))
                    .map(|output| (*input, output.clone()))
                    .ok_or(LedgerError::UnknownReference(previous))
            })
            .collect()
    }

    async fn is_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool> {
        Ok(self.inner.read().unwrap().transactions.contains_key(hash))
    }

    async fn is_mainchain_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool> {
        Ok(self.inner.read().unwrap().recharged.contains(hash))
    }

    async fn get_transaction(&self, hash: &TxId) -> LedgerResult<Option<(Transaction, u32)>> {
        Ok(self.inner.read().unwrap().transactions.get(hash).cloned())
    }

    async fn get_height(&self) -> LedgerResult<u32> {
        Ok(self.inner.read().unwrap().height)
    }

    async fn get_block_hash(&self, height: u32) -> LedgerResult<Option<Hash256>> {
        Ok(self.inner.read().unwrap().block_hashes.get(&height).copied())
    }

    async fn get_assets(&self) -> LedgerResult<Vec<Asset>> {
        Ok(self.inner.read().unwrap().assets.values().cloned().collect())
    }

    async fn get_asset(&self, id: &AssetId) -> LedgerResult<Option<Asset>> {
        Ok(self.inner.read().unwrap().assets.get(id).cloned())
    }

    async fn is_double_spend(&self, tx: &Transaction) -> LedgerResult<bool> {
        let inner = self.inner.read().unwrap();
        Ok(tx.inputs.iter().any(|input| inner.spent.contains(&input.previous)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidechain_core::{Fixed64, ProgramHash, TransactionBuilder};

    #[tokio::test]
    async fn test_commit_marks_inputs_spent() {
        let ledger = MockLedger::new(Asset::new("native", 8), Hash256::digest(b"genesis"));
        let point = OutPoint::new(Hash256::digest(b"prev"), 0);
        let tx = TransactionBuilder::new(Payload::TransferAsset)
            .input(point)
            .output(Output::native(ledger.native_asset_id(), Fixed64::from_raw(1), ProgramHash::ZERO))
            .build();

        assert!(!ledger.is_double_spend(&tx).await.unwrap());
        let id = ledger.commit(tx.clone(), 3);
        assert!(ledger.is_double_spend(&tx).await.unwrap());
        assert!(ledger.is_tx_hash_duplicate(&id).await.unwrap());
        assert_eq!(ledger.get_height().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let ledger = MockLedger::new(Asset::new("native", 8), Hash256::digest(b"genesis"));
        let tx = TransactionBuilder::new(Payload::TransferAsset)
            .input(OutPoint::new(Hash256::digest(b"missing"), 0))
            .build();
        assert!(matches!(
            ledger.get_tx_reference(&tx).await,
            Err(LedgerError::UnknownReference(_))
        ));
    }
}
