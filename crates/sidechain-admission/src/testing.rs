//! In-crate ledger stub for unit tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sidechain_core::{
    Asset, AssetId, Hash256, Input, OutPoint, Output, Payload, Transaction, TransactionBuilder, TxId,
};

use crate::error::LedgerError;
use crate::ledger::{Ledger, LedgerResult};

#[derive(Default)]
pub(crate) struct StubLedger {
    pub transactions: HashMap<TxId, (Transaction, u32)>,
    pub assets: HashMap<AssetId, Asset>,
    pub height: u32,
    pub genesis: Option<Hash256>,
    pub recharged: HashSet<TxId>,
}

impl StubLedger {
    pub const NATIVE: AssetId = Hash256([0x11; 32]);

    /// A ledger holding one committed transaction that creates `outputs`.
    pub fn funded(outputs: Vec<Output>) -> (Self, Vec<OutPoint>) {
        let mut builder = TransactionBuilder::new(Payload::TransferAsset)
            .input(OutPoint::new(Hash256::digest(b"stub-root"), 0));
        for output in outputs {
            builder = builder.output(output);
        }
        let funding = builder.build();
        let id = funding.hash();
        let points = (0..funding.outputs.len() as u16)
            .map(|i| OutPoint::new(id, i))
            .collect();

        let mut ledger = Self {
            height: 1,
            ..Self::default()
        };
        ledger.assets.insert(Self::NATIVE, Asset::new("native", 8));
        ledger.transactions.insert(id, (funding, 1));
        (ledger, points)
    }
}

#[async_trait]
impl Ledger for StubLedger {
    fn native_asset_id(&self) -> AssetId {
        Self::NATIVE
    }

    async fn get_tx_reference(&self, tx: &Transaction) -> LedgerResult<Vec<(Input, Output)>> {
        tx.inputs
            .iter()
            .map(|input| {
                let previous = input.previous;
                self.transactions
                    .get(&previous.tx_id)
                    .and_then(|(tx, _)| tx.outputs.get(previous.index as usize))
                    .map(|output| (*input, output.clone()))
                    .ok_or(LedgerError::UnknownReference(previous))
            })
            .collect()
    }

    async fn is_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool> {
        Ok(self.transactions.contains_key(hash))
    }

    async fn is_mainchain_tx_hash_duplicate(&self, hash: &TxId) -> LedgerResult<bool> {
        Ok(self.recharged.contains(hash))
    }

    async fn get_transaction(&self, hash: &TxId) -> LedgerResult<Option<(Transaction, u32)>> {
        Ok(self.transactions.get(hash).cloned())
    }

    async fn get_height(&self) -> LedgerResult<u32> {
        Ok(self.height)
    }

    async fn get_block_hash(&self, height: u32) -> LedgerResult<Option<Hash256>> {
        Ok(if height == 0 { self.genesis } else { None })
    }

    async fn get_assets(&self) -> LedgerResult<Vec<Asset>> {
        Ok(self.assets.values().cloned().collect())
    }

    async fn get_asset(&self, id: &AssetId) -> LedgerResult<Option<Asset>> {
        Ok(self.assets.get(id).cloned())
    }

    async fn is_double_spend(&self, _tx: &Transaction) -> LedgerResult<bool> {
        Ok(false)
    }
}
