//! Test fixtures and helpers.
//!
//! Common setup code for scenario tests: a ledger with a native asset and
//! a genesis block, well-known keys, and builders for each transaction kind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sidechain_admission::{ChainParams, TxValidator};
use sidechain_core::{
    genesis_program_hash, Asset, AssetId, CoinBasePayload, Fixed64, Hash256, Keypair, MerkleProof,
    OutPoint, Output, Payload, ProgramHash, RechargeToSideChainPayload, TokenValue, Transaction,
    TransactionBuilder, TransferCrossChainAssetPayload,
};

use crate::ledger::MockLedger;

/// Height the fixture ledger starts at.
pub const START_HEIGHT: u32 = 1;

/// A ledger plus the keys and parameters most scenarios need.
pub struct ChainFixture {
    pub ledger: Arc<MockLedger>,
    pub params: ChainParams,
    /// Owns every output created by the `fund*` helpers.
    pub owner: Keypair,
    pub recipient: Keypair,
    pub foundation: Keypair,
    pub genesis: Hash256,
    nonce: AtomicU64,
}

impl ChainFixture {
    pub fn new() -> Self {
        Self::with_params(ChainParams::default())
    }

    /// Build with `params`; the foundation address is always the fixture's.
    pub fn with_params(mut params: ChainParams) -> Self {
        let foundation = Keypair::from_seed(&[0xf0; 32]);
        params.foundation_address = foundation.program_hash();
        let genesis = Hash256::digest(b"sidechain genesis block");
        let ledger = MockLedger::new(Asset::new("native", 8), genesis);
        ledger.set_height(START_HEIGHT);
        Self {
            ledger: Arc::new(ledger),
            params,
            owner: Keypair::from_seed(&[0x01; 32]),
            recipient: Keypair::from_seed(&[0x02; 32]),
            foundation,
            genesis,
            nonce: AtomicU64::new(0),
        }
    }

    pub fn native(&self) -> AssetId {
        use sidechain_admission::Ledger;
        self.ledger.native_asset_id()
    }

    pub fn validator(&self) -> TxValidator<MockLedger> {
        TxValidator::new(self.ledger.clone(), self.params.clone())
    }

    /// A fresh outpoint that the ledger does not know.
    fn unique_root(&self) -> OutPoint {
        let n = self.nonce.fetch_add(1, Ordering::Relaxed);
        OutPoint::new(Hash256::digest(&n.to_le_bytes()), 0)
    }

    /// Commit a transaction creating `outputs` and return their outpoints.
    pub fn fund_outputs(&self, outputs: Vec<Output>) -> Vec<OutPoint> {
        let mut builder = TransactionBuilder::new(Payload::TransferAsset).input(self.unique_root());
        for output in outputs {
            builder = builder.output(output);
        }
        let tx = builder.build();
        let count = tx.outputs.len() as u16;
        let id = self.ledger.commit(tx, START_HEIGHT);
        (0..count).map(|i| OutPoint::new(id, i)).collect()
    }

    /// Commit a native output of `value` owned by the fixture owner.
    pub fn fund(&self, value: Fixed64) -> OutPoint {
        self.fund_outputs(vec![Output::native(self.native(), value, self.owner.program_hash())])[0]
    }

    /// Commit a token output owned by the fixture owner.
    pub fn fund_token(&self, asset_id: AssetId, value: TokenValue) -> OutPoint {
        self.fund_outputs(vec![Output::token(asset_id, value, self.owner.program_hash())])[0]
    }

    /// Commit a coinbase at `lock_time` paying `value` to the owner.
    pub fn fund_coinbase(&self, value: Fixed64, lock_time: u32) -> OutPoint {
        let tx = TransactionBuilder::new(Payload::CoinBase(CoinBasePayload {
            coinbase_data: self.nonce.fetch_add(1, Ordering::Relaxed).to_le_bytes().to_vec().into(),
        }))
        .input(OutPoint::coinbase())
        .output(Output::native(self.native(), value, self.owner.program_hash()))
        .output(Output::native(self.native(), value, self.foundation.program_hash()))
        .lock_time(lock_time)
        .build();
        let id = self.ledger.commit(tx, lock_time);
        OutPoint::new(id, 0)
    }

    /// A coinbase paying `foundation_reward` of `total` to the foundation.
    pub fn coinbase(&self, total: Fixed64, foundation_reward: Fixed64) -> Transaction {
        TransactionBuilder::new(Payload::CoinBase(CoinBasePayload {
            coinbase_data: b"block reward".to_vec().into(),
        }))
        .input(OutPoint::coinbase())
        .output(Output::native(self.native(), foundation_reward, self.foundation.program_hash()))
        .output(Output::native(self.native(), total - foundation_reward, self.owner.program_hash()))
        .build()
    }

    /// A signed transfer spending `from` and paying `outputs`.
    pub fn spend(&self, from: &[OutPoint], outputs: Vec<Output>) -> Transaction {
        let mut builder = TransactionBuilder::new(Payload::TransferAsset);
        for point in from {
            builder = builder.input(*point);
        }
        for output in outputs {
            builder = builder.output(output);
        }
        builder.sign(&[&self.owner])
    }

    /// A signed native payment of `value` to the recipient.
    pub fn pay(&self, from: OutPoint, value: Fixed64) -> Transaction {
        self.spend(
            &[from],
            vec![Output::native(self.native(), value, self.recipient.program_hash())],
        )
    }

    /// Program hash main-chain deposits to this chain pay.
    pub fn genesis_program_hash(&self) -> ProgramHash {
        genesis_program_hash(&self.genesis)
    }

    /// A main-chain transaction depositing `deposit` to this chain, of
    /// which `amount` is declared for `recipient`.
    pub fn main_chain_deposit(&self, recipient: ProgramHash, deposit: Fixed64, amount: Fixed64) -> Transaction {
        let recipient = recipient
            .to_address()
            .unwrap_or_else(|_| recipient.to_hex());
        TransactionBuilder::new(Payload::TransferCrossChainAsset(TransferCrossChainAssetPayload {
            cross_chain_addresses: vec![recipient],
            output_indexes: vec![0],
            cross_chain_amounts: vec![amount],
        }))
        .input(self.unique_root())
        .output(Output::native(self.native(), deposit, self.genesis_program_hash()))
        .build()
    }

    /// A recharge embedding `main_tx`, crediting `outputs`.
    pub fn recharge(&self, main_tx: &Transaction, outputs: Vec<Output>) -> Transaction {
        let proof = MerkleProof {
            block_hash: Hash256::digest(b"main chain block"),
            height: 100,
            transactions: 1,
            hashes: vec![main_tx.hash()],
            flags: vec![0x01].into(),
        };
        let mut builder = TransactionBuilder::new(Payload::RechargeToSideChain(RechargeToSideChainPayload {
            merkle_proof: proof.to_bytes().into(),
            main_chain_transaction: main_tx.to_bytes().into(),
        }));
        for output in outputs {
            builder = builder.output(output);
        }
        builder.build()
    }

    /// A signed transfer of `value` from `from` to the recipient's main-chain
    /// address, declaring `amount` for the main chain. Change, if any, returns
    /// to the owner.
    pub fn transfer_cross_chain(
        &self,
        from: OutPoint,
        value: Fixed64,
        amount: Fixed64,
        change: Fixed64,
    ) -> Transaction {
        let address = self
            .recipient
            .program_hash()
            .to_address()
            .unwrap_or_default();
        let mut builder = TransactionBuilder::new(Payload::TransferCrossChainAsset(
            TransferCrossChainAssetPayload {
                cross_chain_addresses: vec![address],
                output_indexes: vec![0],
                cross_chain_amounts: vec![amount],
            },
        ))
        .input(from)
        .output(Output::native(self.native(), value, ProgramHash::ZERO));
        if change > Fixed64::ZERO {
            builder = builder.output(Output::native(self.native(), change, self.owner.program_hash()));
        }
        builder.sign(&[&self.owner])
    }
}

impl Default for ChainFixture {
    fn default() -> Self {
        Self::new()
    }
}
