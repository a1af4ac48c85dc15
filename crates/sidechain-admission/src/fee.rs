//! Per-asset fee accounting.
//!
//! The fee of a transaction, per asset, is what its inputs bring in minus
//! what its outputs pay out. Recharges have no inputs on this chain; their
//! balance is the exchanged main-chain deposit minus the side-chain credit.

use std::collections::BTreeMap;
use std::sync::Arc;

use sidechain_core::{AssetId, Fixed64, Payload, Transaction};

use crate::error::FeeError;
use crate::ledger::Ledger;

/// Signed balance per asset.
pub type FeeMap = BTreeMap<AssetId, Fixed64>;

/// Computes fee maps against a ledger.
pub struct FeeHelper<L> {
    ledger: Arc<L>,
    exchange_rate: f64,
}

impl<L> Clone for FeeHelper<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            exchange_rate: self.exchange_rate,
        }
    }
}

impl<L: Ledger> FeeHelper<L> {
    pub fn new(ledger: Arc<L>, exchange_rate: f64) -> Self {
        Self {
            ledger,
            exchange_rate,
        }
    }

    /// Balance of `asset_id` in `tx`, or zero if it cannot be computed.
    pub async fn get_fee(&self, tx: &Transaction, asset_id: &AssetId) -> Fixed64 {
        match self.compute_fee_map(tx).await {
            Ok(map) => map.get(asset_id).copied().unwrap_or(Fixed64::ZERO),
            Err(e) => {
                tracing::debug!("fee map for {} unavailable: {}", tx.hash(), e);
                Fixed64::ZERO
            }
        }
    }

    /// Signed balance per asset.
    ///
    /// An asset with outputs but no inputs reports a negative balance; an
    /// asset with inputs only reports the full input.
    pub async fn compute_fee_map(&self, tx: &Transaction) -> Result<FeeMap, FeeError> {
        if let Payload::RechargeToSideChain(payload) = &tx.payload {
            return self.recharge_fee_map(tx, &payload.main_chain_transaction);
        }

        let references = self.ledger.get_tx_reference(tx).await?;

        let mut inputs = FeeMap::new();
        for (_, output) in &references {
            accumulate(&mut inputs, output.asset_id, output.value)?;
        }
        let mut outputs = FeeMap::new();
        for output in &tx.outputs {
            accumulate(&mut outputs, output.asset_id, output.value)?;
        }

        let mut fees = FeeMap::new();
        for (asset_id, spent) in &outputs {
            let brought = inputs.get(asset_id).copied().unwrap_or(Fixed64::ZERO);
            let fee = brought.checked_sub(*spent).ok_or(FeeError::Overflow)?;
            fees.insert(*asset_id, fee);
        }
        for (asset_id, brought) in inputs {
            fees.entry(asset_id).or_insert(brought);
        }
        Ok(fees)
    }

    fn recharge_fee_map(&self, tx: &Transaction, main_chain_tx: &[u8]) -> Result<FeeMap, FeeError> {
        let main_tx = Transaction::from_bytes(main_chain_tx).map_err(FeeError::MalformedMainChainTx)?;
        let Payload::TransferCrossChainAsset(cross_chain) = &main_tx.payload else {
            return Err(FeeError::NotCrossChainPayload);
        };

        let mut fees = FeeMap::new();
        for output in &tx.outputs {
            let address = output
                .program_hash
                .to_address()
                .map_err(FeeError::UnrenderableAddress)?;
            for (i, declared) in cross_chain.cross_chain_addresses.iter().enumerate() {
                if *declared != address {
                    continue;
                }
                let index = *cross_chain
                    .output_indexes
                    .get(i)
                    .ok_or(FeeError::MalformedCrossChainPayload)?;
                let deposit = usize::try_from(index)
                    .ok()
                    .and_then(|index| main_tx.outputs.get(index))
                    .ok_or(FeeError::OutputIndexOutOfRange(index))?;
                let credited = deposit.value.exchange(self.exchange_rate);
                let delta = credited
                    .checked_sub(output.value)
                    .ok_or(FeeError::Overflow)?;
                accumulate(&mut fees, output.asset_id, delta)?;
            }
        }
        Ok(fees)
    }
}

fn accumulate(map: &mut FeeMap, asset_id: AssetId, amount: Fixed64) -> Result<(), FeeError> {
    let entry = map.entry(asset_id).or_insert(Fixed64::ZERO);
    *entry = entry.checked_add(amount).ok_or(FeeError::Overflow)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLedger;
    use sidechain_core::{
        genesis_program_hash, Hash256, Keypair, OutPoint, Output, RechargeToSideChainPayload,
        TransactionBuilder, TransferCrossChainAssetPayload,
    };

    fn native() -> AssetId {
        StubLedger::NATIVE
    }

    #[tokio::test]
    async fn test_native_fee_is_inputs_minus_outputs() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let (ledger, funding) =
            StubLedger::funded(vec![Output::native(native(), Fixed64::from_raw(1_000), owner.program_hash())]);
        let tx = TransactionBuilder::new(Payload::TransferAsset)
            .input(funding[0])
            .output(Output::native(native(), Fixed64::from_raw(900), owner.program_hash()))
            .build();

        let fees = FeeHelper::new(Arc::new(ledger), 1.0);
        let map = fees.compute_fee_map(&tx).await.unwrap();
        assert_eq!(map[&native()], Fixed64::from_raw(100));
        assert_eq!(fees.get_fee(&tx, &native()).await, Fixed64::from_raw(100));
    }

    #[tokio::test]
    async fn test_output_only_asset_is_negative_and_input_only_is_positive() {
        let owner = Keypair::from_seed(&[1u8; 32]);
        let other = Hash256::digest(b"other");
        let (ledger, funding) =
            StubLedger::funded(vec![Output::native(native(), Fixed64::from_raw(500), owner.program_hash())]);
        let tx = TransactionBuilder::new(Payload::TransferAsset)
            .input(funding[0])
            .output(Output::native(other, Fixed64::from_raw(40), owner.program_hash()))
            .build();

        let map = FeeHelper::new(Arc::new(ledger), 1.0)
            .compute_fee_map(&tx)
            .await
            .unwrap();
        assert_eq!(map[&other], Fixed64::from_raw(-40));
        assert_eq!(map[&native()], Fixed64::from_raw(500));
    }

    #[tokio::test]
    async fn test_unknown_reference_fails_map_but_not_get_fee() {
        let tx = TransactionBuilder::new(Payload::TransferAsset)
            .input(OutPoint::new(Hash256::digest(b"nowhere"), 0))
            .build();
        let fees = FeeHelper::new(Arc::new(StubLedger::default()), 1.0);
        assert!(fees.compute_fee_map(&tx).await.is_err());
        assert_eq!(fees.get_fee(&tx, &native()).await, Fixed64::ZERO);
    }

    #[tokio::test]
    async fn test_recharge_balance_uses_exchange_rate() {
        let recipient = Keypair::from_seed(&[4u8; 32]).program_hash();
        let genesis = genesis_program_hash(&Hash256::digest(b"genesis"));
        let main_tx = TransactionBuilder::new(Payload::TransferCrossChainAsset(
            TransferCrossChainAssetPayload {
                cross_chain_addresses: vec![recipient.to_address().unwrap()],
                output_indexes: vec![0],
                cross_chain_amounts: vec![Fixed64::from_coins(100)],
            },
        ))
        .output(Output::native(native(), Fixed64::from_coins(100), genesis))
        .build();
        let tx = TransactionBuilder::new(Payload::RechargeToSideChain(RechargeToSideChainPayload {
            merkle_proof: Default::default(),
            main_chain_transaction: main_tx.to_bytes().into(),
        }))
        .output(Output::native(native(), Fixed64::from_coins(79), recipient))
        .build();

        let map = FeeHelper::new(Arc::new(StubLedger::default()), 0.8)
            .compute_fee_map(&tx)
            .await
            .unwrap();
        assert_eq!(map[&native()], Fixed64::from_coins(1));
    }

    #[tokio::test]
    async fn test_recharge_with_unrenderable_output_fails() {
        let main_tx = TransactionBuilder::new(Payload::TransferCrossChainAsset(Default::default())).build();
        let tx = TransactionBuilder::new(Payload::RechargeToSideChain(RechargeToSideChainPayload {
            merkle_proof: Default::default(),
            main_chain_transaction: main_tx.to_bytes().into(),
        }))
        .output(Output::native(native(), Fixed64::from_coins(1), sidechain_core::ProgramHash::ZERO))
        .build();

        let err = FeeHelper::new(Arc::new(StubLedger::default()), 1.0)
            .compute_fee_map(&tx)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::UnrenderableAddress(_)));
    }
}
