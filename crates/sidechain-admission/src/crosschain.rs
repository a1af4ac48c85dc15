//! Cross-chain checks: recharges from the main chain and transfers back.

use std::collections::HashSet;
use std::sync::Arc;

use sidechain_core::{
    genesis_program_hash, Fixed64, MerkleProof, Payload, ProgramHash, Transaction,
    TransferCrossChainAssetPayload, PREFIX_MULTISIG, PREFIX_STANDARD,
};

use crate::config::ChainParams;
use crate::error::{Result, ValidationError};
use crate::ledger::Ledger;

/// Verifies recharge and transfer-cross-chain-asset transactions.
pub struct CrossChainVerifier<L> {
    ledger: Arc<L>,
    params: Arc<ChainParams>,
}

impl<L> Clone for CrossChainVerifier<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            params: self.params.clone(),
        }
    }
}

impl<L: Ledger> CrossChainVerifier<L> {
    pub fn new(ledger: Arc<L>, params: Arc<ChainParams>) -> Self {
        Self { ledger, params }
    }

    /// Reconcile a recharge against the main-chain transaction it embeds.
    ///
    /// Every payload entry paying this chain's genesis program hash must be
    /// credited, at the exchange rate, by an output of exactly that value to
    /// the declared address, and the outputs must total exactly the credits.
    pub async fn check_recharge_to_side_chain(&self, tx: &Transaction) -> Result<()> {
        let Payload::RechargeToSideChain(payload) = &tx.payload else {
            return Err(ValidationError::WrongPayload);
        };

        let rate = self.params.exchange_rate;
        if rate.is_nan() || rate <= 0.0 {
            return Err(ValidationError::InvalidExchangeRate(rate));
        }

        MerkleProof::from_bytes(&payload.merkle_proof).map_err(ValidationError::MalformedProof)?;
        let main_tx = Transaction::from_bytes(&payload.main_chain_transaction)
            .map_err(ValidationError::MalformedMainChainTx)?;

        let main_hash = main_tx.hash();
        if self.ledger.is_mainchain_tx_hash_duplicate(&main_hash).await? {
            return Err(ValidationError::DuplicateMainChainTx(main_hash));
        }

        let Payload::TransferCrossChainAsset(cross_chain) = &main_tx.payload else {
            return Err(ValidationError::MainChainPayloadNotCrossChain);
        };

        let genesis = self
            .ledger
            .get_block_hash(0)
            .await?
            .ok_or(ValidationError::MissingGenesisBlock)?;
        let genesis_hash = genesis_program_hash(&genesis);
        let min_fee = self.params.min_cross_chain_tx_fee();

        let mut expected = Fixed64::ZERO;
        for (i, address) in cross_chain.cross_chain_addresses.iter().enumerate() {
            let (Some(&index), Some(&amount)) = (
                cross_chain.output_indexes.get(i),
                cross_chain.cross_chain_amounts.get(i),
            ) else {
                return Err(ValidationError::InvalidCrossChainPayload);
            };
            let deposit = usize::try_from(index)
                .ok()
                .and_then(|index| main_tx.outputs.get(index))
                .ok_or(ValidationError::InvalidCrossChainIndex(index))?;
            if deposit.program_hash != genesis_hash {
                continue;
            }

            let ceiling = deposit
                .value
                .checked_sub(min_fee)
                .ok_or(ValidationError::AmountOverflow)?;
            if amount < Fixed64::ZERO || amount > ceiling {
                return Err(ValidationError::InvalidCrossChainAmount { index: i });
            }

            let credited = amount.exchange(rate);
            expected = expected
                .checked_add(credited)
                .ok_or(ValidationError::AmountOverflow)?;

            let recipient = ProgramHash::from_address(address)
                .map_err(|_| ValidationError::InvalidCrossChainAddress(address.clone()))?;
            let credited_output = tx
                .outputs
                .iter()
                .any(|output| output.program_hash == recipient && output.value == credited);
            if !credited_output {
                return Err(ValidationError::MissingRechargeOutput {
                    address: address.clone(),
                    amount: credited,
                });
            }
        }

        let mut actual = Fixed64::ZERO;
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.value < Fixed64::ZERO {
                return Err(ValidationError::NegativeOutputValue(i));
            }
            actual = actual
                .checked_add(output.value)
                .ok_or(ValidationError::AmountOverflow)?;
        }
        if actual != expected {
            return Err(ValidationError::RechargeTotalMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check a transfer of side-chain value to main-chain addresses.
    pub async fn check_transfer_cross_chain_asset(&self, tx: &Transaction) -> Result<()> {
        let Payload::TransferCrossChainAsset(payload) = &tx.payload else {
            return Err(ValidationError::WrongPayload);
        };
        check_transfer_payload_shape(tx, payload)?;

        let min_fee = self.params.min_cross_chain_tx_fee();
        for (i, &index) in payload.output_indexes.iter().enumerate() {
            // Range was checked with the shape.
            let output = &tx.outputs[index as usize];
            if !output.program_hash.is_zero() {
                return Err(ValidationError::CrossChainOutputNotNull(index));
            }
            let amount = payload.cross_chain_amounts[i];
            let ceiling = output
                .value
                .checked_sub(min_fee)
                .ok_or(ValidationError::AmountOverflow)?;
            if output.value < Fixed64::ZERO || amount < Fixed64::ZERO || amount > ceiling {
                return Err(ValidationError::InvalidCrossChainAmount { index: i });
            }
        }

        let references = self.ledger.get_tx_reference(tx).await?;
        let mut total_input = Fixed64::ZERO;
        for (_, output) in &references {
            total_input = total_input
                .checked_add(output.value)
                .ok_or(ValidationError::AmountOverflow)?;
        }
        let mut total_output = Fixed64::ZERO;
        for output in &tx.outputs {
            total_output = total_output
                .checked_add(output.value)
                .ok_or(ValidationError::AmountOverflow)?;
        }
        let fee = total_input
            .checked_sub(total_output)
            .ok_or(ValidationError::AmountOverflow)?;
        if fee < min_fee {
            return Err(ValidationError::InsufficientCrossChainFee { fee, min: min_fee });
        }
        Ok(())
    }
}

/// Context-free shape of a transfer payload: parallel arrays, unique
/// in-range indexes, one null-destination output per address, and
/// addresses of a standard or multisig kind.
fn check_transfer_payload_shape(
    tx: &Transaction,
    payload: &TransferCrossChainAssetPayload,
) -> Result<()> {
    let count = payload.cross_chain_addresses.len();
    if count == 0
        || count > tx.outputs.len()
        || count != payload.cross_chain_amounts.len()
        || payload.cross_chain_amounts.len() != payload.output_indexes.len()
    {
        return Err(ValidationError::InvalidCrossChainPayload);
    }

    let mut seen = HashSet::new();
    for &index in &payload.output_indexes {
        if !seen.insert(index) || index >= tx.outputs.len() as u64 {
            return Err(ValidationError::InvalidCrossChainIndex(index));
        }
    }

    let null_outputs = tx
        .outputs
        .iter()
        .filter(|output| output.program_hash.is_zero())
        .count();
    if null_outputs != count {
        return Err(ValidationError::CrossChainCountMismatch {
            declared: count,
            actual: null_outputs,
        });
    }

    for address in &payload.cross_chain_addresses {
        let kind = ProgramHash::from_address(address)
            .map(|hash| hash.prefix())
            .map_err(|_| ValidationError::InvalidCrossChainAddress(address.clone()))?;
        if kind != PREFIX_STANDARD && kind != PREFIX_MULTISIG {
            return Err(ValidationError::InvalidCrossChainAddress(address.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLedger;
    use sidechain_core::{
        Hash256, Keypair, Output, RechargeToSideChainPayload, TransactionBuilder,
    };

    const NATIVE: sidechain_core::AssetId = StubLedger::NATIVE;

    fn params(rate: f64) -> Arc<ChainParams> {
        Arc::new(ChainParams {
            exchange_rate: rate,
            min_cross_chain_tx_fee: 10_000,
            ..ChainParams::default()
        })
    }

    fn recharge(deposit: Fixed64, amount: Fixed64, credit: Fixed64, genesis: Hash256) -> Transaction {
        let recipient = Keypair::from_seed(&[4u8; 32]).program_hash();
        let main_tx = TransactionBuilder::new(Payload::TransferCrossChainAsset(
            TransferCrossChainAssetPayload {
                cross_chain_addresses: vec![recipient.to_address().unwrap()],
                output_indexes: vec![0],
                cross_chain_amounts: vec![amount],
            },
        ))
        .output(Output::native(NATIVE, deposit, genesis_program_hash(&genesis)))
        .build();
        let proof = MerkleProof {
            block_hash: Hash256::digest(b"main block"),
            height: 10,
            transactions: 1,
            hashes: vec![main_tx.hash()],
            flags: vec![1u8].into(),
        };
        TransactionBuilder::new(Payload::RechargeToSideChain(RechargeToSideChainPayload {
            merkle_proof: proof.to_bytes().into(),
            main_chain_transaction: main_tx.to_bytes().into(),
        }))
        .output(Output::native(NATIVE, credit, recipient))
        .build()
    }

    fn ledger_with_genesis(genesis: Hash256) -> StubLedger {
        StubLedger {
            genesis: Some(genesis),
            ..StubLedger::default()
        }
    }

    #[tokio::test]
    async fn test_recharge_credited_at_exchange_rate() {
        let genesis = Hash256::digest(b"genesis");
        let tx = recharge(
            Fixed64::from_coins(101),
            Fixed64::from_coins(100),
            Fixed64::from_coins(80),
            genesis,
        );
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(genesis)), params(0.8));
        verifier.check_recharge_to_side_chain(&tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_recharge_rejects_wrong_credit() {
        let genesis = Hash256::digest(b"genesis");
        let tx = recharge(
            Fixed64::from_coins(101),
            Fixed64::from_coins(100),
            Fixed64::from_coins(100),
            genesis,
        );
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(genesis)), params(0.8));
        let err = verifier.check_recharge_to_side_chain(&tx).await.unwrap_err();
        assert!(matches!(err, ValidationError::MissingRechargeOutput { .. }));
    }

    #[tokio::test]
    async fn test_recharge_amount_must_leave_cross_chain_fee() {
        let genesis = Hash256::digest(b"genesis");
        // Deposit equals the declared amount: nothing left for the fee.
        let tx = recharge(
            Fixed64::from_coins(100),
            Fixed64::from_coins(100),
            Fixed64::from_coins(100),
            genesis,
        );
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(genesis)), params(1.0));
        let err = verifier.check_recharge_to_side_chain(&tx).await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCrossChainAmount { index: 0 }));
    }

    #[tokio::test]
    async fn test_recharge_requires_positive_rate() {
        let genesis = Hash256::digest(b"genesis");
        let tx = recharge(
            Fixed64::from_coins(101),
            Fixed64::from_coins(100),
            Fixed64::ZERO,
            genesis,
        );
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(genesis)), params(0.0));
        let err = verifier.check_recharge_to_side_chain(&tx).await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidExchangeRate(_)));
    }

    #[tokio::test]
    async fn test_recharge_rejects_malformed_proof() {
        let genesis = Hash256::digest(b"genesis");
        let mut tx = recharge(
            Fixed64::from_coins(101),
            Fixed64::from_coins(100),
            Fixed64::from_coins(100),
            genesis,
        );
        if let Payload::RechargeToSideChain(payload) = &mut tx.payload {
            payload.merkle_proof = vec![0xff, 0x00].into();
        }
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(genesis)), params(1.0));
        let err = verifier.check_recharge_to_side_chain(&tx).await.unwrap_err();
        assert!(matches!(err, ValidationError::MalformedProof(_)));
    }

    #[tokio::test]
    async fn test_recharge_ignores_entries_not_paying_genesis() {
        // Deposit pays some other chain's genesis: no credit is expected.
        let tx = recharge(
            Fixed64::from_coins(101),
            Fixed64::from_coins(100),
            Fixed64::from_coins(100),
            Hash256::digest(b"other chain"),
        );
        let ours = Hash256::digest(b"genesis");
        let verifier = CrossChainVerifier::new(Arc::new(ledger_with_genesis(ours)), params(1.0));
        let err = verifier.check_recharge_to_side_chain(&tx).await.unwrap_err();
        assert!(matches!(err, ValidationError::RechargeTotalMismatch { .. }));
    }

    fn transfer(ledger_value: Fixed64, cross: Fixed64, amount: Fixed64) -> (StubLedger, Transaction) {
        let owner = Keypair::from_seed(&[1u8; 32]).program_hash();
        let target = Keypair::from_seed(&[5u8; 32]).program_hash();
        let (ledger, funding) = StubLedger::funded(vec![Output::native(NATIVE, ledger_value, owner)]);
        let tx = TransactionBuilder::new(Payload::TransferCrossChainAsset(
            TransferCrossChainAssetPayload {
                cross_chain_addresses: vec![target.to_address().unwrap()],
                output_indexes: vec![0],
                cross_chain_amounts: vec![amount],
            },
        ))
        .input(funding[0])
        .output(Output::native(NATIVE, cross, ProgramHash::ZERO))
        .build();
        (ledger, tx)
    }

    #[tokio::test]
    async fn test_transfer_accepted() {
        let (ledger, tx) = transfer(
            Fixed64::from_raw(100_000),
            Fixed64::from_raw(50_000),
            Fixed64::from_raw(40_000),
        );
        CrossChainVerifier::new(Arc::new(ledger), params(1.0))
            .check_transfer_cross_chain_asset(&tx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_amount_above_ceiling() {
        let (ledger, tx) = transfer(
            Fixed64::from_raw(100_000),
            Fixed64::from_raw(50_000),
            Fixed64::from_raw(45_000),
        );
        let err = CrossChainVerifier::new(Arc::new(ledger), params(1.0))
            .check_transfer_cross_chain_asset(&tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCrossChainAmount { index: 0 }));
    }

    #[tokio::test]
    async fn test_transfer_fee_too_low() {
        let (ledger, tx) = transfer(
            Fixed64::from_raw(55_000),
            Fixed64::from_raw(50_000),
            Fixed64::from_raw(40_000),
        );
        let err = CrossChainVerifier::new(Arc::new(ledger), params(1.0))
            .check_transfer_cross_chain_asset(&tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientCrossChainFee { .. }));
    }

    #[tokio::test]
    async fn test_transfer_shape_errors() {
        let (ledger, mut tx) = transfer(
            Fixed64::from_raw(100_000),
            Fixed64::from_raw(50_000),
            Fixed64::from_raw(40_000),
        );
        let verifier = CrossChainVerifier::new(Arc::new(ledger), params(1.0));

        let original = tx.clone();
        if let Payload::TransferCrossChainAsset(payload) = &mut tx.payload {
            payload.output_indexes = vec![3];
        }
        assert!(matches!(
            verifier.check_transfer_cross_chain_asset(&tx).await.unwrap_err(),
            ValidationError::InvalidCrossChainIndex(3)
        ));

        let mut tx = original.clone();
        tx.outputs[0].program_hash = Keypair::from_seed(&[6u8; 32]).program_hash();
        assert!(matches!(
            verifier.check_transfer_cross_chain_asset(&tx).await.unwrap_err(),
            ValidationError::CrossChainCountMismatch { declared: 1, actual: 0 }
        ));

        let mut tx = original;
        if let Payload::TransferCrossChainAsset(payload) = &mut tx.payload {
            payload.cross_chain_addresses = vec![ProgramHash::from_parts(
                sidechain_core::PREFIX_CROSS_CHAIN,
                &[7u8; 20],
            )
            .to_address()
            .unwrap()];
        }
        assert!(matches!(
            verifier.check_transfer_cross_chain_asset(&tx).await.unwrap_err(),
            ValidationError::InvalidCrossChainAddress(_)
        ));
    }
}
