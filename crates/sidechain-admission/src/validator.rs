//! The transaction validator: context-free sanity checks, then checks
//! against committed ledger state.
//!
//! Each phase runs its rules in a fixed order and stops at the first
//! failure. A rule returns the detailed [`ValidationError`]; the phase logs
//! it and reports the rule's [`ErrorKind`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tokio::task::JoinSet;
use tracing::{info, warn};

use sidechain_core::{
    check_amount_precise, check_token_precise, is_positive_token, to_program_hash, AssetId,
    AttributeUsage, Fixed64, Output, Payload, Transaction, NATIVE_PRECISION, SEQUENCE_FINAL,
    TOKEN_PRECISION,
};

use crate::config::ChainParams;
use crate::crosschain::CrossChainVerifier;
use crate::error::{ErrorKind, Result, ValidationError};
use crate::fee::FeeHelper;
use crate::ledger::Ledger;
use crate::signature::{ProgramVerifier, SignatureVerifier};

/// Share of the coinbase reward owed to the foundation.
const FOUNDATION_REWARD_SHARE: f64 = 0.3;

/// Outcome of [`TxValidator::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// A coinbase, accepted on sanity alone.
    AcceptedCoinbase,
    Rejected(ErrorKind),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Rejected(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Verdict::Rejected(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        self.error_kind()
            .map_or(crate::error::SUCCESS_CODE, ErrorKind::code)
    }
}

fn reject(kind: ErrorKind, rule: &str, err: ValidationError) -> ErrorKind {
    warn!("[{}] {}", rule, err);
    kind
}

/// Two-phase transaction validator over a ledger view.
pub struct TxValidator<L, V = ProgramVerifier> {
    ledger: Arc<L>,
    params: Arc<ChainParams>,
    verifier: V,
    fees: FeeHelper<L>,
    cross_chain: CrossChainVerifier<L>,
}

impl<L: Ledger> TxValidator<L> {
    /// Validator with the default program verifier.
    pub fn new(ledger: Arc<L>, params: ChainParams) -> Self {
        Self::with_verifier(ledger, params, ProgramVerifier)
    }
}

impl<L: Ledger, V: SignatureVerifier> TxValidator<L, V> {
    pub fn with_verifier(ledger: Arc<L>, params: ChainParams, verifier: V) -> Self {
        let params = Arc::new(params);
        Self {
            fees: FeeHelper::new(ledger.clone(), params.exchange_rate),
            cross_chain: CrossChainVerifier::new(ledger.clone(), params.clone()),
            ledger,
            params,
            verifier,
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn fee_helper(&self) -> &FeeHelper<L> {
        &self.fees
    }

    pub fn cross_chain(&self) -> &CrossChainVerifier<L> {
        &self.cross_chain
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phases
    // ─────────────────────────────────────────────────────────────────────────

    /// Run sanity, then (except for coinbases) context checks.
    pub async fn admit(&self, tx: &Transaction) -> Verdict {
        if let Err(kind) = self.check_transaction_sanity(tx).await {
            return Verdict::Rejected(kind);
        }
        if tx.is_coinbase() {
            return Verdict::AcceptedCoinbase;
        }
        match self.check_transaction_context(tx).await {
            Ok(()) => Verdict::Accepted,
            Err(kind) => Verdict::Rejected(kind),
        }
    }

    /// Checks that need no ledger state beyond asset metadata.
    pub async fn check_transaction_sanity(&self, tx: &Transaction) -> std::result::Result<(), ErrorKind> {
        self.check_transaction_size(tx)
            .map_err(|e| reject(ErrorKind::TransactionSize, "check_transaction_size", e))?;
        self.check_transaction_input(tx)
            .map_err(|e| reject(ErrorKind::InvalidInput, "check_transaction_input", e))?;
        self.check_transaction_output(tx)
            .map_err(|e| reject(ErrorKind::InvalidOutput, "check_transaction_output", e))?;
        self.check_asset_precision(tx)
            .await
            .map_err(|e| reject(ErrorKind::AssetPrecision, "check_asset_precision", e))?;
        self.check_attribute_program(tx)
            .map_err(|e| reject(ErrorKind::AttributeProgram, "check_attribute_program", e))?;
        self.check_transaction_payload(tx)
            .map_err(|e| reject(ErrorKind::TransactionPayload, "check_transaction_payload", e))?;
        Ok(())
    }

    /// Checks against committed ledger state.
    pub async fn check_transaction_context(&self, tx: &Transaction) -> std::result::Result<(), ErrorKind> {
        self.check_duplicate_hash(tx).await.map_err(|e| {
            info!("[check_transaction_context] duplicate transaction check failed: {}", e);
            ErrorKind::TxHashDuplicate
        })?;

        if tx.is_coinbase() {
            return Ok(());
        }

        self.check_transaction_signature(tx)
            .await
            .map_err(|e| reject(ErrorKind::TransactionSignature, "check_transaction_signature", e))?;

        if tx.is_recharge_to_side_chain() {
            self.cross_chain
                .check_recharge_to_side_chain(tx)
                .await
                .map_err(|e| reject(ErrorKind::RechargeToSideChain, "check_recharge_to_side_chain", e))?;
            return Ok(());
        }

        if tx.is_transfer_cross_chain_asset() {
            if let Err(e) = self.cross_chain.check_transfer_cross_chain_asset(tx).await {
                if self.params.strict_transfer_cross_chain {
                    return Err(reject(
                        ErrorKind::InvalidOutput,
                        "check_transfer_cross_chain_asset",
                        e,
                    ));
                }
                warn!(
                    "[check_transfer_cross_chain_asset] {} (lenient mode, continuing)",
                    e
                );
            }
        }

        if tx.is_register_asset() {
            self.check_register_asset_transaction(tx)
                .await
                .map_err(|e| reject(ErrorKind::InvalidOutput, "check_register_asset_transaction", e))?;
        }

        self.check_double_spend(tx).await.map_err(|e| {
            info!("[check_transaction_context] double spend check failed: {}", e);
            ErrorKind::DoubleSpend
        })?;

        self.check_transaction_utxo_lock(tx)
            .await
            .map_err(|e| reject(ErrorKind::UTXOLocked, "check_transaction_utxo_lock", e))?;
        self.check_transaction_fee(tx)
            .await
            .map_err(|e| reject(ErrorKind::TransactionBalance, "check_transaction_fee", e))?;
        self.check_referenced_outputs(tx).await.map_err(|e| {
            let kind = match e {
                ValidationError::UnknownReferencedTx(_) | ValidationError::Ledger(_) => {
                    ErrorKind::UnknownReferencedTx
                }
                ValidationError::ImmatureCoinbase(_) => ErrorKind::IneffectiveCoinbase,
                _ => ErrorKind::InvalidReferencedTx,
            };
            reject(kind, "check_referenced_outputs", e)
        })?;

        Ok(())
    }

    /// Context checks for many transactions against the same ledger view,
    /// run concurrently. Results are in input order.
    pub async fn check_context_batch(
        self: Arc<Self>,
        txs: Vec<Transaction>,
    ) -> Vec<std::result::Result<(), ErrorKind>>
    where
        L: 'static,
        V: 'static,
    {
        let mut set = JoinSet::new();
        let count = txs.len();
        for (index, tx) in txs.into_iter().enumerate() {
            let validator = self.clone();
            set.spawn(async move { (index, validator.check_transaction_context(&tx).await) });
        }

        let mut results = vec![None; count];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => warn!("context check task failed: {}", e),
            }
        }
        results
            .into_iter()
            .map(|result| result.expect("every context check task reports a result"))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sanity rules
    // ─────────────────────────────────────────────────────────────────────────

    pub fn check_transaction_size(&self, tx: &Transaction) -> Result<()> {
        let size = tx.size();
        if size == 0 || size > self.params.max_block_size {
            return Err(ValidationError::InvalidSize(size));
        }
        Ok(())
    }

    pub fn check_transaction_input(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            if tx.inputs.len() != 1 {
                return Err(ValidationError::CoinbaseInputCount(tx.inputs.len()));
            }
            if !tx.inputs[0].previous.is_coinbase_sentinel() {
                return Err(ValidationError::InvalidCoinbaseInput);
            }
            return Ok(());
        }

        if tx.is_recharge_to_side_chain() {
            return Ok(());
        }

        if tx.inputs.is_empty() {
            return Err(ValidationError::NoInputs);
        }
        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for (i, input) in tx.inputs.iter().enumerate() {
            if input.previous.is_coinbase_sentinel() {
                return Err(ValidationError::SentinelInput(i));
            }
            if !seen.insert(input.previous) {
                return Err(ValidationError::DuplicateInput(input.previous));
            }
        }
        Ok(())
    }

    pub fn check_transaction_output(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            if tx.outputs.len() < 2 {
                return Err(ValidationError::CoinbaseOutputCount(tx.outputs.len()));
            }
            let mut total = Fixed64::ZERO;
            let mut foundation = Fixed64::ZERO;
            for output in &tx.outputs {
                total = total
                    .checked_add(output.value)
                    .ok_or(ValidationError::AmountOverflow)?;
                if output.program_hash == self.params.foundation_address {
                    foundation = foundation
                        .checked_add(output.value)
                        .ok_or(ValidationError::AmountOverflow)?;
                }
            }
            let owed = Fixed64::from_raw((total.raw() as f64 * FOUNDATION_REWARD_SHARE) as i64);
            if foundation < owed {
                return Err(ValidationError::FoundationRewardTooLow { foundation, total });
            }
            return Ok(());
        }

        if tx.outputs.is_empty() {
            return Err(ValidationError::NoOutputs);
        }

        let native = self.ledger.native_asset_id();
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.asset_id.is_zero() {
                return Err(ValidationError::NullAssetId(i));
            }
            if output.asset_id == native {
                if output.value < Fixed64::ZERO || !output.token_value.is_zero() {
                    return Err(ValidationError::InvalidNativeOutput(i));
                }
            } else {
                if tx.is_cross_chain() {
                    return Err(ValidationError::CrossChainNonNativeAsset(i));
                }
                if output.token_value.is_negative() || output.value != Fixed64::ZERO {
                    return Err(ValidationError::InvalidTokenOutput(i));
                }
            }
            if !(output.program_hash.has_known_prefix() || output.program_hash.is_zero()) {
                return Err(ValidationError::InvalidOutputAddress(i));
            }
        }
        Ok(())
    }

    /// Every output amount must be representable at its asset's precision.
    pub async fn check_asset_precision(&self, tx: &Transaction) -> Result<()> {
        if tx.is_register_asset() || tx.outputs.is_empty() {
            return Ok(());
        }

        let mut by_asset: BTreeMap<AssetId, Vec<(usize, &Output)>> = BTreeMap::new();
        for (i, output) in tx.outputs.iter().enumerate() {
            by_asset.entry(output.asset_id).or_default().push((i, output));
        }

        let native = self.ledger.native_asset_id();
        for (asset_id, outputs) in by_asset {
            let asset = self
                .ledger
                .get_asset(&asset_id)
                .await?
                .ok_or(ValidationError::UnknownAsset(asset_id))?;
            let precision = asset.precision;
            for (index, output) in outputs {
                let precise = if asset_id == native {
                    check_amount_precise(output.value, precision, NATIVE_PRECISION)
                } else {
                    check_token_precise(&output.token_value, precision, TOKEN_PRECISION)
                };
                if !precise {
                    return Err(ValidationError::OutOfPrecision { index, precision });
                }
            }
        }
        Ok(())
    }

    pub fn check_attribute_program(&self, tx: &Transaction) -> Result<()> {
        for attribute in &tx.attributes {
            if AttributeUsage::from_u8(attribute.usage).is_none() {
                return Err(ValidationError::InvalidAttributeUsage(attribute.usage));
            }
        }
        for (index, program) in tx.programs.iter().enumerate() {
            if program.code.is_empty() {
                return Err(ValidationError::EmptyProgramCode(index));
            }
            if program.parameter.is_empty() {
                return Err(ValidationError::EmptyProgramParameter(index));
            }
            to_program_hash(&program.code)
                .map_err(|source| ValidationError::InvalidProgramCode { index, source })?;
        }
        Ok(())
    }

    pub fn check_transaction_payload(&self, tx: &Transaction) -> Result<()> {
        match &tx.payload {
            Payload::RegisterAsset(payload) => {
                let precision = payload.asset.precision;
                if precision < self.params.min_precision || precision > self.params.max_precision {
                    return Err(ValidationError::InvalidAssetPrecision(precision));
                }
                let target = if tx.hash() == self.ledger.native_asset_id() {
                    NATIVE_PRECISION
                } else {
                    TOKEN_PRECISION
                };
                if !check_amount_precise(payload.amount, precision, target) {
                    return Err(ValidationError::RegisterAmountOutOfPrecision(payload.amount));
                }
                Ok(())
            }
            Payload::CoinBase(_)
            | Payload::TransferAsset
            | Payload::Record(_)
            | Payload::RechargeToSideChain(_)
            | Payload::TransferCrossChainAsset(_)
            | Payload::RegisterIdentification(_) => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Context rules
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn check_duplicate_hash(&self, tx: &Transaction) -> Result<()> {
        let hash = tx.hash();
        if self.ledger.is_tx_hash_duplicate(&hash).await? {
            return Err(ValidationError::DuplicateTransaction(hash));
        }
        Ok(())
    }

    pub async fn check_transaction_signature(&self, tx: &Transaction) -> Result<()> {
        let references = if tx.is_recharge_to_side_chain() {
            Vec::new()
        } else {
            self.ledger.get_tx_reference(tx).await?
        };
        self.verifier.verify(tx, &references)
    }

    /// A new asset's name must be free, and its initial outputs must pay the
    /// controller exactly the registered amount.
    pub async fn check_register_asset_transaction(&self, tx: &Transaction) -> Result<()> {
        let Payload::RegisterAsset(payload) = &tx.payload else {
            return Err(ValidationError::WrongPayload);
        };

        let assets = self.ledger.get_assets().await?;
        if assets.iter().any(|asset| asset.name == payload.asset.name) {
            return Err(ValidationError::AssetNameTaken(payload.asset.name.clone()));
        }

        let asset_id = payload.asset.hash();
        let mut total = BigInt::zero();
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.asset_id != asset_id {
                continue;
            }
            if output.program_hash != payload.controller {
                return Err(ValidationError::ControllerMismatch(i));
            }
            total += &output.token_value;
        }

        let expected = BigInt::from(payload.amount.raw()) * BigInt::from(10u8).pow(u32::from(TOKEN_PRECISION));
        if total != expected {
            return Err(ValidationError::RegisterAmountMismatch {
                expected: expected.to_string(),
                actual: total.to_string(),
            });
        }
        Ok(())
    }

    pub async fn check_double_spend(&self, tx: &Transaction) -> Result<()> {
        if self.ledger.is_double_spend(tx).await? {
            return Err(ValidationError::DoubleSpend);
        }
        Ok(())
    }

    /// Spending a time-locked output needs the final sequence and a lock
    /// time at or past the output's lock.
    pub async fn check_transaction_utxo_lock(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Ok(());
        }
        if tx.inputs.is_empty() {
            return Err(ValidationError::NoInputs);
        }
        let references = self.ledger.get_tx_reference(tx).await?;
        for (input, output) in &references {
            if output.output_lock == 0 {
                continue;
            }
            if input.sequence != SEQUENCE_FINAL {
                return Err(ValidationError::InvalidSequence(input.previous));
            }
            if tx.lock_time < output.output_lock {
                return Err(ValidationError::OutputLocked {
                    lock: output.output_lock,
                    lock_time: tx.lock_time,
                });
            }
        }
        Ok(())
    }

    /// Native balance must cover the minimum fee; token balance must be zero.
    pub async fn check_transaction_fee(&self, tx: &Transaction) -> Result<()> {
        let native = self.ledger.native_asset_id();
        let references = self.ledger.get_tx_reference(tx).await?;

        let mut native_in = Fixed64::ZERO;
        let mut token_in = BigInt::zero();
        for (_, output) in &references {
            if output.asset_id == native {
                native_in = native_in
                    .checked_add(output.value)
                    .ok_or(ValidationError::AmountOverflow)?;
            } else {
                token_in += &output.token_value;
            }
        }

        let mut native_out = Fixed64::ZERO;
        let mut token_out = BigInt::zero();
        for output in &tx.outputs {
            if output.asset_id == native {
                native_out = native_out
                    .checked_add(output.value)
                    .ok_or(ValidationError::AmountOverflow)?;
            } else {
                token_out += &output.token_value;
            }
        }

        let fee = native_in
            .checked_sub(native_out)
            .ok_or(ValidationError::AmountOverflow)?;
        let min = if tx.is_cross_chain() {
            self.params.min_cross_chain_tx_fee()
        } else {
            self.params.min_tx_fee()
        };
        if fee < min {
            return Err(ValidationError::InsufficientFee { fee, min });
        }

        if token_in != token_out {
            return Err(ValidationError::TokenUnbalanced);
        }
        Ok(())
    }

    /// Spent outputs must carry value, and spent coinbase outputs must be
    /// mature.
    pub async fn check_referenced_outputs(&self, tx: &Transaction) -> Result<()> {
        let native = self.ledger.native_asset_id();
        for input in &tx.inputs {
            let previous = input.previous;
            let (referenced, _) = self
                .ledger
                .get_transaction(&previous.tx_id)
                .await?
                .ok_or(ValidationError::UnknownReferencedTx(previous.tx_id))?;
            let output = referenced
                .outputs
                .get(previous.index as usize)
                .ok_or(ValidationError::InvalidReferencedOutput(previous))?;

            if output.asset_id == native {
                if output.value <= Fixed64::ZERO {
                    return Err(ValidationError::InvalidReferencedOutput(previous));
                }
            } else if !is_positive_token(&output.token_value) {
                warn!("token value of referenced output {:?} is not positive", previous);
            }

            if referenced.is_coinbase() {
                let lock_height = referenced.lock_time;
                let current = self.ledger.get_height().await?;
                let mature = current
                    .checked_sub(lock_height)
                    .is_some_and(|confirmations| confirmations >= self.params.spend_coinbase_span);
                if !mature {
                    return Err(ValidationError::ImmatureCoinbase(previous.tx_id));
                }
            }
        }
        Ok(())
    }
}
