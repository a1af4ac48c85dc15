//! Signature verification of a transaction's programs.

use std::collections::BTreeSet;

use sidechain_core::crypto::verify_program;
use sidechain_core::{to_program_hash, unsigned_transaction_bytes, Input, Output, Payload, ProgramHash, Transaction};

use crate::error::{Result, ValidationError};

/// Verifies that a transaction is authorized by the owners of what it spends.
pub trait SignatureVerifier: Send + Sync {
    /// `references` are the outputs spent by `tx`, as returned by the ledger.
    fn verify(&self, tx: &Transaction, references: &[(Input, Output)]) -> Result<()>;
}

/// Default verifier: executes the attached programs.
///
/// The set of program hashes the transaction must satisfy (the distinct
/// destinations of the spent outputs, plus the controller of a registered
/// asset) must equal the set of hashes of the attached programs, and every
/// program must verify over the unsigned transaction bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramVerifier;

impl ProgramVerifier {
    /// Program hashes `tx` must carry signatures for.
    pub fn required_hashes(tx: &Transaction, references: &[(Input, Output)]) -> BTreeSet<ProgramHash> {
        let mut hashes: BTreeSet<ProgramHash> =
            references.iter().map(|(_, output)| output.program_hash).collect();
        if let Payload::RegisterAsset(payload) = &tx.payload {
            hashes.insert(payload.controller);
        }
        hashes
    }
}

impl SignatureVerifier for ProgramVerifier {
    fn verify(&self, tx: &Transaction, references: &[(Input, Output)]) -> Result<()> {
        // Recharges are authorized by their inclusion proof.
        if tx.is_recharge_to_side_chain() {
            return Ok(());
        }

        let required = Self::required_hashes(tx, references);
        if required.len() != tx.programs.len() {
            return Err(ValidationError::Signature(format!(
                "expected {} programs, got {}",
                required.len(),
                tx.programs.len()
            )));
        }

        let mut provided = BTreeSet::new();
        for program in &tx.programs {
            let hash = to_program_hash(&program.code)
                .map_err(|e| ValidationError::Signature(e.to_string()))?;
            provided.insert(hash);
        }
        if provided != required {
            return Err(ValidationError::Signature(
                "programs do not match the spent outputs".into(),
            ));
        }

        let message = unsigned_transaction_bytes(tx);
        for program in &tx.programs {
            verify_program(program, &message)
                .map_err(|e| ValidationError::Signature(e.to_string()))?;
        }
        Ok(())
    }
}
