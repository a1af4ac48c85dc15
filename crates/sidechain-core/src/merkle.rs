//! Merkle inclusion proof carried by recharge transactions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::{decode, encode};
use crate::error::CoreError;
use crate::types::Hash256;

/// Partial Merkle tree proving a main-chain transaction's inclusion in a
/// main-chain block. Checking it against the block header is the SPV
/// service's job; admission only requires that it decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub block_hash: Hash256,
    pub height: u32,
    /// Number of transactions in the block.
    pub transactions: u32,
    pub hashes: Vec<Hash256>,
    pub flags: Bytes,
}

impl MerkleProof {
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_decodes() {
        let proof = MerkleProof {
            block_hash: Hash256::from_bytes([9; 32]),
            height: 42,
            transactions: 3,
            hashes: vec![Hash256::from_bytes([1; 32])],
            flags: Bytes::from_static(&[0x01]),
        };
        assert_eq!(MerkleProof::from_bytes(&proof.to_bytes()).unwrap(), proof);
    }

    #[test]
    fn test_truncated_proof_fails() {
        let proof = MerkleProof {
            block_hash: Hash256::ZERO,
            height: 1,
            transactions: 1,
            hashes: vec![],
            flags: Bytes::new(),
        };
        let bytes = proof.to_bytes();
        assert!(MerkleProof::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
