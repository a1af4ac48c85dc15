//! Strong type definitions for hashes and destinations.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Address kind of an ordinary single-signature destination.
pub const PREFIX_STANDARD: u8 = 0x21;
/// Address kind of an m-of-n multisignature destination.
pub const PREFIX_MULTISIG: u8 = 0x12;
/// Address kind of a cross-chain (genesis-locked) destination.
pub const PREFIX_CROSS_CHAIN: u8 = 0x4b;
/// Address kind of a registered identification.
pub const PREFIX_REGISTER_ID: u8 = 0x67;

const ADDRESS_CHECKSUM_LEN: usize = 4;

/// A 32-byte hash: transaction ids, asset ids, block hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

/// Asset identifiers are the hash of the registered asset.
pub type AssetId = Hash256;

/// Transaction identifiers are the hash of the unsigned transaction.
pub type TxId = Hash256;

impl Hash256 {
    /// The empty hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Blake3 digest of `data`.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 21-byte program hash: one address-kind prefix byte followed by a
/// 20-byte script digest. The all-zero value is the null destination that
/// marks cross-chain-bound outputs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ProgramHash(pub [u8; 21]);

impl ProgramHash {
    /// The null destination.
    pub const ZERO: Self = Self([0u8; 21]);

    pub const fn from_bytes(bytes: [u8; 21]) -> Self {
        Self(bytes)
    }

    /// Build from an address-kind prefix and a 20-byte digest.
    pub fn from_parts(prefix: u8, digest: &[u8; 20]) -> Self {
        let mut bytes = [0u8; 21];
        bytes[0] = prefix;
        bytes[1..].copy_from_slice(digest);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// The address-kind prefix byte.
    pub const fn prefix(&self) -> u8 {
        self.0[0]
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 21]
    }

    /// Whether the prefix names one of the recognized address kinds.
    pub fn has_known_prefix(&self) -> bool {
        matches!(
            self.prefix(),
            PREFIX_STANDARD | PREFIX_MULTISIG | PREFIX_CROSS_CHAIN | PREFIX_REGISTER_ID
        )
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Render as an address string: hex of the program hash followed by a
    /// four-byte checksum.
    pub fn to_address(&self) -> Result<String, CoreError> {
        if !self.has_known_prefix() {
            return Err(CoreError::UnrenderableAddress(self.prefix()));
        }
        let mut raw = self.0.to_vec();
        raw.extend_from_slice(&address_checksum(&self.0));
        Ok(hex::encode(raw))
    }

    /// Parse an address string produced by [`ProgramHash::to_address`].
    pub fn from_address(address: &str) -> Result<Self, CoreError> {
        let raw = hex::decode(address)
            .map_err(|e| CoreError::InvalidAddress(format!("{address}: {e}")))?;
        if raw.len() != 21 + ADDRESS_CHECKSUM_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "{address}: expected {} bytes, got {}",
                21 + ADDRESS_CHECKSUM_LEN,
                raw.len()
            )));
        }
        let (body, checksum) = raw.split_at(21);
        let mut bytes = [0u8; 21];
        bytes.copy_from_slice(body);
        if checksum != address_checksum(&bytes) {
            return Err(CoreError::InvalidAddress(format!("{address}: checksum mismatch")));
        }
        let hash = Self(bytes);
        if !hash.has_known_prefix() {
            return Err(CoreError::InvalidAddress(format!(
                "{address}: unknown prefix {:#04x}",
                hash.prefix()
            )));
        }
        Ok(hash)
    }
}

fn address_checksum(body: &[u8; 21]) -> [u8; ADDRESS_CHECKSUM_LEN] {
    let digest = blake3::hash(body);
    let mut checksum = [0u8; ADDRESS_CHECKSUM_LEN];
    checksum.copy_from_slice(&digest.as_bytes()[..ADDRESS_CHECKSUM_LEN]);
    checksum
}

impl fmt::Debug for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramHash({})", self.to_hex())
    }
}

impl AsRef<[u8]> for ProgramHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let id = Hash256::from_bytes([0x42; 32]);
        let recovered = Hash256::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_hash_debug_is_truncated() {
        let id = Hash256::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", id), "Hash256(cdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_address_roundtrip() {
        let hash = ProgramHash::from_parts(PREFIX_STANDARD, &[7u8; 20]);
        let address = hash.to_address().unwrap();
        assert_eq!(ProgramHash::from_address(&address).unwrap(), hash);
    }

    #[test]
    fn test_null_hash_has_no_address() {
        assert!(matches!(
            ProgramHash::ZERO.to_address(),
            Err(CoreError::UnrenderableAddress(0))
        ));
    }

    #[test]
    fn test_address_checksum_detects_typo() {
        let hash = ProgramHash::from_parts(PREFIX_MULTISIG, &[9u8; 20]);
        let mut address = hash.to_address().unwrap();
        // Flip the last checksum nibble.
        let last = address.pop().unwrap();
        address.push(if last == '0' { '1' } else { '0' });
        assert!(ProgramHash::from_address(&address).is_err());
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(ProgramHash::from_address("abcd").is_err());
        assert!(ProgramHash::from_address("not hex").is_err());
    }
}
