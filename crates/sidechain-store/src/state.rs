//! State values kept under the contract-state prefixes.
//!
//! The set of storage namespaces is fixed by protocol, so state values are a
//! closed enum: each [`DataEntryPrefix`] decodes to exactly one
//! [`StateValue`] variant.

use std::collections::BTreeMap;

use bytes::Bytes;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use sidechain_core::canonical::{decode, encode};
use sidechain_core::{AssetId, Fixed64, ProgramHash};

use crate::error::{Result, StoreError};

/// Logical storage namespace; its byte is prepended to every state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataEntryPrefix {
    Account = 0xc0,
    Contract = 0xc2,
    Storage = 0xc3,
    AssetState = 0xc4,
}

impl DataEntryPrefix {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0xc0 => Some(Self::Account),
            0xc2 => Some(Self::Contract),
            0xc3 => Some(Self::Storage),
            0xc4 => Some(Self::AssetState),
            _ => None,
        }
    }

    /// Full store key for a logical key in this namespace.
    pub fn store_key(self, key: &str) -> Vec<u8> {
        let mut k = Vec::with_capacity(1 + key.len());
        k.push(self.to_u8());
        k.extend_from_slice(key.as_bytes());
        k
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountState {
    pub program_hash: ProgramHash,
    pub is_frozen: bool,
    pub balances: BTreeMap<AssetId, Fixed64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub code: Bytes,
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
    pub program_hash: ProgramHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageItem {
    pub value: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    pub asset_id: AssetId,
    pub name: String,
    pub precision: u8,
    pub amount: BigInt,
    pub available: BigInt,
    pub owner: ProgramHash,
}

/// A staged or committed state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Account(AccountState),
    Contract(ContractState),
    Storage(StorageItem),
    Asset(AssetState),
}

impl StateValue {
    /// The namespace this value belongs to.
    pub fn prefix(&self) -> DataEntryPrefix {
        match self {
            StateValue::Account(_) => DataEntryPrefix::Account,
            StateValue::Contract(_) => DataEntryPrefix::Contract,
            StateValue::Storage(_) => DataEntryPrefix::Storage,
            StateValue::Asset(_) => DataEntryPrefix::AssetState,
        }
    }

    /// Canonical bytes of the inner value (the prefix is part of the key).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            StateValue::Account(v) => encode(v),
            StateValue::Contract(v) => encode(v),
            StateValue::Storage(v) => encode(v),
            StateValue::Asset(v) => encode(v),
        }
    }

    /// Decode bytes read from under `prefix`.
    pub fn decode(prefix: DataEntryPrefix, bytes: &[u8]) -> Result<Self> {
        let value = match prefix {
            DataEntryPrefix::Account => StateValue::Account(decode(bytes)?),
            DataEntryPrefix::Contract => StateValue::Contract(decode(bytes)?),
            DataEntryPrefix::Storage => StateValue::Storage(decode(bytes)?),
            DataEntryPrefix::AssetState => StateValue::Asset(decode(bytes)?),
        };
        Ok(value)
    }

    /// Decode a full store key/value pair.
    pub fn decode_entry(key: &[u8], bytes: &[u8]) -> Result<(DataEntryPrefix, Self)> {
        let first = key
            .first()
            .copied()
            .ok_or_else(|| StoreError::InvalidData("empty state key".into()))?;
        let prefix = DataEntryPrefix::from_u8(first)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown state prefix {first:#04x}")))?;
        Ok((prefix, Self::decode(prefix, bytes)?))
    }
}

/// Logical cache key of a program hash: its lowercase hex.
pub fn key_to_str(hash: &ProgramHash) -> String {
    hash.to_hex()
}
