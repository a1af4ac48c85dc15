//! Canonical CBOR encoding for deterministic serialization.
//!
//! Values are encoded with ciborium from their serde derivations. Struct
//! fields are emitted in declaration order and no hash maps are encoded, so
//! the same value always yields the same bytes (and thus the same hash).

use std::io::Cursor;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;
use crate::transaction::{Attribute, Input, Output, Payload, Transaction};

/// The signed portion of a transaction: everything except its programs.
#[derive(Serialize)]
struct UnsignedTransaction<'a> {
    payload_version: u8,
    payload: &'a Payload,
    attributes: &'a [Attribute],
    inputs: &'a [Input],
    outputs: &'a [Output],
    lock_time: u32,
}

/// Encode a value to canonical bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail and the encoded types contain no
    // values ciborium rejects.
    ciborium::into_writer(value, &mut buf).expect("canonical encoding into memory");
    buf
}

/// Decode a value, rejecting trailing bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    let mut cursor = Cursor::new(bytes);
    let value = ciborium::from_reader(&mut cursor)
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(CoreError::DecodingError(format!(
            "{} trailing bytes",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

/// Bytes covered by a transaction's hash and signatures.
pub fn unsigned_transaction_bytes(tx: &Transaction) -> Vec<u8> {
    encode(&UnsignedTransaction {
        payload_version: tx.payload_version,
        payload: &tx.payload,
        attributes: &tx.attributes,
        inputs: &tx.inputs,
        outputs: &tx.outputs,
        lock_time: tx.lock_time,
    })
}
