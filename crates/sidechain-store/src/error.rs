//! Store errors.

use sidechain_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A state value could not be encoded or decoded.
    #[error("state encoding error: {0}")]
    Serialization(String),

    /// Bytes under a state key do not describe a state value.
    #[error("invalid state data: {0}")]
    InvalidData(String),

    #[error("schema migration error: {0}")]
    Migration(String),

    /// A blocking storage task could not be joined.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
