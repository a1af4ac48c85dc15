//! Error types for the side-chain core primitives.

use thiserror::Error;

/// Errors raised while encoding, decoding, or interpreting core data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("program hash prefix {0:#04x} has no address form")]
    UnrenderableAddress(u8),

    #[error("invalid program code: {0}")]
    InvalidProgramCode(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
