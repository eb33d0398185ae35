//! Error types for nos-core.

use thiserror::Error;

/// Errors that can occur when building or parsing core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid amount (overflow, bad format, or negative).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid base58 address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex content reference.
    #[error("invalid content reference: {0}")]
    InvalidContentRef(String),

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,
}
