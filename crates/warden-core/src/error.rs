//! Error types for the Warden core primitives

use thiserror::Error;

/// Result type alias using CryptoError
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur in the cryptographic primitives
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Hex string could not be decoded
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// A key had the wrong length or was otherwise malformed
    #[error("Invalid key: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A signature blob had the wrong length
    #[error("Invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Signature did not verify against the public key
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Public key bytes did not decode to a valid curve point
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// AEAD encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed; the cause (truncation, tag mismatch, bad
    /// nonce) is deliberately not distinguished
    #[error("Decryption failed")]
    DecryptionFailed,
}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(err.to_string())
    }
}
