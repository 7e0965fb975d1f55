//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong master secret, tampered or malformed data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Ciphertext is shorter than the nonce and tag it must carry.
    #[error("ciphertext too short: need at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}
