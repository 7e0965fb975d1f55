//! Master key derivation.
//!
//! The master secret is an operator-supplied string of arbitrary length. It is
//! right-padded with `=` and truncated to exactly 32 bytes to form the AES-256
//! key.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Byte used to pad short master secrets.
pub const PAD_BYTE: u8 = b'=';

/// The process-wide key that seals stored key material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Derives the master key from the configured secret.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let mut bytes = [PAD_BYTE; KEY_SIZE];
        let raw = secret.as_bytes();
        let n = raw.len().min(KEY_SIZE);
        bytes[..n].copy_from_slice(&raw[..n]);
        Self { bytes }
    }

    /// Creates a master key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
