//! Key material encryption using AES-256-GCM.
//!
//! Provides authenticated encryption; any tampering or a wrong master key is
//! reported as an error, never as garbage plaintext.

use crate::error::{CryptoError, CryptoResult};
use crate::key::MasterKey;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &MasterKey) -> Aes256Gcm {
    Aes256Gcm::new(key.as_bytes().into())
}

/// Encrypts plaintext, returning `nonce || ciphertext`.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = cipher_for(key);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Encryption(format!("nonce generation failed: {e}")))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypts `nonce || ciphertext` produced by [`encrypt`].
pub fn decrypt(key: &MasterKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Truncated {
            expected: NONCE_SIZE + TAG_SIZE,
            actual: data.len(),
        });
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = cipher_for(key);

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })
}

/// Seals arbitrary bytes and returns the base64 form stored at rest.
pub fn seal_bytes(key: &MasterKey, plaintext: &[u8]) -> CryptoResult<String> {
    Ok(STANDARD.encode(encrypt(key, plaintext)?))
}

/// Opens a base64 value produced by [`seal_bytes`].
pub fn open_bytes(key: &MasterKey, encoded: &str) -> CryptoResult<Vec<u8>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;
    decrypt(key, &bytes)
}

/// Seals a UTF-8 secret. Same stored form as [`seal_bytes`].
pub fn seal_string(key: &MasterKey, plaintext: &str) -> CryptoResult<String> {
    seal_bytes(key, plaintext.as_bytes())
}

/// Opens a base64 value produced by [`seal_string`].
pub fn open_string(key: &MasterKey, encoded: &str) -> CryptoResult<String> {
    String::from_utf8(open_bytes(key, encoded)?)
        .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
}
