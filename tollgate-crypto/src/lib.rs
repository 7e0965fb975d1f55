//! Envelope encryption for Tollgate key material.
//!
//! Every secret the key vault persists (HMAC secrets, RSA private and public
//! keys) is sealed with AES-256-GCM under a key derived from the server-wide
//! master secret. A storage-layer compromise alone therefore never yields raw
//! key material.
//!
//! # Format
//!
//! A sealed value is `nonce || ciphertext || tag`, where the 12-byte nonce is
//! freshly random for every call. Stores keep it base64-encoded
//! ([`seal_bytes`] / [`open_bytes`], or the UTF-8 [`seal_string`] /
//! [`open_string`]).

mod cipher;
mod error;
mod key;

pub use cipher::{
    decrypt, encrypt, open_bytes, open_string, seal_bytes, seal_string, NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{MasterKey, KEY_SIZE, PAD_BYTE};
