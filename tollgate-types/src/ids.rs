//! Content-addressed identifiers.
//!
//! Keys and licenses are identified by a digest of their canonical bytes, so
//! resubmitting the same secret or re-signing the same content always lands on
//! the same id.

use sha2::{Digest, Sha256};

/// Number of SHA-256 digest bytes kept in an id (rendered as 32 hex chars).
///
/// Ids are the deduplication and lookup key; changing this invalidates every
/// id already stored.
pub const CONTENT_ID_BYTES: usize = 16;

/// Returns the truncated hex SHA-256 digest of `bytes`.
#[must_use]
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..CONTENT_ID_BYTES])
}
