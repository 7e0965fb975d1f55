//! Core type definitions for Tollgate.
//!
//! This crate defines the data model shared by every other crate:
//! - Ordered header/claim maps ([`Fields`])
//! - Content-addressed identifiers ([`content_id`])
//! - Key descriptions, both as requested ([`KeySpec`]) and as stored at rest
//!   ([`StoredKey`])
//! - Issued licenses and license drafts
//! - Products, plans and their policies
//!
//! Nothing here performs cryptography. Sealing and opening key material is the
//! job of `tollgate-crypto` and the key vault in `tollgate-license`.

mod fields;
mod ids;
mod key;
mod license;
mod product;

pub use fields::Fields;
pub use ids::{content_id, CONTENT_ID_BYTES};
pub use key::{KeyInfo, KeySpec, KeyType, SealedMaterial, StoredKey};
pub use license::{License, LicenseDraft};
pub use product::{Plan, Policy, PolicyField, Product};

/// Header naming the product a license belongs to.
pub const PRODUCT_HEADER: &str = "product";

/// Legacy alias of [`PRODUCT_HEADER`].
pub const APP_HEADER: &str = "app";

/// Header naming the plan inside the product.
pub const PLAN_HEADER: &str = "plan";

/// Header carrying the signing algorithm.
pub const ALG_HEADER: &str = "alg";

/// Claim carrying the expiration time (seconds since epoch).
pub const EXP_CLAIM: &str = "exp";

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid key type: {0:?}")]
    InvalidKeyType(String),
}
