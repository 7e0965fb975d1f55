//! Error types for key resolution, signing and the license lifecycle.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tollgate_crypto::CryptoError;
use tollgate_storage::StorageError;
use tollgate_types::KeyType;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// No license or key with the given id.
    #[error("there is no {kind} with ID: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A different record already occupies the id.
    #[error("there is already such {kind} with ID: {id}")]
    Conflict { kind: &'static str, id: String },

    /// Key type is neither `hmac` nor `rsa`.
    #[error("invalid key type: {0:?}")]
    InvalidKeyType(String),

    /// A key description is missing the material its type requires.
    #[error("invalid key: {0}")]
    InvalidKeySpec(String),

    /// The resolved algorithm cannot be used with the resolved key.
    #[error("algorithm {alg} cannot be used with a {key_type} key")]
    AlgKeyMismatch { alg: String, key_type: KeyType },

    /// Unknown or unimplemented signing algorithm.
    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlg(String),

    /// Token is not `header.claims.signature` with decodable parts.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Sealing or opening key material failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("license is already active")]
    AlreadyActive,

    #[error("license is already inactive")]
    AlreadyInactive,

    /// Key material is unusable for signing or verification.
    #[error("signing key error: {0}")]
    SigningKey(String),

    #[error("there is no product named {0:?}")]
    ProductNotFound(String),

    #[error("product {product:?} has no plan named {plan:?}")]
    PlanNotFound { product: String, plan: String },

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// The store did not answer in time.
    #[error("store did not respond within {0:?}")]
    Timeout(Duration),

    /// A key file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network error talking to a remote server.
    #[cfg(feature = "online")]
    #[error("network error: {0}")]
    Network(String),
}

impl From<StorageError> for LicenseError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => Self::NotFound { kind, id },
            StorageError::Conflict { kind, id } => Self::Conflict { kind, id },
            other => Self::Storage(other),
        }
    }
}

impl From<tollgate_types::Error> for LicenseError {
    fn from(err: tollgate_types::Error) -> Self {
        match err {
            tollgate_types::Error::InvalidKeyType(t) => Self::InvalidKeyType(t),
            tollgate_types::Error::Serialization(e) => Self::Serialization(e),
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
