//! License issuing and verification for Tollgate.
//!
//! This crate holds the credential engine:
//! - [`KeyVault`]: resolves key descriptions to plaintext material, registering
//!   fresh keys sealed under the master key
//! - [`CredentialResolver`]: picks the algorithm and key for a license through
//!   the license → product/plan → global default hierarchy
//! - [`token`]: compact HMAC / RSA signed tokens and their content ids
//! - [`LicenseService`]: generate, verify, (in)activate and delete licenses
//!
//! # Generation
//!
//! ```text
//! draft ─► resolver (alg, key spec, plan overlay)
//!       ─► vault (plaintext key, registered if new)
//!       ─► signer (token, id = content_id(token))
//!       ─► LicenseStore::add_if_not_existing
//! ```
//!
//! Verification replays the same resolution for the stored license, with its
//! inline key replaced by the id of the key that signed it.

mod error;
mod resolver;
mod service;
pub mod token;
mod vault;

#[cfg(feature = "online")]
mod client;

use std::future::Future;
use std::time::Duration;

use tollgate_storage::StorageResult;

pub use error::{LicenseError, LicenseResult};
pub use resolver::{Catalog, CredentialResolver, Resolution, DEFAULT_ALG};
pub use service::{
    LicenseService, Verdict, REASON_BAD_SIGNATURE, REASON_EXPIRED, REASON_INACTIVATED,
};
pub use token::{AlgFamily, Algorithm, SignedToken};
pub use vault::{KeyMaterial, KeyVault, ResolvedKey};

#[cfg(feature = "online")]
pub use client::verify_remotely;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a store call, giving up after `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    op: impl Future<Output = StorageResult<T>>,
) -> LicenseResult<T> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(LicenseError::from),
        Err(_) => Err(LicenseError::Timeout(limit)),
    }
}
