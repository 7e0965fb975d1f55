//! The license lifecycle over the stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_crypto::MasterKey;
use tollgate_storage::{LicenseStore, Stores, UpdateOutcome};
use tollgate_types::{License, LicenseDraft, EXP_CLAIM};

use crate::error::{LicenseError, LicenseResult};
use crate::resolver::{Catalog, CredentialResolver};
use crate::token::{self, AlgFamily};
use crate::vault::KeyVault;
use crate::{bounded, DEFAULT_STORE_TIMEOUT};

/// Reason given for a license that was administratively inactivated.
pub const REASON_INACTIVATED: &str = "inactivated";
/// Reason given when the signature does not match the resolved key.
pub const REASON_BAD_SIGNATURE: &str = "signature mismatch";
/// Reason given when the `exp` claim lies in the past.
pub const REASON_EXPIRED: &str = "expired";

/// Result of verifying a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Generates, verifies and administers licenses.
#[derive(Clone)]
pub struct LicenseService {
    licenses: Arc<dyn LicenseStore>,
    vault: KeyVault,
    resolver: CredentialResolver,
    store_timeout: Duration,
}

impl LicenseService {
    pub fn new(stores: &Stores, master: Arc<MasterKey>, catalog: Arc<Catalog>) -> Self {
        Self {
            licenses: Arc::clone(&stores.licenses),
            vault: KeyVault::new(Arc::clone(&stores.keys), master),
            resolver: CredentialResolver::new(catalog),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bounds every store call, including the vault's, by `limit`.
    #[must_use]
    pub fn with_store_timeout(mut self, limit: Duration) -> Self {
        self.store_timeout = limit;
        self.vault = self.vault.with_store_timeout(limit);
        self
    }

    #[must_use]
    pub fn vault(&self) -> &KeyVault {
        &self.vault
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        self.resolver.catalog()
    }

    /// Signs and stores a new license.
    pub async fn generate(&self, draft: &LicenseDraft) -> LicenseResult<License> {
        self.generate_at(draft, Utc::now()).await
    }

    /// [`generate`](Self::generate) with an explicit clock, for plan expiry.
    pub async fn generate_at(
        &self,
        draft: &LicenseDraft,
        now: DateTime<Utc>,
    ) -> LicenseResult<License> {
        let resolution = self.resolver.resolve_at(draft, now)?;
        let key = self.vault.resolve(&resolution.key, false).await?;
        token::check_alg_key(&resolution.alg, key.key_type())?;

        let signed = token::sign(&resolution.draft.headers, &resolution.draft.claims, &key)?;
        let license = License {
            id: signed.id,
            headers: resolution.draft.headers,
            claims: resolution.draft.claims,
            token: signed.token,
            active: true,
            key_id: key.id.clone(),
            created_at: now,
        };

        bounded(self.store_timeout, self.licenses.add_if_not_existing(&license)).await?;
        tracing::info!(license_id = %license.id, key_id = %license.key_id, alg = %resolution.alg, "License generated");
        Ok(license)
    }

    /// Verifies the stored license whose token is `token`.
    pub async fn verify_token(&self, token: &str) -> LicenseResult<Verdict> {
        let license = bounded(self.store_timeout, self.licenses.get_by_token(token)).await?;
        self.verify_license(&license, Utc::now()).await
    }

    /// Verifies the stored license with id `id`.
    pub async fn verify_id(&self, id: &str) -> LicenseResult<Verdict> {
        let license = bounded(self.store_timeout, self.licenses.get_by_id(id)).await?;
        self.verify_license(&license, Utc::now()).await
    }

    /// Verifies an already loaded license.
    ///
    /// The key is resolved the same way it was at generation, with the inline
    /// key replaced by the stored signing key id.
    pub async fn verify_license(
        &self,
        license: &License,
        now: DateTime<Utc>,
    ) -> LicenseResult<Verdict> {
        if !license.active {
            tracing::debug!(license_id = %license.id, "Verification of inactive license");
            return Ok(Verdict::invalid(REASON_INACTIVATED));
        }

        let resolution = self.resolver.resolve_at(&license.to_draft(), now)?;
        let key = self.vault.resolve(&resolution.key, false).await?;
        token::check_alg_key(&resolution.alg, key.key_type())?;

        if !token::verify(&license.token, &key, AlgFamily::from(key.key_type()))? {
            tracing::warn!(license_id = %license.id, key_id = %key.id, "License signature mismatch");
            return Ok(Verdict::invalid(REASON_BAD_SIGNATURE));
        }

        let (_, claims) = token::decode(&license.token)?;
        if let Some(exp) = claims.get(EXP_CLAIM) {
            if expiry(exp).is_none_or(|exp| exp <= now.timestamp() as f64) {
                return Ok(Verdict::invalid(REASON_EXPIRED));
            }
        }

        tracing::debug!(license_id = %license.id, "License verified");
        Ok(Verdict::valid())
    }

    /// Marks the license active.
    pub async fn activate(&self, id: &str) -> LicenseResult<()> {
        self.set_active(id, true).await
    }

    /// Marks the license inactive.
    pub async fn inactivate(&self, id: &str) -> LicenseResult<()> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &str, active: bool) -> LicenseResult<()> {
        let UpdateOutcome { matched, modified } =
            bounded(self.store_timeout, self.licenses.set_active(id, active)).await?;
        match (matched, modified, active) {
            (0, _, _) => Err(LicenseError::NotFound {
                kind: "license",
                id: id.to_string(),
            }),
            (_, 0, true) => Err(LicenseError::AlreadyActive),
            (_, 0, false) => Err(LicenseError::AlreadyInactive),
            _ => {
                tracing::info!(license_id = %id, active, "License activation changed");
                Ok(())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> LicenseResult<()> {
        bounded(self.store_timeout, self.licenses.delete_by_id(id)).await?;
        tracing::info!(license_id = %id, "License deleted");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> LicenseResult<License> {
        bounded(self.store_timeout, self.licenses.get_by_id(id)).await
    }

    pub async fn get_by_token(&self, token: &str) -> LicenseResult<License> {
        bounded(self.store_timeout, self.licenses.get_by_token(token)).await
    }

    /// Every license, oldest first.
    pub async fn list(&self) -> LicenseResult<Vec<License>> {
        bounded(self.store_timeout, self.licenses.get_all()).await
    }
}

impl std::fmt::Debug for LicenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseService")
            .field("vault", &self.vault)
            .field("resolver", &self.resolver)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

/// Seconds since the epoch from an `exp` claim. Numbers and numeric strings
/// count; anything else, or a non-finite value, is unreadable.
fn expiry(value: &serde_json::Value) -> Option<f64> {
    let exp = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    exp.is_finite().then_some(exp)
}
