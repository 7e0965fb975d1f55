//! Issued licenses and the drafts they are signed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Fields, KeySpec, ALG_HEADER, APP_HEADER, PLAN_HEADER, PRODUCT_HEADER};

/// The unsigned content of a license, as submitted for generation.
///
/// `key` is the license-level key; it only takes effect when no product is
/// named in the headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseDraft {
    pub headers: Fields,
    pub claims: Fields,
    #[serde(skip_serializing_if = "KeySpec::is_zero")]
    pub key: KeySpec,
}

impl LicenseDraft {
    #[must_use]
    pub fn new(headers: Fields, claims: Fields) -> Self {
        Self {
            headers,
            claims,
            key: KeySpec::default(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: KeySpec) -> Self {
        self.key = key;
        self
    }

    /// The product named by the `product` header, falling back to `app`.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.headers
            .get_str(PRODUCT_HEADER)
            .or_else(|| self.headers.get_str(APP_HEADER))
    }

    /// The plan named by the `plan` header.
    #[must_use]
    pub fn plan(&self) -> Option<&str> {
        self.headers.get_str(PLAN_HEADER)
    }

    /// The algorithm the caller asked for, if any.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.headers.get_str(ALG_HEADER)
    }
}

/// A signed license.
///
/// `id` is derived from `token` and is the deduplication key: two licenses with
/// the same signed bytes are the same license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub headers: Fields,
    pub claims: Fields,
    pub token: String,
    pub active: bool,
    /// Id of the key that signed the token.
    pub key_id: String,
    pub created_at: DateTime<Utc>,
}

impl License {
    /// Rebuilds the draft this license was signed from, keyed by its signing key.
    #[must_use]
    pub fn to_draft(&self) -> LicenseDraft {
        LicenseDraft {
            headers: self.headers.clone(),
            claims: self.claims.clone(),
            key: KeySpec::by_id(self.key_id.clone()),
        }
    }
}
