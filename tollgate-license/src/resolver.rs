//! Credential resolution.
//!
//! Decides which algorithm and which key a license is signed (or verified)
//! with, and applies the plan policy to the draft. The hierarchy is:
//!
//! | source            | algorithm            | key                  |
//! |-------------------|----------------------|----------------------|
//! | license           | used without product | used without product |
//! | product / plan    | always wins          | wins when set        |
//! | global default    | when still empty     | when still zero      |
//!
//! Once a product is named, the license can no longer choose its own
//! algorithm or key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tollgate_types::{KeySpec, LicenseDraft, Product, ALG_HEADER, EXP_CLAIM};

use crate::error::{LicenseError, LicenseResult};

/// Algorithm used when neither license nor product names one.
pub const DEFAULT_ALG: &str = "HS256";

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Products plus the global fallbacks. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    default_key: KeySpec,
    default_alg: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            default_key: KeySpec::default(),
            default_alg: DEFAULT_ALG.to_string(),
        }
    }
}

impl Catalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_key(mut self, key: KeySpec) -> Self {
        self.default_key = key;
        self
    }

    /// Overrides [`DEFAULT_ALG`]. An empty string keeps the built-in default.
    #[must_use]
    pub fn with_default_alg(mut self, alg: impl Into<String>) -> Self {
        let alg = alg.into();
        if !alg.is_empty() {
            self.default_alg = alg;
        }
        self
    }

    #[must_use]
    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn default_key(&self) -> &KeySpec {
        &self.default_key
    }

    #[must_use]
    pub fn default_alg(&self) -> &str {
        &self.default_alg
    }
}

/// The outcome of resolving a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The draft with policy overlays applied and `alg` set.
    pub draft: LicenseDraft,
    pub alg: String,
    /// Key to hand to the vault.
    pub key: KeySpec,
}

/// Applies the override hierarchy to license drafts.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    catalog: Arc<Catalog>,
}

impl CredentialResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolves `draft` against the current time.
    pub fn resolve(&self, draft: &LicenseDraft) -> LicenseResult<Resolution> {
        self.resolve_at(draft, Utc::now())
    }

    /// Resolves `draft`, computing plan expiry relative to `now`.
    pub fn resolve_at(&self, draft: &LicenseDraft, now: DateTime<Utc>) -> LicenseResult<Resolution> {
        let mut draft = draft.clone();

        let (alg, key) = match draft.product().map(str::to_owned) {
            None => (draft.alg().unwrap_or_default().to_string(), draft.key.clone()),
            Some(name) => {
                let product = self
                    .catalog
                    .product(&name)
                    .ok_or_else(|| LicenseError::ProductNotFound(name.clone()))?;

                if let Some(plan_name) = draft.plan().map(str::to_owned) {
                    let plan = product.plan(&plan_name).ok_or_else(|| LicenseError::PlanNotFound {
                        product: name.clone(),
                        plan: plan_name.clone(),
                    })?;
                    let policy = &plan.policy;
                    for field in &policy.headers {
                        draft.headers.set(field.key.clone(), field.value.clone());
                    }
                    for field in &policy.claims {
                        draft.claims.set(field.key.clone(), field.value.clone());
                    }
                    if policy.expiration > 0 {
                        let exp = now.timestamp() + i64::from(policy.expiration) * SECS_PER_DAY;
                        draft.claims.set(EXP_CLAIM, exp);
                    }
                }
                (product.alg.clone(), product.key.clone())
            }
        };

        let alg = if alg.is_empty() {
            self.catalog.default_alg.clone()
        } else {
            alg
        };
        let key = if key.is_zero() {
            self.catalog.default_key.clone()
        } else {
            key
        };

        draft.headers.set(ALG_HEADER, alg.clone());
        Ok(Resolution { draft, alg, key })
    }
}
