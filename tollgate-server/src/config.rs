//! Server configuration.
//!
//! Loaded once from a TOML file at startup. The catalog and master key built
//! from it are shared immutably by every request.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tollgate_crypto::MasterKey;
use tollgate_license::Catalog;
use tollgate_storage::StoreConfig;
use tollgate_types::{KeySpec, Product};

/// Environment variable that overrides `secret`.
pub const SECRET_ENV: &str = "TOLLGATE_SECRET";

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing master secret: set \"secret\" or TOLLGATE_SECRET")]
    MissingSecret,

    #[error("missing \"control_api_secret\"")]
    MissingControlSecret,

    #[error("store_timeout_secs must be greater than zero")]
    ZeroStoreTimeout,

    #[error("product without a name")]
    UnnamedProduct,

    #[error("duplicate product name: {0}")]
    DuplicateProduct(String),

    #[error("product {product} has a duplicate plan: {plan}")]
    DuplicatePlan { product: String, plan: String },
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub control_api_secret: String,
    pub secret: String,
    pub store_timeout_secs: u64,
    pub default_alg: String,
    pub store: StoreConfig,
    pub default_key: KeySpec,
    pub products: Vec<Product>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            control_api_secret: String::new(),
            secret: String::new(),
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            default_alg: String::new(),
            store: StoreConfig::default(),
            default_key: KeySpec::default(),
            products: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Reads, overrides from the environment, and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_secret_override(std::env::var(SECRET_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses without validating.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Replaces `secret` with a non-empty override.
    pub fn apply_secret_override(&mut self, secret: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.secret = secret;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.store_timeout_secs == 0 {
            return Err(ConfigError::ZeroStoreTimeout);
        }

        let mut names = HashSet::new();
        for product in &self.products {
            if product.name.is_empty() {
                return Err(ConfigError::UnnamedProduct);
            }
            if !names.insert(product.name.as_str()) {
                return Err(ConfigError::DuplicateProduct(product.name.clone()));
            }
            let mut plans = HashSet::new();
            for plan in &product.plans {
                if !plans.insert(plan.name.as_str()) {
                    return Err(ConfigError::DuplicatePlan {
                        product: product.name.clone(),
                        plan: plan.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The admin secret. Only the HTTP server needs one.
    pub fn control_secret(&self) -> Result<&str, ConfigError> {
        if self.control_api_secret.is_empty() {
            return Err(ConfigError::MissingControlSecret);
        }
        Ok(&self.control_api_secret)
    }

    #[must_use]
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.products.clone())
            .with_default_key(self.default_key.clone())
            .with_default_alg(self.default_alg.clone())
    }

    #[must_use]
    pub fn master_key(&self) -> Arc<MasterKey> {
        Arc::new(MasterKey::from_secret(&self.secret))
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("control_api_secret", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("default_alg", &self.default_alg)
            .field("store", &self.store)
            .field("products", &self.products.len())
            .finish_non_exhaustive()
    }
}
