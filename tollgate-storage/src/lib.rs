//! Persistence for Tollgate licenses and keys.
//!
//! The license engine depends only on the [`LicenseStore`] and [`KeyStore`]
//! capability traits. Three backends implement both:
//!
//! - [`MemoryStore`]: process-local maps, for tests and throwaway servers
//! - [`FileStore`]: a single JSON document rewritten after every mutation
//! - [`SqliteStore`]: a SQLite database
//!
//! The backend is chosen once at startup through [`StoreConfig`] and
//! [`open_store`]; nothing above this crate branches on backend identity.
//!
//! # Contract
//!
//! - Records are keyed by their content-addressed id. Inserting an id that is
//!   already present fails with [`StorageError::Conflict`] and never
//!   overwrites.
//! - Activation is a single conditional update reporting how many records
//!   matched and how many actually changed.
//! - Lookups and deletes of an absent id fail with [`StorageError::NotFound`].

mod error;
mod file;
mod memory;
mod sqlite;
mod tables;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tollgate_types::{License, StoredKey};

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Records matching the id.
    pub matched: u64,
    /// Records whose value actually changed.
    pub modified: u64,
}

/// Persistence of issued licenses.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Inserts the license unless its id is already present.
    async fn add_if_not_existing(&self, license: &License) -> StorageResult<()>;

    /// Fetches a license by id.
    async fn get_by_id(&self, id: &str) -> StorageResult<License>;

    /// Fetches the license whose token is exactly `token`.
    async fn get_by_token(&self, token: &str) -> StorageResult<License>;

    /// Sets the `active` flag if it differs from `active`.
    async fn set_active(&self, id: &str, active: bool) -> StorageResult<UpdateOutcome>;

    /// Deletes a license by id.
    async fn delete_by_id(&self, id: &str) -> StorageResult<()>;

    /// Returns every license, oldest first.
    async fn get_all(&self) -> StorageResult<Vec<License>>;
}

/// Persistence of sealed keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Inserts the key unless its id is already present.
    async fn add_if_not_existing(&self, key: &StoredKey) -> StorageResult<()>;

    /// Fetches a key by id.
    async fn get_by_id(&self, id: &str) -> StorageResult<StoredKey>;

    /// Deletes a key by id.
    async fn delete_by_id(&self, id: &str) -> StorageResult<()>;

    /// Returns every key, oldest first.
    async fn get_all(&self) -> StorageResult<Vec<StoredKey>>;
}

/// The two stores of one backend, shared by the key vault and the license
/// service.
#[derive(Clone)]
pub struct Stores {
    pub licenses: Arc<dyn LicenseStore>,
    pub keys: Arc<dyn KeyStore>,
}

impl Stores {
    /// Uses one backend for both licenses and keys.
    pub fn from_backend<B: LicenseStore + KeyStore + 'static>(backend: Arc<B>) -> Self {
        Self {
            licenses: backend.clone(),
            keys: backend,
        }
    }
}

/// Backend selection, as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    File { path: PathBuf },
    Sqlite { path: PathBuf },
}

/// Opens the configured backend.
pub async fn open_store(config: &StoreConfig) -> StorageResult<Stores> {
    let stores = match config {
        StoreConfig::Memory => Stores::from_backend(Arc::new(MemoryStore::new())),
        StoreConfig::File { path } => Stores::from_backend(Arc::new(FileStore::open(path).await?)),
        StoreConfig::Sqlite { path } => Stores::from_backend(Arc::new(SqliteStore::open(path)?)),
    };
    tracing::info!(?config, "Storage backend opened");
    Ok(stores)
}
