//! Process-local backend.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tollgate_types::{License, StoredKey};

use crate::error::StorageResult;
use crate::tables::Tables;
use crate::{KeyStore, LicenseStore, UpdateOutcome};

/// Licenses and keys held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseStore for MemoryStore {
    async fn add_if_not_existing(&self, license: &License) -> StorageResult<()> {
        self.tables.write().await.add_license(license)?;
        tracing::debug!(license_id = %license.id, "License stored in memory");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<License> {
        self.tables.read().await.license(id)
    }

    async fn get_by_token(&self, token: &str) -> StorageResult<License> {
        self.tables.read().await.license_by_token(token)
    }

    async fn set_active(&self, id: &str, active: bool) -> StorageResult<UpdateOutcome> {
        Ok(self.tables.write().await.set_active(id, active))
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        self.tables.write().await.delete_license(id)
    }

    async fn get_all(&self) -> StorageResult<Vec<License>> {
        Ok(self.tables.read().await.licenses())
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn add_if_not_existing(&self, key: &StoredKey) -> StorageResult<()> {
        self.tables.write().await.add_key(key)?;
        tracing::debug!(key_id = %key.id, "Key stored in memory");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<StoredKey> {
        self.tables.read().await.key(id)
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        self.tables.write().await.delete_key(id)
    }

    async fn get_all(&self) -> StorageResult<Vec<StoredKey>> {
        Ok(self.tables.read().await.keys())
    }
}
