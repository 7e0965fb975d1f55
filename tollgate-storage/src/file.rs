//! Single-file JSON backend.
//!
//! The whole dataset is one JSON document `{"licenses": [...], "keys": [...]}`.
//! Every mutation is applied to a copy of the tables, written to a sibling
//! temporary file and renamed over the original; the in-memory tables are only
//! replaced once the rename succeeded. A failed write therefore leaves both the
//! file and the served data unchanged.
//!
//! Once a mutation holds the lock, the write and the in-memory commit run on
//! their own task. A caller that stops waiting (a timeout, a dropped request)
//! cannot leave the file ahead of the served tables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tollgate_types::{License, StoredKey};

use crate::error::{StorageError, StorageResult};
use crate::tables::{Snapshot, Tables};
use crate::{KeyStore, LicenseStore, UpdateOutcome};

/// Licenses and keys persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: Arc<Mutex<Tables>>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Tables::default(),
            Ok(bytes) => Tables::from_snapshot(serde_json::from_slice::<Snapshot>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "File store opened");
        Ok(Self {
            path,
            tables: Arc::new(Mutex::new(tables)),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `op` to a copy of the tables and commits it once written out.
    async fn mutate<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> StorageResult<T> + Send + 'static,
    {
        self.commit(move |t| op(t).map(|out| (out, true))).await
    }

    /// Like [`mutate`](Self::mutate), but `op` reports whether anything changed
    /// and an unchanged copy is neither written nor committed.
    async fn commit<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> StorageResult<(T, bool)> + Send + 'static,
    {
        let mut guard = Arc::clone(&self.tables).lock_owned().await;
        let path = self.path.clone();
        tokio::spawn(async move {
            let mut next = (*guard).clone();
            let (out, changed) = op(&mut next)?;
            if changed {
                persist(&path, &next).await?;
                *guard = next;
            }
            Ok(out)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("file store task failed: {e}")))?
    }
}

async fn persist(path: &Path, tables: &Tables) -> StorageResult<()> {
    let json = serde_json::to_vec_pretty(&tables.snapshot())?;
    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl LicenseStore for FileStore {
    async fn add_if_not_existing(&self, license: &License) -> StorageResult<()> {
        let record = license.clone();
        self.mutate(move |t| t.add_license(&record)).await?;
        tracing::debug!(license_id = %license.id, "License written to file store");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<License> {
        self.tables.lock().await.license(id)
    }

    async fn get_by_token(&self, token: &str) -> StorageResult<License> {
        self.tables.lock().await.license_by_token(token)
    }

    async fn set_active(&self, id: &str, active: bool) -> StorageResult<UpdateOutcome> {
        let id = id.to_string();
        self.commit(move |t| {
            let outcome = t.set_active(&id, active);
            Ok((outcome, outcome.modified > 0))
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        let id = id.to_string();
        self.mutate(move |t| t.delete_license(&id)).await
    }

    async fn get_all(&self) -> StorageResult<Vec<License>> {
        Ok(self.tables.lock().await.licenses())
    }
}

#[async_trait]
impl KeyStore for FileStore {
    async fn add_if_not_existing(&self, key: &StoredKey) -> StorageResult<()> {
        let record = key.clone();
        self.mutate(move |t| t.add_key(&record)).await?;
        tracing::debug!(key_id = %key.id, "Key written to file store");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<StoredKey> {
        self.tables.lock().await.key(id)
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        let id = id.to_string();
        self.mutate(move |t| t.delete_key(&id)).await
    }

    async fn get_all(&self) -> StorageResult<Vec<StoredKey>> {
        Ok(self.tables.lock().await.keys())
    }
}
