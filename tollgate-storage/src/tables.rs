//! In-memory record tables shared by the memory and file backends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tollgate_types::{content_id, License, StoredKey};

use crate::error::{StorageError, StorageResult};
use crate::UpdateOutcome;

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    licenses: HashMap<String, License>,
    keys: HashMap<String, StoredKey>,
}

/// On-disk layout of the file backend.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub licenses: Vec<License>,
    #[serde(default)]
    pub keys: Vec<StoredKey>,
}

impl Tables {
    pub fn add_license(&mut self, license: &License) -> StorageResult<()> {
        if self.licenses.contains_key(&license.id) {
            return Err(StorageError::license_conflict(&license.id));
        }
        self.licenses.insert(license.id.clone(), license.clone());
        Ok(())
    }

    pub fn license(&self, id: &str) -> StorageResult<License> {
        self.licenses
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::license_not_found(id))
    }

    pub fn license_by_token(&self, token: &str) -> StorageResult<License> {
        let id = content_id(token.as_bytes());
        match self.licenses.get(&id) {
            Some(l) if l.token == token => Ok(l.clone()),
            _ => Err(StorageError::license_not_found(&id)),
        }
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> UpdateOutcome {
        match self.licenses.get_mut(id) {
            None => UpdateOutcome::default(),
            Some(l) if l.active == active => UpdateOutcome {
                matched: 1,
                modified: 0,
            },
            Some(l) => {
                l.active = active;
                UpdateOutcome {
                    matched: 1,
                    modified: 1,
                }
            }
        }
    }

    pub fn delete_license(&mut self, id: &str) -> StorageResult<()> {
        self.licenses
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::license_not_found(id))
    }

    pub fn licenses(&self) -> Vec<License> {
        let mut all: Vec<License> = self.licenses.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn add_key(&mut self, key: &StoredKey) -> StorageResult<()> {
        if self.keys.contains_key(&key.id) {
            return Err(StorageError::key_conflict(&key.id));
        }
        self.keys.insert(key.id.clone(), key.clone());
        Ok(())
    }

    pub fn key(&self, id: &str) -> StorageResult<StoredKey> {
        self.keys
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::key_not_found(id))
    }

    pub fn delete_key(&mut self, id: &str) -> StorageResult<()> {
        self.keys
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::key_not_found(id))
    }

    pub fn keys(&self) -> Vec<StoredKey> {
        let mut all: Vec<StoredKey> = self.keys.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            licenses: self.licenses(),
            keys: self.keys(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            licenses: snapshot
                .licenses
                .into_iter()
                .map(|l| (l.id.clone(), l))
                .collect(),
            keys: snapshot
                .keys
                .into_iter()
                .map(|k| (k.id.clone(), k))
                .collect(),
        }
    }
}
