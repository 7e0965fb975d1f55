//! The key vault.
//!
//! Turns a [`KeySpec`] into usable plaintext key material. A spec carrying an
//! id is looked up and opened; any other spec describes a fresh key, which is
//! content-addressed, sealed under the master key and registered.
//!
//! The vault is the only component that sees both the sealed and the
//! plaintext form of a key.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tollgate_crypto::{open_bytes, open_string, seal_bytes, seal_string, MasterKey};
use tollgate_storage::KeyStore;
use tollgate_types::{content_id, KeyInfo, KeySpec, KeyType, SealedMaterial, StoredKey};
use zeroize::Zeroize;

use crate::error::{LicenseError, LicenseResult};
use crate::{bounded, DEFAULT_STORE_TIMEOUT};

/// Plaintext key material. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Shared HMAC secret. Any bytes, not only text.
    Hmac { secret: Vec<u8> },
    /// RSA key pair as PEM text.
    Rsa { private: String, public: String },
}

impl KeyMaterial {
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match self {
            Self::Hmac { .. } => KeyType::Hmac,
            Self::Rsa { .. } => KeyType::Rsa,
        }
    }

    /// Bytes the key id is derived from.
    fn id_input(&self) -> Vec<u8> {
        match self {
            Self::Hmac { secret } => secret.clone(),
            Self::Rsa { private, public } => [private.as_bytes(), public.as_bytes()].concat(),
        }
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        match self {
            Self::Hmac { secret } => secret.zeroize(),
            Self::Rsa { private, public } => {
                private.zeroize();
                public.zeroize();
            }
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hmac { .. } => f.debug_struct("Hmac").field("secret", &"[REDACTED]").finish(),
            Self::Rsa { .. } => f
                .debug_struct("Rsa")
                .field("private", &"[REDACTED]")
                .field("public", &"[REDACTED]")
                .finish(),
        }
    }
}

/// A key with its material opened, ready to sign or verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub id: String,
    pub name: String,
    pub material: KeyMaterial,
}

impl ResolvedKey {
    /// Builds a key directly from plaintext material, deriving its id.
    ///
    /// Used for offline verification where no vault is involved.
    #[must_use]
    pub fn from_material(name: impl Into<String>, material: KeyMaterial) -> Self {
        Self {
            id: content_id(&material.id_input()),
            name: name.into(),
            material,
        }
    }

    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.material.key_type()
    }
}

/// Resolves, registers and manages signing keys.
#[derive(Clone)]
pub struct KeyVault {
    keys: Arc<dyn KeyStore>,
    master: Arc<MasterKey>,
    store_timeout: Duration,
}

impl KeyVault {
    pub fn new(keys: Arc<dyn KeyStore>, master: Arc<MasterKey>) -> Self {
        Self {
            keys,
            master,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bounds every store call by `limit`.
    #[must_use]
    pub fn with_store_timeout(mut self, limit: Duration) -> Self {
        self.store_timeout = limit;
        self
    }

    /// Resolves `spec` to plaintext material.
    ///
    /// With an id (and `dry_run == false`) the stored key is opened. Otherwise
    /// the spec is treated as a fresh key: its material is read, its id
    /// derived, and unless `dry_run` it is registered in the key store.
    /// Registering a key whose id is already stored succeeds only if the
    /// stored plaintext is identical.
    pub async fn resolve(&self, spec: &KeySpec, dry_run: bool) -> LicenseResult<ResolvedKey> {
        if spec.has_id() && !dry_run {
            let stored = bounded(self.store_timeout, self.keys.get_by_id(&spec.id)).await?;
            return self.open(&stored);
        }
        self.register(spec, dry_run).await
    }

    /// Registers the key described by `spec` and returns its id.
    ///
    /// The id is always derived from the material, so a spec naming an id is
    /// rejected.
    pub async fn upload(&self, spec: &KeySpec) -> LicenseResult<String> {
        if spec.has_id() {
            return Err(LicenseError::InvalidKeySpec(
                "an uploaded key is identified by its material; omit \"id\"".into(),
            ));
        }
        let key = self.register(spec, false).await?;
        Ok(key.id.clone())
    }

    /// Metadata of a stored key.
    pub async fn info(&self, id: &str) -> LicenseResult<KeyInfo> {
        let stored = bounded(self.store_timeout, self.keys.get_by_id(id)).await?;
        Ok(KeyInfo::from(&stored))
    }

    /// Metadata of every stored key, oldest first.
    pub async fn list(&self) -> LicenseResult<Vec<KeyInfo>> {
        let all = bounded(self.store_timeout, self.keys.get_all()).await?;
        Ok(all.iter().map(KeyInfo::from).collect())
    }

    /// Deletes a stored key. Licenses signed with it are left alone.
    pub async fn delete(&self, id: &str) -> LicenseResult<()> {
        bounded(self.store_timeout, self.keys.delete_by_id(id)).await?;
        tracing::info!(key_id = %id, "Key deleted");
        Ok(())
    }

    async fn register(&self, spec: &KeySpec, dry_run: bool) -> LicenseResult<ResolvedKey> {
        let material = read_material(spec).await?;
        let key = ResolvedKey::from_material(spec.name.clone(), material);
        if dry_run {
            return Ok(key);
        }

        let stored = StoredKey {
            id: key.id.clone(),
            name: key.name.clone(),
            material: self.seal(&key.material)?,
            created_at: Utc::now(),
        };

        match bounded(self.store_timeout, self.keys.add_if_not_existing(&stored)).await {
            Ok(()) => {
                tracing::info!(key_id = %key.id, key_type = %key.key_type(), "Key registered");
                Ok(key)
            }
            Err(LicenseError::Conflict { .. }) => {
                let existing = bounded(self.store_timeout, self.keys.get_by_id(&key.id)).await?;
                let opened = self.open(&existing)?;
                if opened.material != key.material {
                    return Err(LicenseError::Conflict {
                        kind: "key",
                        id: key.id.clone(),
                    });
                }
                tracing::debug!(key_id = %key.id, "Key already registered");
                Ok(opened)
            }
            Err(e) => Err(e),
        }
    }

    fn seal(&self, material: &KeyMaterial) -> LicenseResult<SealedMaterial> {
        Ok(match material {
            KeyMaterial::Hmac { secret } => SealedMaterial::Hmac {
                hmac: seal_bytes(&self.master, secret)?,
            },
            KeyMaterial::Rsa { private, public } => SealedMaterial::Rsa {
                private: seal_string(&self.master, private)?,
                public: seal_string(&self.master, public)?,
            },
        })
    }

    fn open(&self, stored: &StoredKey) -> LicenseResult<ResolvedKey> {
        let material = match &stored.material {
            SealedMaterial::Hmac { hmac } => KeyMaterial::Hmac {
                secret: open_bytes(&self.master, hmac)?,
            },
            SealedMaterial::Rsa { private, public } => KeyMaterial::Rsa {
                private: open_string(&self.master, private)?,
                public: open_string(&self.master, public)?,
            },
        };
        Ok(ResolvedKey {
            id: stored.id.clone(),
            name: stored.name.clone(),
            material,
        })
    }
}

impl fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVault")
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

async fn read_material(spec: &KeySpec) -> LicenseResult<KeyMaterial> {
    match spec.key_type.parse::<KeyType>()? {
        KeyType::Hmac => Ok(KeyMaterial::Hmac {
            secret: read_field("hmac", &spec.hmac, spec.hmac_path.as_deref()).await?,
        }),
        KeyType::Rsa => Ok(KeyMaterial::Rsa {
            private: read_pem("private", &spec.private, spec.private_path.as_deref()).await?,
            public: read_pem("public", &spec.public, spec.public_path.as_deref()).await?,
        }),
    }
}

/// Takes the raw value, or the file contents when the raw value is empty.
async fn read_field(field: &str, raw: &str, path: Option<&Path>) -> LicenseResult<Vec<u8>> {
    let value = match (raw.is_empty(), path) {
        (false, _) => raw.as_bytes().to_vec(),
        (true, Some(path)) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| LicenseError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
        }
        (true, None) => {
            return Err(LicenseError::InvalidKeySpec(format!(
                "missing {field}: set \"{field}\" or \"{field}_path\""
            )));
        }
    };
    if value.is_empty() {
        return Err(LicenseError::InvalidKeySpec(format!("{field} is empty")));
    }
    Ok(value)
}

/// Like [`read_field`], for PEM text.
async fn read_pem(field: &str, raw: &str, path: Option<&Path>) -> LicenseResult<String> {
    String::from_utf8(read_field(field, raw, path).await?)
        .map_err(|_| LicenseError::InvalidKeySpec(format!("{field} is not UTF-8 PEM text")))
}
