//! Key descriptions.
//!
//! A key appears in two shapes:
//! - [`KeySpec`]: what a client request or the configuration supplies. It may
//!   carry an id to look up, raw secret values, or paths to read them from.
//! - [`StoredKey`]: what lives in the key store. Its material is always the
//!   sealed (encrypted) form.
//!
//! The plaintext form only exists inside the key vault while a license is being
//! signed or verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::Error;

/// The kind of secret a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Shared HMAC secret.
    Hmac,
    /// RSA key pair in PEM form.
    Rsa,
}

impl KeyType {
    /// Returns the wire name of the key type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Rsa => "rsa",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmac" => Ok(Self::Hmac),
            "rsa" => Ok(Self::Rsa),
            other => Err(Error::InvalidKeyType(other.to_string())),
        }
    }
}

/// A key as described by a request or by the configuration.
///
/// Either `id` references a stored key, or `key_type` plus the matching raw
/// values (or file paths) describe a fresh one. A spec with every field empty
/// is the zero key and stands for "not specified".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub key_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hmac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmac_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<PathBuf>,
}

impl KeySpec {
    /// A reference to a stored key.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// A fresh HMAC key with a raw secret.
    #[must_use]
    pub fn hmac(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::Hmac.to_string(),
            hmac: secret.into(),
            ..Self::default()
        }
    }

    /// A fresh RSA key pair from PEM text.
    #[must_use]
    pub fn rsa(
        name: impl Into<String>,
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::Rsa.to_string(),
            private: private_pem.into(),
            public: public_pem.into(),
            ..Self::default()
        }
    }

    /// Returns true if nothing at all is specified.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if the spec references a stored key.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Copy with raw secret values removed, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            hmac: String::new(),
            private: String::new(),
            public: String::new(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &String| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("KeySpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("key_type", &self.key_type)
            .field("hmac", &redact(&self.hmac))
            .field("hmac_path", &self.hmac_path)
            .field("private", &redact(&self.private))
            .field("private_path", &self.private_path)
            .field("public", &redact(&self.public))
            .field("public_path", &self.public_path)
            .finish()
    }
}

/// Sealed key material, each field holding base64 `nonce || ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SealedMaterial {
    Hmac { hmac: String },
    Rsa { private: String, public: String },
}

impl SealedMaterial {
    /// The key type this material belongs to.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match self {
            Self::Hmac { .. } => KeyType::Hmac,
            Self::Rsa { .. } => KeyType::Rsa,
        }
    }
}

/// A key record as persisted in a key store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub material: SealedMaterial,
    pub created_at: DateTime<Utc>,
}

impl StoredKey {
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.material.key_type()
    }
}

/// Public metadata about a stored key. Never carries material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredKey> for KeyInfo {
    fn from(key: &StoredKey) -> Self {
        Self {
            id: key.id.clone(),
            name: key.name.clone(),
            key_type: key.key_type(),
            created_at: key.created_at,
        }
    }
}
