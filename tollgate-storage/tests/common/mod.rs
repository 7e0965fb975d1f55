//! Shared fixtures for storage tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tollgate_types::{content_id, Fields, License, SealedMaterial, StoredKey};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn license(token: &str, created: i64) -> License {
    License {
        id: content_id(token.as_bytes()),
        headers: Fields::new().with("alg", "HS256").with("product", "editor"),
        claims: Fields::new().with("sub", "alice").with("seats", 5),
        token: token.to_string(),
        active: true,
        key_id: "k-1".to_string(),
        created_at: at(created),
    }
}

pub fn hmac_key(id: &str, created: i64) -> StoredKey {
    StoredKey {
        id: id.to_string(),
        name: "shared".to_string(),
        material: SealedMaterial::Hmac {
            hmac: "c2VhbGVkLWhtYWM=".to_string(),
        },
        created_at: at(created),
    }
}

pub fn rsa_key(id: &str, created: i64) -> StoredKey {
    StoredKey {
        id: id.to_string(),
        name: "pair".to_string(),
        material: SealedMaterial::Rsa {
            private: "c2VhbGVkLXByaXZhdGU=".to_string(),
            public: "c2VhbGVkLXB1YmxpYw==".to_string(),
        },
        created_at: at(created),
    }
}
