//! Shared test helpers for license tests.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use tollgate_crypto::MasterKey;
use tollgate_license::{Catalog, KeyMaterial, LicenseService, ResolvedKey};
use tollgate_storage::{MemoryStore, Stores};
use tollgate_types::{Fields, KeySpec, Plan, Policy, PolicyField, Product};

pub const MASTER_SECRET: &str = "test-master-secret";

/// PEM encodings of one RSA key pair.
pub struct RsaPems {
    pub pkcs8_private: String,
    pub spki_public: String,
    pub pkcs1_private: String,
    pub pkcs1_public: String,
}

/// An RSA pair generated once per test binary.
pub fn rsa_pems() -> &'static RsaPems {
    static PEMS: OnceLock<RsaPems> = OnceLock::new();
    PEMS.get_or_init(generate_rsa)
}

/// A second, unrelated RSA pair.
pub fn other_rsa_pems() -> &'static RsaPems {
    static PEMS: OnceLock<RsaPems> = OnceLock::new();
    PEMS.get_or_init(generate_rsa)
}

fn generate_rsa() -> RsaPems {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
    let public = private.to_public_key();
    RsaPems {
        pkcs8_private: private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
        spki_public: public.to_public_key_pem(LineEnding::LF).unwrap(),
        pkcs1_private: private.to_pkcs1_pem(LineEnding::LF).unwrap().to_string(),
        pkcs1_public: public.to_pkcs1_pem(LineEnding::LF).unwrap(),
    }
}

pub fn hmac_key(secret: &str) -> ResolvedKey {
    ResolvedKey::from_material(
        "test",
        KeyMaterial::Hmac {
            secret: secret.as_bytes().to_vec(),
        },
    )
}

pub fn rsa_key(pems: &RsaPems) -> ResolvedKey {
    ResolvedKey::from_material(
        "test",
        KeyMaterial::Rsa {
            private: pems.pkcs8_private.clone(),
            public: pems.spki_public.clone(),
        },
    )
}

pub fn rsa_spec(name: &str, pems: &RsaPems) -> KeySpec {
    KeySpec::rsa(name, pems.pkcs8_private.clone(), pems.spki_public.clone())
}

pub fn master() -> Arc<MasterKey> {
    Arc::new(MasterKey::from_secret(MASTER_SECRET))
}

pub fn memory_stores() -> Stores {
    Stores::from_backend(Arc::new(MemoryStore::new()))
}

pub fn service(stores: &Stores, catalog: Catalog) -> LicenseService {
    LicenseService::new(stores, master(), Arc::new(catalog))
}

pub fn headers(pairs: &[(&str, &str)]) -> Fields {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

pub fn policy_field(key: &str, value: impl Into<serde_json::Value>) -> PolicyField {
    PolicyField {
        key: key.to_string(),
        value: value.into(),
    }
}

/// Product `acme` (RS256, given key) with a 30-day `trial` plan and a
/// non-expiring `pro` plan.
pub fn acme(key: KeySpec) -> Product {
    Product {
        name: "acme".to_string(),
        alg: "RS256".to_string(),
        key,
        plans: vec![
            Plan {
                name: "trial".to_string(),
                policy: Policy {
                    expiration: 30,
                    headers: vec![policy_field("typ", "Trial")],
                    claims: vec![policy_field("tier", "basic"), policy_field("seats", 1)],
                },
                ..Plan::default()
            },
            Plan {
                name: "pro".to_string(),
                price: Some(49.0),
                currency: Some("EUR".to_string()),
                features: vec!["sync".to_string()],
                policy: Policy {
                    expiration: 0,
                    headers: vec![],
                    claims: vec![policy_field("tier", "pro")],
                },
            },
        ],
    }
}
