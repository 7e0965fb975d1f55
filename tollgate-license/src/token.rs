//! Compact signed tokens.
//!
//! A token is `base64url(headers) "." base64url(claims) "." base64url(signature)`
//! without padding. Headers and claims are serialized in insertion order, so
//! the same draft always produces the same bytes and hence the same id.
//!
//! Supported algorithms are HMAC-SHA-2 (`HS256`, `HS384`, `HS512`) and
//! RSASSA-PKCS1-v1_5 with SHA-2 (`RS256`, `RS384`, `RS512`).

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use tollgate_types::{content_id, Fields, KeyType, ALG_HEADER};

use crate::error::{LicenseError, LicenseResult};
use crate::vault::{KeyMaterial, ResolvedKey};

/// A signing algorithm this crate can produce and check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
}

impl Algorithm {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        }
    }

    #[must_use]
    pub const fn family(&self) -> AlgFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => AlgFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => AlgFamily::Rsa,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            other => Err(LicenseError::UnsupportedAlg(other.to_string())),
        }
    }
}

/// The kind of key an algorithm needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgFamily {
    /// `HS*`
    Hmac,
    /// `RS*`, `PS*` and `ES*`; all take the asymmetric key pair.
    Rsa,
}

impl AlgFamily {
    /// Classifies an algorithm name by its prefix.
    #[must_use]
    pub fn of(alg: &str) -> Option<Self> {
        match alg.get(..2)? {
            "HS" => Some(Self::Hmac),
            "RS" | "PS" | "ES" => Some(Self::Rsa),
            _ => None,
        }
    }

    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        match self {
            Self::Hmac => KeyType::Hmac,
            Self::Rsa => KeyType::Rsa,
        }
    }
}

impl From<KeyType> for AlgFamily {
    fn from(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Hmac => Self::Hmac,
            KeyType::Rsa => Self::Rsa,
        }
    }
}

/// Fails with [`LicenseError::AlgKeyMismatch`] unless `alg` takes keys of
/// `key_type`.
pub fn check_alg_key(alg: &str, key_type: KeyType) -> LicenseResult<()> {
    let family = AlgFamily::of(alg).ok_or_else(|| LicenseError::UnsupportedAlg(alg.to_string()))?;
    if family.key_type() != key_type {
        return Err(LicenseError::AlgKeyMismatch {
            alg: alg.to_string(),
            key_type,
        });
    }
    Ok(())
}

/// Output of [`sign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub token: String,
    /// Content id of `token`.
    pub id: String,
}

/// Signs `headers` and `claims` with `key`, using the algorithm named by the
/// `alg` header.
pub fn sign(headers: &Fields, claims: &Fields, key: &ResolvedKey) -> LicenseResult<SignedToken> {
    let alg: Algorithm = headers.get_str(ALG_HEADER).unwrap_or_default().parse()?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(headers.to_canonical_json()?),
        URL_SAFE_NO_PAD.encode(claims.to_canonical_json()?),
    );
    let signature = match (&key.material, alg.family()) {
        (KeyMaterial::Hmac { secret }, AlgFamily::Hmac) => {
            hmac_sign(alg, secret, signing_input.as_bytes())?
        }
        (KeyMaterial::Rsa { private, .. }, AlgFamily::Rsa) => {
            rsa_sign(alg, private, signing_input.as_bytes())?
        }
        (material, _) => {
            return Err(LicenseError::SigningKey(format!(
                "{alg} cannot sign with a {} key",
                material.key_type()
            )));
        }
    };

    let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));
    let id = content_id(token.as_bytes());
    Ok(SignedToken { token, id })
}

/// Checks the signature of `token` against `key`.
///
/// Returns `Ok(false)` when the token's algorithm is not of the `expected`
/// family, when `key` is of the other family, or when the signature does not
/// match. Structural problems are errors.
pub fn verify(token: &str, key: &ResolvedKey, expected: AlgFamily) -> LicenseResult<bool> {
    let parts = split(token)?;
    let headers = decode_fields(parts[0], "header")?;
    let signature = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|e| LicenseError::MalformedToken(format!("signature is not base64url: {e}")))?;

    let alg_name = headers.get_str(ALG_HEADER).unwrap_or_default();
    if AlgFamily::of(alg_name) != Some(expected) {
        return Ok(false);
    }
    let alg: Algorithm = alg_name.parse()?;
    let signing_input = &token[..parts[0].len() + 1 + parts[1].len()];

    match (&key.material, expected) {
        (KeyMaterial::Hmac { secret }, AlgFamily::Hmac) => {
            hmac_verify(alg, secret, signing_input.as_bytes(), &signature)
        }
        (KeyMaterial::Rsa { public, .. }, AlgFamily::Rsa) => {
            rsa_verify(alg, public, signing_input.as_bytes(), &signature)
        }
        _ => Ok(false),
    }
}

/// Verifies `token` offline, taking the expected family from `key`.
pub fn verify_locally(token: &str, key: &ResolvedKey) -> LicenseResult<bool> {
    verify(token, key, key.key_type().into())
}

/// Decodes the headers and claims of `token` without checking its signature.
pub fn decode(token: &str) -> LicenseResult<(Fields, Fields)> {
    let parts = split(token)?;
    Ok((
        decode_fields(parts[0], "header")?,
        decode_fields(parts[1], "claims")?,
    ))
}

fn split(token: &str) -> LicenseResult<[&str; 3]> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        &[h, c, s] => Ok([h, c, s]),
        _ => Err(LicenseError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        ))),
    }
}

fn decode_fields(segment: &str, what: &str) -> LicenseResult<Fields> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| LicenseError::MalformedToken(format!("{what} is not base64url: {e}")))?;
    Fields::from_json(&bytes)
        .map_err(|e| LicenseError::MalformedToken(format!("{what} is not a JSON object: {e}")))
}

// ── HMAC ─────────────────────────────────────────────────────────

macro_rules! hmac_with {
    ($digest:ty, $secret:expr, $msg:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($secret)
            .map_err(|e| LicenseError::SigningKey(e.to_string()))?;
        mac.update($msg);
        mac
    }};
}

fn hmac_sign(alg: Algorithm, secret: &[u8], msg: &[u8]) -> LicenseResult<Vec<u8>> {
    Ok(match alg {
        Algorithm::HS256 => hmac_with!(Sha256, secret, msg).finalize().into_bytes().to_vec(),
        Algorithm::HS384 => hmac_with!(Sha384, secret, msg).finalize().into_bytes().to_vec(),
        Algorithm::HS512 => hmac_with!(Sha512, secret, msg).finalize().into_bytes().to_vec(),
        other => return Err(LicenseError::UnsupportedAlg(other.to_string())),
    })
}

/// Constant-time comparison via `Mac::verify_slice`.
fn hmac_verify(alg: Algorithm, secret: &[u8], msg: &[u8], sig: &[u8]) -> LicenseResult<bool> {
    Ok(match alg {
        Algorithm::HS256 => hmac_with!(Sha256, secret, msg).verify_slice(sig).is_ok(),
        Algorithm::HS384 => hmac_with!(Sha384, secret, msg).verify_slice(sig).is_ok(),
        Algorithm::HS512 => hmac_with!(Sha512, secret, msg).verify_slice(sig).is_ok(),
        _ => false,
    })
}

// ── RSA ──────────────────────────────────────────────────────────

/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`).
fn parse_private(pem: &str) -> LicenseResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| LicenseError::SigningKey(format!("invalid RSA private key: {e}")))
}

/// Accepts SPKI (`BEGIN PUBLIC KEY`) and PKCS#1 (`BEGIN RSA PUBLIC KEY`).
fn parse_public(pem: &str) -> LicenseResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| LicenseError::SigningKey(format!("invalid RSA public key: {e}")))
}

fn rsa_sign(alg: Algorithm, private_pem: &str, msg: &[u8]) -> LicenseResult<Vec<u8>> {
    let key = parse_private(private_pem)?;
    let signature = match alg {
        Algorithm::RS256 => SigningKey::<Sha256>::new(key).try_sign(msg),
        Algorithm::RS384 => SigningKey::<Sha384>::new(key).try_sign(msg),
        Algorithm::RS512 => SigningKey::<Sha512>::new(key).try_sign(msg),
        other => return Err(LicenseError::UnsupportedAlg(other.to_string())),
    }
    .map_err(|e| LicenseError::SigningKey(e.to_string()))?;
    Ok(signature.to_vec())
}

fn rsa_verify(alg: Algorithm, public_pem: &str, msg: &[u8], sig: &[u8]) -> LicenseResult<bool> {
    let key = parse_public(public_pem)?;
    let Ok(signature) = Signature::try_from(sig) else {
        return Ok(false);
    };
    Ok(match alg {
        Algorithm::RS256 => VerifyingKey::<Sha256>::new(key).verify(msg, &signature).is_ok(),
        Algorithm::RS384 => VerifyingKey::<Sha384>::new(key).verify(msg, &signature).is_ok(),
        Algorithm::RS512 => VerifyingKey::<Sha512>::new(key).verify(msg, &signature).is_ok(),
        _ => false,
    })
}
