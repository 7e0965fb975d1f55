//! Products, plans and licensing policies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::KeySpec;

/// One header or claim a policy sets on every license of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyField {
    pub key: String,
    pub value: Value,
}

/// Overlay applied to a license issued under a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Days until expiry from the moment of signing; `0` means no expiry.
    pub expiration: u32,
    pub headers: Vec<PolicyField>,
    pub claims: Vec<PolicyField>,
}

/// A named tier of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    pub policy: Policy,
}

/// A policy container: default algorithm and key plus its plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub name: String,
    pub alg: String,
    #[serde(skip_serializing_if = "KeySpec::is_zero")]
    pub key: KeySpec,
    pub plans: Vec<Plan>,
}

impl Product {
    /// Looks up a plan by name.
    #[must_use]
    pub fn plan(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.name == name)
    }

    /// Copy with the key's raw material removed, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            key: self.key.redacted(),
            ..self.clone()
        }
    }
}
