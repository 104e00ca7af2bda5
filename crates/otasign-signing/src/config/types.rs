//! Configuration types

use serde::{Deserialize, Serialize};

use crate::entitlements::{EntitlementResolver, DEFAULT_CANDIDATES};
use crate::notarize::DEFAULT_PROFILE;

use super::defaults::DEFAULT_PRODUCT;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Identifier prefix for certificate signing
    pub product: String,

    /// Sign with the hardened runtime enabled (macOS)
    pub hardened_runtime: bool,

    /// Notarization settings
    pub notarization: NotarizationConfig,

    /// Post-signing verification settings
    pub verification: VerificationConfig,

    /// Entitlement file lookup
    pub entitlements: EntitlementsConfig,

    /// Artifacts to sign (glob patterns, relative to the config file)
    pub artifacts: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            hardened_runtime: true,
            notarization: NotarizationConfig::default(),
            verification: VerificationConfig::default(),
            entitlements: EntitlementsConfig::default(),
            artifacts: Vec::new(),
        }
    }
}

/// Notarization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotarizationConfig {
    /// Notarize binaries whose platform requires it
    pub enabled: bool,

    /// notarytool keychain profile name
    pub profile: String,
}

impl Default for NotarizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

/// Verification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Check signatures after signing
    pub enabled: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Entitlement lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementsConfig {
    /// Candidate paths relative to the root directory, first match wins
    pub candidates: Vec<String>,
}

impl Default for EntitlementsConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl EntitlementsConfig {
    pub fn resolver(&self) -> EntitlementResolver {
        EntitlementResolver::new(self.candidates.iter().map(String::as_str))
    }
}
