//! Platform signer trait and request types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Result, SigningError};
use crate::outcome::Verification;
use crate::platform::{HostPlatform, TargetPlatform};

/// A binary to sign in place, plus an optional entitlements plist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    /// Path to the binary; its contents change, the path does not
    pub binary: PathBuf,

    /// Entitlements attached by the certificate signer when present on disk
    pub entitlements: Option<PathBuf>,

    /// Platform family the binary targets
    pub platform: TargetPlatform,
}

impl SigningRequest {
    /// Create a request, inferring the target platform from the file name
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        let platform = TargetPlatform::infer(&binary);
        Self {
            binary,
            entitlements: None,
            platform,
        }
    }

    pub fn with_entitlements(mut self, entitlements: Option<PathBuf>) -> Self {
        self.entitlements = entitlements;
        self
    }

    pub fn with_platform(mut self, platform: TargetPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// File name used in log lines
    pub fn display_name(&self) -> String {
        self.binary
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary.display().to_string())
    }
}

/// What a successful `sign` call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignReport {
    /// The binary now carries a fresh signature
    Signed,
    /// Signing is not configured in this environment and was bypassed
    Skipped { reason: String },
}

/// A signing strategy for one target platform
#[async_trait::async_trait]
pub trait PlatformSigner: Send + Sync {
    /// Get the name of this signer
    fn name(&self) -> &str;

    /// Target platform this signer produces signatures for
    fn platform(&self) -> TargetPlatform;

    /// Whether the signing tool can run on the given host
    fn supports_host(&self, host: HostPlatform) -> bool;

    /// Whether signed binaries must then go through remote notarization
    fn requires_notarization(&self) -> bool {
        false
    }

    /// Sign the binary in place
    async fn sign(&self, request: &SigningRequest, credentials: &Credentials) -> Result<SignReport>;

    /// Independently check the binary's signature
    async fn verify(&self, binary: &Path) -> Result<Verification>;

    /// Fail with `PlatformMismatch` unless `host` can run this signer
    fn ensure_host(&self, host: HostPlatform) -> Result<()> {
        if self.supports_host(host) {
            Ok(())
        } else {
            Err(SigningError::PlatformMismatch {
                operation: format!("{} signing", self.name()),
                host,
            })
        }
    }
}
