//! Error types for signing operations

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::HostPlatform;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Signing-related errors
#[derive(Debug, Error)]
pub enum SigningError {
    /// The host cannot run the requested signer, notarizer or verifier
    #[error("{operation} is not supported on a {host} host")]
    PlatformMismatch {
        operation: String,
        host: HostPlatform,
    },

    /// Required credential variables are absent or empty
    #[error("Missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    /// The signing tool reported a failure
    #[error("Signing tool failed: {tool} - {reason}")]
    SigningToolFailure { tool: String, reason: String },

    /// The notarization archive could not be created
    #[error("Failed to package binary for notarization: {0}")]
    PackagingFailure(String),

    /// The notarization submission did not complete
    #[error("Notarization submission failed: {0}")]
    SubmissionFailure(String),

    /// The notarization service returned a verdict other than accepted
    #[error("Notarization was not accepted: {0}")]
    NotAccepted(String),

    /// Signature verification failed
    #[error("Signature verification failed for {path}: {reason}")]
    VerificationFailed { path: PathBuf, reason: String },

    /// Tool not found
    #[error("Signing tool not found: {tool}. {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Configuration file error
    #[error("Signing configuration error: {0}")]
    Config(String),
}

impl SigningError {
    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PlatformMismatch { .. } => FailureKind::PlatformMismatch,
            Self::MissingCredentials(_) => FailureKind::MissingCredentials,
            Self::SigningToolFailure { .. } => FailureKind::SigningToolFailure,
            Self::PackagingFailure(_) => FailureKind::PackagingFailure,
            Self::SubmissionFailure(_) => FailureKind::SubmissionFailure,
            Self::NotAccepted(_) => FailureKind::NotAccepted,
            Self::VerificationFailed { .. } => FailureKind::VerificationFailed,
            Self::ToolNotFound { .. } => FailureKind::ToolNotFound,
            Self::Config(_) => FailureKind::Config,
        }
    }

    /// Convert a failure to spawn or wait on `tool` into an error.
    ///
    /// A missing executable is always `ToolNotFound`; anything else goes
    /// through `otherwise` so it lands in the failing step's own kind.
    pub(crate) fn from_spawn(
        tool: &str,
        err: std::io::Error,
        otherwise: impl FnOnce(String) -> SigningError,
    ) -> SigningError {
        if err.kind() == std::io::ErrorKind::NotFound {
            SigningError::ToolNotFound {
                tool: tool.to_string(),
                hint: format!("could not execute {}: {}", tool, err),
            }
        } else {
            otherwise(format!("{}: {}", tool, err))
        }
    }
}

/// Fieldless classification of a [`SigningError`], used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PlatformMismatch,
    MissingCredentials,
    SigningToolFailure,
    PackagingFailure,
    SubmissionFailure,
    NotAccepted,
    VerificationFailed,
    ToolNotFound,
    Config,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlatformMismatch => write!(f, "platform mismatch"),
            Self::MissingCredentials => write!(f, "missing credentials"),
            Self::SigningToolFailure => write!(f, "signing tool failure"),
            Self::PackagingFailure => write!(f, "packaging failure"),
            Self::SubmissionFailure => write!(f, "submission failure"),
            Self::NotAccepted => write!(f, "not accepted"),
            Self::VerificationFailed => write!(f, "verification failed"),
            Self::ToolNotFound => write!(f, "tool not found"),
            Self::Config => write!(f, "configuration error"),
        }
    }
}
