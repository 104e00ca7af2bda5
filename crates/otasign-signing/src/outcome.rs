//! Value-level results returned across the crate boundary

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, SigningError};

/// How a signing step (or a whole binary) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every requested step ran and passed
    Succeeded,
    /// Signing was intentionally bypassed because it is not configured
    Skipped,
    /// Signed, but the signature could not be checked on this host
    Unverified,
    /// A load-bearing step failed
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Unverified => write!(f, "unverified"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Pass/fail signal plus diagnostics. Never an error; callers aggregate these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub message: String,
}

impl Outcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: OutcomeStatus::Succeeded,
            failure: None,
            message: message.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: OutcomeStatus::Skipped,
            failure: None,
            message: message.into(),
        }
    }

    pub fn unverified(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: OutcomeStatus::Unverified,
            failure: None,
            message: message.into(),
        }
    }

    pub fn failed(error: &SigningError) -> Self {
        Self {
            success: false,
            status: OutcomeStatus::Failed,
            failure: Some(error.kind()),
            message: error.to_string(),
        }
    }

    /// Whether the binary went through verification on this host
    pub fn is_verified(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

impl From<SigningError> for Outcome {
    fn from(error: SigningError) -> Self {
        Self::failed(&error)
    }
}

/// Result of a post-signing signature check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The platform tool confirmed the signature
    Verified(String),
    /// The check cannot run on this host; treated as an unverified pass
    Skipped(String),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

impl From<Verification> for Outcome {
    fn from(verification: Verification) -> Self {
        match verification {
            Verification::Verified(detail) => Outcome::succeeded(detail),
            Verification::Skipped(reason) => Outcome::unverified(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_carries_kind_and_text() {
        let outcome: Outcome = SigningError::NotAccepted("status: Invalid".to_string()).into();
        assert!(!outcome.success);
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failure, Some(FailureKind::NotAccepted));
        assert!(outcome.message.contains("status: Invalid"));
    }

    #[test]
    fn test_skipped_verification_is_a_distinct_pass() {
        let outcome: Outcome = Verification::Skipped("requires Windows".to_string()).into();
        assert!(outcome.success);
        assert!(!outcome.is_verified());
        assert_eq!(outcome.status, OutcomeStatus::Unverified);

        let outcome: Outcome = Verification::Verified("Valid".to_string()).into();
        assert!(outcome.success);
        assert!(outcome.is_verified());
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(Outcome::skipped("no tool")).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["success"], true);
        assert!(json.get("failure").is_none());

        let json = serde_json::to_value(Outcome::failed(&SigningError::PackagingFailure(
            "ditto exited 1".to_string(),
        )))
        .unwrap();
        assert_eq!(json["failure"], "packaging_failure");
    }
}
