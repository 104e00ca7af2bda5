//! Sign → notarize → verify sequencing for one binary or a batch

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument, warn};

use crate::config::SigningConfig;
use crate::credentials::Credentials;
use crate::error::SigningError;
use crate::notarize::Notarizer;
use crate::outcome::{Outcome, OutcomeStatus};
use crate::platform::{HostPlatform, TargetPlatform};
use crate::provider::{PlatformSigner, SignReport, SigningRequest};
use crate::providers::{MacOSSigner, WindowsSigner};
use crate::runner::{SystemRunner, ToolRunner};

/// Step of the pipeline a binary stopped at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sign,
    Notarize,
    Verify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sign => write!(f, "sign"),
            Self::Notarize => write!(f, "notarize"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// Per-binary result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryReport {
    pub binary: PathBuf,
    pub platform: TargetPlatform,
    pub outcome: Outcome,

    /// Stage that failed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,

    /// Notary service submission ID for accepted binaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,

    /// SHA-256 of the binary after processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl BinaryReport {
    fn new(request: &SigningRequest, outcome: Outcome) -> Self {
        Self {
            binary: request.binary.clone(),
            platform: request.platform,
            outcome,
            failed_stage: None,
            submission_id: None,
            sha256: None,
        }
    }

    fn failed(request: &SigningRequest, stage: Stage, error: SigningError) -> Self {
        error!(stage = %stage, kind = %error.kind(), "{}", error);
        let mut report = Self::new(request, Outcome::failed(&error));
        report.failed_stage = Some(stage);
        report
    }

    pub fn success(&self) -> bool {
        self.outcome.success
    }
}

/// Aggregated results of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub binaries: Vec<BinaryReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.binaries.iter().filter(|b| b.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.binaries.len() - self.succeeded()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.binaries
            .iter()
            .filter(|b| b.outcome.status == status)
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Which optional steps run after signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub notarize: bool,
    pub verify: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            notarize: true,
            verify: true,
        }
    }
}

/// Selects the signer for a binary's platform and drives it through
/// signing, notarization and verification.
///
/// Every public operation returns a value; failures never escape as errors,
/// so one bad binary does not stop a batch.
pub struct SigningPipeline {
    macos: MacOSSigner,
    windows: WindowsSigner,
    notarizer: Notarizer,
    options: PipelineOptions,
}

impl SigningPipeline {
    /// Pipeline running real tools on the current host
    pub fn new(config: &SigningConfig) -> Self {
        Self::with_runner(Arc::new(SystemRunner::new()), HostPlatform::current(), config)
    }

    pub fn with_runner(runner: Arc<dyn ToolRunner>, host: HostPlatform, config: &SigningConfig) -> Self {
        Self {
            macos: MacOSSigner::new(runner.clone(), host, config.product.clone())
                .with_hardened_runtime(config.hardened_runtime),
            windows: WindowsSigner::new(runner.clone(), host),
            notarizer: Notarizer::new(runner, host).with_profile(config.notarization.profile.clone()),
            options: PipelineOptions {
                notarize: config.notarization.enabled,
                verify: config.verification.enabled,
            },
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Signer strategy for a target platform
    pub fn signer(&self, platform: TargetPlatform) -> &dyn PlatformSigner {
        match platform {
            TargetPlatform::MacOS => &self.macos,
            TargetPlatform::Windows => &self.windows,
        }
    }

    /// Sign only
    pub async fn sign(&self, request: &SigningRequest, credentials: &Credentials) -> Outcome {
        match self.signer(request.platform).sign(request, credentials).await {
            Ok(SignReport::Signed) => Outcome::succeeded(format!("Signed {}", request.display_name())),
            Ok(SignReport::Skipped { reason }) => Outcome::skipped(reason),
            Err(e) => e.into(),
        }
    }

    /// Notarize only
    pub async fn notarize(&self, binary: &Path, credentials: &Credentials) -> Outcome {
        match self.notarizer.notarize(binary, credentials).await {
            Ok(verdict) => Outcome::succeeded(format!(
                "Notarized (submission {})",
                verdict.submission_id.as_deref().unwrap_or("unknown")
            )),
            Err(e) => e.into(),
        }
    }

    /// Verify only
    pub async fn verify(&self, platform: TargetPlatform, binary: &Path) -> Outcome {
        match self.signer(platform).verify(binary).await {
            Ok(verification) => verification.into(),
            Err(e) => e.into(),
        }
    }

    /// Run every applicable step for one binary, stopping at the first failure
    #[instrument(skip(self, request, credentials), fields(path = %request.binary.display(), platform = %request.platform))]
    pub async fn process(&self, request: &SigningRequest, credentials: &Credentials) -> BinaryReport {
        let signer = self.signer(request.platform);

        match signer.sign(request, credentials).await {
            Ok(SignReport::Signed) => {}
            Ok(SignReport::Skipped { reason }) => {
                return BinaryReport::new(request, Outcome::skipped(reason));
            }
            Err(e) => return BinaryReport::failed(request, Stage::Sign, e),
        }

        let mut submission_id = None;
        if signer.requires_notarization() {
            if self.options.notarize {
                match self.notarizer.notarize(&request.binary, credentials).await {
                    Ok(verdict) => submission_id = verdict.submission_id,
                    Err(e) => return BinaryReport::failed(request, Stage::Notarize, e),
                }
            } else {
                warn!("notarization disabled, {} will not pass Gatekeeper", request.display_name());
            }
        }

        let outcome = if self.options.verify {
            match signer.verify(&request.binary).await {
                Ok(verification) => verification.into(),
                Err(e) => return BinaryReport::failed(request, Stage::Verify, e),
            }
        } else {
            Outcome::unverified("verification disabled")
        };

        match outcome.status {
            OutcomeStatus::Unverified => {
                info!("Signed {} ({})", request.display_name(), outcome.message)
            }
            _ => info!("Signed and verified {}", request.display_name()),
        }

        let mut report = BinaryReport::new(request, outcome);
        report.submission_id = submission_id;
        report.sha256 = match sha256_file(&request.binary) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!(error = %e, "could not hash signed binary");
                None
            }
        };
        report
    }

    /// Process binaries one after another, recording every result
    pub async fn process_batch(&self, requests: &[SigningRequest], credentials: &Credentials) -> BatchReport {
        let started_at = Utc::now();
        let mut binaries = Vec::with_capacity(requests.len());

        for request in requests {
            binaries.push(self.process(request, credentials).await);
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            binaries,
        };
        info!(
            total = report.binaries.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch complete"
        );
        report
    }
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{
        CODE_SIGN_TOOL_EXE, ESIGNER_PASSWORD, ESIGNER_TOTP_SECRET, ESIGNER_USERNAME,
        MACOS_CERTIFICATE_NAME, NOTARIZATION_APPLE_ID, NOTARIZATION_PASSWORD,
        NOTARIZATION_TEAM_ID,
    };
    use crate::error::FailureKind;
    use crate::testutil::{arg_after, fail, ok, ScriptedRunner};
    use tempfile::TempDir;

    fn mac_credentials() -> Credentials {
        Credentials::from_pairs(&[
            (MACOS_CERTIFICATE_NAME, "DevCert"),
            (NOTARIZATION_APPLE_ID, "dev@example.com"),
            (NOTARIZATION_TEAM_ID, "TEAM123"),
            (NOTARIZATION_PASSWORD, "app-specific"),
        ])
    }

    fn binary(temp: &TempDir, name: &str) -> PathBuf {
        let path = temp.path().join(name);
        std::fs::write(&path, b"binary").unwrap();
        path
    }

    fn programs(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .calls()
            .iter()
            .map(|c| match c.get_args().get(1) {
                Some(sub) if c.program() == "xcrun" => format!("xcrun {}", sub),
                _ => c.program().to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_macos_full_sequence() {
        let temp = TempDir::new().unwrap();
        let server = binary(&temp, "server");
        let runner = Arc::new(
            ScriptedRunner::new()
                .then(ok(""))
                .then(ok(""))
                .then(ok(""))
                .then(ok("  id: abc-123\n  status: Accepted\n"))
                .then(ok("")),
        );
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::MacOS, &SigningConfig::default());

        let report = pipeline.process(&SigningRequest::new(&server), &mac_credentials()).await;

        assert!(report.success());
        assert_eq!(report.outcome.status, OutcomeStatus::Succeeded);
        assert_eq!(report.submission_id.as_deref(), Some("abc-123"));
        assert!(report.sha256.is_some());
        assert_eq!(
            programs(&runner),
            vec![
                "codesign",
                "ditto",
                "xcrun store-credentials",
                "xcrun submit",
                "codesign"
            ]
        );
        assert_eq!(
            arg_after(&runner.calls()[0], "--identifier"),
            Some("com.browseros.server")
        );
    }

    #[tokio::test]
    async fn test_sign_failure_short_circuits() {
        let temp = TempDir::new().unwrap();
        let server = binary(&temp, "server");
        let runner = Arc::new(ScriptedRunner::new().then(fail(1, "errSecInternalComponent")));
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::MacOS, &SigningConfig::default());

        let report = pipeline.process(&SigningRequest::new(&server), &mac_credentials()).await;

        assert!(!report.success());
        assert_eq!(report.failed_stage, Some(Stage::Sign));
        assert_eq!(report.outcome.failure, Some(FailureKind::SigningToolFailure));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_notarization_skips_verification() {
        let temp = TempDir::new().unwrap();
        let server = binary(&temp, "server");
        let runner = Arc::new(
            ScriptedRunner::new()
                .then(ok(""))
                .then(ok(""))
                .then(ok(""))
                .then(ok("  status: Invalid\n")),
        );
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::MacOS, &SigningConfig::default());

        let report = pipeline.process(&SigningRequest::new(&server), &mac_credentials()).await;

        assert_eq!(report.failed_stage, Some(Stage::Notarize));
        assert_eq!(report.outcome.failure, Some(FailureKind::NotAccepted));
        assert_eq!(runner.call_count(), 4);
    }

    #[tokio::test]
    async fn test_notarization_disabled() {
        let temp = TempDir::new().unwrap();
        let server = binary(&temp, "server");
        let runner = Arc::new(ScriptedRunner::new());
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::MacOS, &SigningConfig::default())
            .with_options(PipelineOptions {
                notarize: false,
                verify: true,
            });

        let report = pipeline.process(&SigningRequest::new(&server), &mac_credentials()).await;

        assert!(report.success());
        assert_eq!(programs(&runner), vec!["codesign", "codesign"]);
    }

    #[tokio::test]
    async fn test_windows_soft_skip_reports_skipped() {
        let temp = TempDir::new().unwrap();
        let exe = binary(&temp, "server.exe");
        let runner = Arc::new(ScriptedRunner::new());
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::Windows, &SigningConfig::default());

        let report = pipeline.process(&SigningRequest::new(&exe), &Credentials::default()).await;

        assert!(report.success());
        assert_eq!(report.outcome.status, OutcomeStatus::Skipped);
        assert!(report.sha256.is_none());
        assert_eq!(runner.call_count(), 0);
        assert_eq!(std::fs::read(&exe).unwrap(), b"binary");
    }

    #[tokio::test]
    async fn test_windows_on_linux_is_unverified_pass() {
        let temp = TempDir::new().unwrap();
        let exe = binary(&temp, "server.exe");
        let tool = binary(&temp, "CodeSignTool.sh");
        let creds = Credentials::from_lookup(|name| match name {
            CODE_SIGN_TOOL_EXE => Some(tool.display().to_string()),
            ESIGNER_USERNAME => Some("builder".to_string()),
            ESIGNER_PASSWORD => Some("pw".to_string()),
            ESIGNER_TOTP_SECRET => Some("seed".to_string()),
            _ => None,
        });
        let runner = Arc::new(ScriptedRunner::new().then_with(|cmd| {
            let output_dir = PathBuf::from(arg_after(cmd, "-output_dir_path").unwrap());
            std::fs::write(output_dir.join("server.exe"), b"signed")?;
            Ok(ok(""))
        }));
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::Linux, &SigningConfig::default());

        let report = pipeline.process(&SigningRequest::new(&exe), &creds).await;

        assert!(report.success());
        assert_eq!(report.outcome.status, OutcomeStatus::Unverified);
        assert!(!report.outcome.is_verified());
        assert!(report.submission_id.is_none());
        assert_eq!(runner.call_count(), 1);
        assert_eq!(std::fs::read(&exe).unwrap(), b"signed");
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let temp = TempDir::new().unwrap();
        let first = binary(&temp, "first");
        let second = binary(&temp, "second.exe");
        let runner = Arc::new(ScriptedRunner::new());
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::Linux, &SigningConfig::default());

        let report = pipeline
            .process_batch(
                &[SigningRequest::new(&first), SigningRequest::new(&second)],
                &mac_credentials(),
            )
            .await;

        assert_eq!(report.binaries.len(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(report.binaries[0].outcome.failure, Some(FailureKind::PlatformMismatch));
        assert_eq!(report.count(OutcomeStatus::Skipped), 1);
        assert!(report.finished_at >= report.started_at);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_standalone_operations_return_outcomes() {
        let runner = Arc::new(ScriptedRunner::new());
        let pipeline = SigningPipeline::with_runner(runner.clone(), HostPlatform::Windows, &SigningConfig::default());

        let outcome = pipeline
            .notarize(Path::new("/out/server"), &mac_credentials())
            .await;
        assert_eq!(outcome.failure, Some(FailureKind::PlatformMismatch));

        let outcome = pipeline
            .sign(&SigningRequest::new("/out/server"), &mac_credentials())
            .await;
        assert_eq!(outcome.failure, Some(FailureKind::PlatformMismatch));

        let outcome = pipeline.verify(TargetPlatform::Windows, Path::new("server.exe")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::VerificationFailed));
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn test_batch_json() {
        let request = SigningRequest::new("/out/server");
        let report = BatchReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            binaries: vec![BinaryReport::failed(
                &request,
                Stage::Notarize,
                SigningError::NotAccepted("status: Invalid".to_string()),
            )],
        };

        let json = serde_json::to_value(&report).unwrap();
        let entry = &json["binaries"][0];
        assert_eq!(entry["platform"], "macos");
        assert_eq!(entry["failed_stage"], "notarize");
        assert_eq!(entry["outcome"]["failure"], "not_accepted");
        assert!(entry.get("sha256").is_none());
    }
}
