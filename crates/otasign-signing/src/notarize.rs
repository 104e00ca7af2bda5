//! Apple notarization using notarytool
//!
//! A signed binary is zipped with `ditto`, the account credentials are stored
//! under a keychain profile, and the archive is submitted with `--wait` so the
//! call blocks until Apple returns a verdict. There is no client-side timeout;
//! notarytool's own polling bounds the wait.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, error, info, instrument, warn};

use crate::credentials::{
    Credentials, NOTARIZATION_APPLE_ID, NOTARIZATION_PASSWORD, NOTARIZATION_TEAM_ID,
};
use crate::error::{Result, SigningError};
use crate::platform::HostPlatform;
use crate::runner::{ToolCommand, ToolOutput, ToolRunner};

/// Keychain profile name the credentials are stored under
pub const DEFAULT_PROFILE: &str = "notarytool-profile";

/// Text notarytool prints once the submission is approved
pub const ACCEPTED_MARKER: &str = "status: Accepted";

/// Verdict parsed from `notarytool submit --wait` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotarizationVerdict {
    /// Submission ID assigned by the notary service
    pub submission_id: Option<String>,
    /// Last reported status (e.g. `Accepted`, `Invalid`)
    pub status: Option<String>,
    pub accepted: bool,
}

impl NotarizationVerdict {
    /// Parse the tool's textual response.
    ///
    /// Only an explicit acceptance marker counts; empty, rejected and
    /// unrecognised output are all not accepted.
    pub fn parse(stdout: &str) -> Self {
        let field = |name: &str| {
            stdout
                .lines()
                .rev()
                .filter_map(|line| line.trim().strip_prefix(name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        Self {
            submission_id: field("id:"),
            status: field("status:"),
            accepted: stdout.contains(ACCEPTED_MARKER),
        }
    }

    fn summary(&self) -> String {
        format!(
            "status {} (submission {})",
            self.status.as_deref().unwrap_or("unknown"),
            self.submission_id.as_deref().unwrap_or("unknown"),
        )
    }
}

/// Drives notarytool for one binary at a time
pub struct Notarizer {
    runner: Arc<dyn ToolRunner>,
    host: HostPlatform,
    profile: String,
}

impl Notarizer {
    pub fn new(runner: Arc<dyn ToolRunner>, host: HostPlatform) -> Self {
        Self {
            runner,
            host,
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Package, submit and wait for a verdict on a signed binary.
    ///
    /// The temporary zip is owned by a guard and removed on every return path.
    #[instrument(skip(self, credentials), fields(path = %binary.display()))]
    pub async fn notarize(&self, binary: &Path, credentials: &Credentials) -> Result<NotarizationVerdict> {
        if self.host != HostPlatform::MacOS {
            return Err(SigningError::PlatformMismatch {
                operation: "notarization".to_string(),
                host: self.host,
            });
        }

        let [apple_id, team_id, password] = credentials.require([
            NOTARIZATION_APPLE_ID,
            NOTARIZATION_TEAM_ID,
            NOTARIZATION_PASSWORD,
        ])?;

        let name = binary
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| binary.display().to_string());
        info!("Notarizing {}...", name);

        let archive = tempfile::Builder::new()
            .prefix("notarize-")
            .suffix(".zip")
            .tempfile()
            .map_err(|e| SigningError::PackagingFailure(format!("failed to create temp zip: {}", e)))?
            .into_temp_path();

        self.package(binary, &archive).await?;
        self.store_credentials(apple_id, team_id, password).await;

        info!("Submitting for notarization (this may take a while)...");
        let output = self.submit(&archive).await?;

        let verdict = NotarizationVerdict::parse(&output.stdout);
        if !verdict.accepted {
            error!(status = ?verdict.status, "Notarization was not accepted");
            return Err(SigningError::NotAccepted(format!(
                "{}\n{}",
                verdict.summary(),
                output.stdout.trim()
            )));
        }

        info!(submission = ?verdict.submission_id, "Notarized {}", name);
        Ok(verdict)
    }

    /// Zip the binary with its parent directory kept in the archive
    async fn package(&self, binary: &Path, archive: &TempPath) -> Result<()> {
        let cmd = ToolCommand::new("ditto").args([
            "-c".to_string(),
            "-k".to_string(),
            "--keepParent".to_string(),
            binary.display().to_string(),
            archive.display().to_string(),
        ]);

        let output = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| SigningError::from_spawn("ditto", e, SigningError::PackagingFailure))?;

        if !output.success() {
            return Err(SigningError::PackagingFailure(format!(
                "Failed to create zip: {}",
                output.diagnostics()
            )));
        }
        debug!(archive = %archive.display(), "created notarization archive");
        Ok(())
    }

    /// Store the account under the keychain profile.
    ///
    /// Failures are tolerated: the profile usually survives from an earlier
    /// run, and a genuinely broken profile makes the submit step fail anyway.
    async fn store_credentials(&self, apple_id: &str, team_id: &str, password: &str) {
        let cmd = ToolCommand::new("xcrun")
            .args(["notarytool", "store-credentials", self.profile.as_str()])
            .args(["--apple-id", apple_id, "--team-id", team_id, "--password"])
            .secret_arg(password);

        match self.runner.run(&cmd).await {
            Ok(output) if output.success() => {
                debug!(profile = %self.profile, "stored notarytool credentials");
            }
            Ok(output) => {
                warn!(
                    profile = %self.profile,
                    code = ?output.code,
                    "store-credentials failed, continuing with existing profile"
                );
            }
            Err(e) => {
                warn!(profile = %self.profile, error = %e, "could not run store-credentials");
            }
        }
    }

    async fn submit(&self, archive: &TempPath) -> Result<ToolOutput> {
        let cmd = ToolCommand::new("xcrun").args([
            "notarytool".to_string(),
            "submit".to_string(),
            archive.display().to_string(),
            "--keychain-profile".to_string(),
            self.profile.clone(),
            "--wait".to_string(),
        ]);

        let output = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| SigningError::from_spawn("xcrun", e, SigningError::SubmissionFailure))?;

        if !output.success() {
            return Err(SigningError::SubmissionFailure(format!(
                "{}\n{}",
                output.stderr.trim(),
                output.stdout.trim()
            )));
        }
        Ok(output)
    }
}
