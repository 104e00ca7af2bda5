//! Windows signing through SSL.com eSigner CodeSignTool (cloud HSM)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::credentials::{
    Credentials, CODE_SIGN_TOOL_EXE, CODE_SIGN_TOOL_PATH, ESIGNER_PASSWORD, ESIGNER_TOTP_SECRET,
    ESIGNER_USERNAME,
};
use crate::error::{Result, SigningError};
use crate::outcome::Verification;
use crate::platform::{HostPlatform, TargetPlatform};
use crate::provider::{PlatformSigner, SignReport, SigningRequest};
use crate::runner::{ToolCommand, ToolRunner};

/// Launcher shipped in the CodeSignTool distribution directory
pub const CODE_SIGN_TOOL_LAUNCHER: &str = "CodeSignTool.bat";

/// CodeSignTool can exit 0 after failing; its stdout is the only reliable signal
const ERROR_MARKER: &str = "Error:";

/// `Get-AuthenticodeSignature` status for a good signature
const VALID_STATUS: &str = "Valid";

/// Signs via the eSigner remote HSM. The tool is a Java application, so it
/// runs on any desktop host, but Authenticode verification needs Windows.
pub struct WindowsSigner {
    runner: Arc<dyn ToolRunner>,
    host: HostPlatform,
}

impl WindowsSigner {
    pub fn new(runner: Arc<dyn ToolRunner>, host: HostPlatform) -> Self {
        Self { runner, host }
    }

    /// Locate CodeSignTool: the direct executable override first, then the
    /// launcher inside the configured tool directory.
    pub fn resolve_tool(credentials: &Credentials) -> Option<PathBuf> {
        if let Some(exe) = credentials.get(CODE_SIGN_TOOL_EXE) {
            return Some(PathBuf::from(exe));
        }
        credentials
            .get(CODE_SIGN_TOOL_PATH)
            .map(|dir| Path::new(dir).join(CODE_SIGN_TOOL_LAUNCHER))
    }

    fn sign_command(
        tool: &Path,
        credentials: &Credentials,
        [username, password, totp_secret]: [&str; 3],
        binary: &Path,
        output_dir: &Path,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new(tool.display().to_string())
            .args(["sign", "-username", username, "-password"])
            .secret_arg(password);

        if let Some(credential_id) = credentials.esigner_credential_id() {
            cmd = cmd.args(["-credential_id", credential_id]);
        }

        cmd = cmd
            .arg("-totp_secret")
            .secret_arg(totp_secret)
            .args([
                "-input_file_path".to_string(),
                binary.display().to_string(),
                "-output_dir_path".to_string(),
                output_dir.display().to_string(),
                "-override".to_string(),
            ])
            .via_shell();

        match tool.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => cmd.current_dir(dir),
            None => cmd,
        }
    }

    fn tool_failure(reason: String) -> SigningError {
        SigningError::SigningToolFailure {
            tool: "CodeSignTool".to_string(),
            reason,
        }
    }
}

#[async_trait::async_trait]
impl PlatformSigner for WindowsSigner {
    fn name(&self) -> &str {
        "windows"
    }

    fn platform(&self) -> TargetPlatform {
        TargetPlatform::Windows
    }

    fn supports_host(&self, host: HostPlatform) -> bool {
        matches!(
            host,
            HostPlatform::Windows | HostPlatform::MacOS | HostPlatform::Linux
        )
    }

    #[instrument(skip(self, request, credentials), fields(signer = "windows", path = %request.binary.display()))]
    async fn sign(&self, request: &SigningRequest, credentials: &Credentials) -> Result<SignReport> {
        self.ensure_host(self.host)?;

        // Unconfigured tool means signing is optional here; a missing
        // certificate on the macOS path is a hard error instead.
        let Some(tool) = Self::resolve_tool(credentials) else {
            let reason = format!("{} not set - skipping Windows signing", CODE_SIGN_TOOL_EXE);
            warn!("{}", reason);
            return Ok(SignReport::Skipped { reason });
        };

        if !tool.exists() {
            return Err(SigningError::ToolNotFound {
                tool: tool.display().to_string(),
                hint: format!("Set {} or {} to a valid location", CODE_SIGN_TOOL_EXE, CODE_SIGN_TOOL_PATH),
            });
        }

        let secrets = credentials.require([ESIGNER_USERNAME, ESIGNER_PASSWORD, ESIGNER_TOTP_SECRET])?;

        let binary = request.binary.as_path();
        let file_name = binary
            .file_name()
            .ok_or_else(|| Self::tool_failure(format!("{} is not a file path", binary.display())))?;
        let parent = binary
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        info!("Signing {}...", request.display_name());

        // Removed on drop; a failed removal is ignored.
        let staging = tempfile::Builder::new()
            .prefix("signed_temp")
            .tempdir_in(parent)
            .map_err(|e| Self::tool_failure(format!("failed to create staging directory: {}", e)))?;

        let cmd = Self::sign_command(&tool, credentials, secrets, binary, staging.path());
        let output = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| SigningError::from_spawn("CodeSignTool", e, Self::tool_failure))?;

        if output.stdout.contains(ERROR_MARKER) {
            error!("CodeSignTool reported an error");
            return Err(Self::tool_failure(output.stdout.trim().to_string()));
        }
        if !output.success() {
            error!(code = ?output.code, "CodeSignTool failed");
            return Err(Self::tool_failure(output.diagnostics().to_string()));
        }

        let signed = staging.path().join(file_name);
        if !signed.exists() {
            return Err(Self::tool_failure(format!(
                "signed output {} was not produced",
                signed.display()
            )));
        }

        std::fs::rename(&signed, binary).map_err(|e| {
            Self::tool_failure(format!("failed to replace {}: {}", binary.display(), e))
        })?;

        if let Err(e) = staging.close() {
            warn!(error = %e, "failed to remove staging directory");
        }

        info!("Signed {}", request.display_name());
        Ok(SignReport::Signed)
    }

    #[instrument(skip(self), fields(signer = "windows", path = %binary.display()))]
    async fn verify(&self, binary: &Path) -> Result<Verification> {
        if self.host != HostPlatform::Windows {
            return Ok(Verification::Skipped(
                "verification skipped on non-Windows".to_string(),
            ));
        }

        // Single-quoted PowerShell literal: `'` is escaped by doubling
        let literal = binary.display().to_string().replace('\'', "''");
        let cmd = ToolCommand::new("powershell").args([
            "-Command".to_string(),
            format!("(Get-AuthenticodeSignature '{}').Status", literal),
        ]);

        let output = self.runner.run(&cmd).await.map_err(|e| {
            SigningError::from_spawn("powershell", e, |reason| SigningError::VerificationFailed {
                path: binary.to_path_buf(),
                reason,
            })
        })?;

        let status = output.stdout.trim();
        if status.lines().any(|line| line.trim() == VALID_STATUS) {
            Ok(Verification::Verified(status.to_string()))
        } else {
            Err(SigningError::VerificationFailed {
                path: binary.to_path_buf(),
                reason: if status.is_empty() {
                    output.diagnostics().to_string()
                } else {
                    status.to_string()
                },
            })
        }
    }
}
