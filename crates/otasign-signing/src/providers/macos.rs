//! macOS certificate signing with codesign

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::credentials::{Credentials, MACOS_CERTIFICATE_NAME};
use crate::error::{Result, SigningError};
use crate::outcome::Verification;
use crate::platform::{HostPlatform, TargetPlatform};
use crate::provider::{PlatformSigner, SignReport, SigningRequest};
use crate::runner::{ToolCommand, ToolRunner};

const CODESIGN: &str = "codesign";

/// Signs with a keychain certificate via `codesign`. Signed binaries must
/// then be notarized.
pub struct MacOSSigner {
    runner: Arc<dyn ToolRunner>,
    host: HostPlatform,
    /// Middle component of the bundle identifier, `com.<product>.<stem>`
    product: String,
    hardened_runtime: bool,
}

impl MacOSSigner {
    pub fn new(runner: Arc<dyn ToolRunner>, host: HostPlatform, product: impl Into<String>) -> Self {
        Self {
            runner,
            host,
            product: product.into(),
            hardened_runtime: true,
        }
    }

    pub fn with_hardened_runtime(mut self, enabled: bool) -> Self {
        self.hardened_runtime = enabled;
        self
    }

    /// Deterministic identifier derived from the binary's file stem
    pub fn identifier(&self, binary: &Path) -> String {
        let stem = binary
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("com.{}.{}", self.product, stem)
    }

    fn sign_command(&self, identity: &str, binary: &Path, entitlements: Option<&Path>) -> ToolCommand {
        let mut cmd = ToolCommand::new(CODESIGN)
            .args(["--sign", identity, "--force", "--timestamp"])
            .args(["--identifier".to_string(), self.identifier(binary)]);

        if self.hardened_runtime {
            cmd = cmd.args(["--options", "runtime"]);
        }

        if let Some(entitlements) = entitlements {
            cmd = cmd.args(["--entitlements".to_string(), entitlements.display().to_string()]);
        }

        cmd.arg(binary.display().to_string())
    }

    fn tool_failure(reason: String) -> SigningError {
        SigningError::SigningToolFailure {
            tool: CODESIGN.to_string(),
            reason,
        }
    }
}

#[async_trait::async_trait]
impl PlatformSigner for MacOSSigner {
    fn name(&self) -> &str {
        "macos"
    }

    fn platform(&self) -> TargetPlatform {
        TargetPlatform::MacOS
    }

    fn supports_host(&self, host: HostPlatform) -> bool {
        host == HostPlatform::MacOS
    }

    fn requires_notarization(&self) -> bool {
        true
    }

    #[instrument(skip(self, request, credentials), fields(signer = "macos", path = %request.binary.display()))]
    async fn sign(&self, request: &SigningRequest, credentials: &Credentials) -> Result<SignReport> {
        self.ensure_host(self.host)?;

        let [identity] = credentials.require([MACOS_CERTIFICATE_NAME])?;

        let entitlements = match request.entitlements.as_deref() {
            Some(path) if path.exists() => Some(path),
            Some(path) => {
                warn!(path = %path.display(), "entitlements file does not exist, signing without it");
                None
            }
            None => None,
        };

        info!("Signing {}...", request.display_name());
        let cmd = self.sign_command(identity, &request.binary, entitlements);

        let output = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| SigningError::from_spawn(CODESIGN, e, Self::tool_failure))?;

        if !output.success() {
            error!(code = ?output.code, "codesign failed");
            return Err(Self::tool_failure(output.stderr.trim().to_string()));
        }

        info!("Signed {}", request.display_name());
        Ok(SignReport::Signed)
    }

    #[instrument(skip(self), fields(signer = "macos", path = %binary.display()))]
    async fn verify(&self, binary: &Path) -> Result<Verification> {
        if !self.supports_host(self.host) {
            return Err(SigningError::PlatformMismatch {
                operation: "codesign verification".to_string(),
                host: self.host,
            });
        }

        let cmd = ToolCommand::new(CODESIGN)
            .args(["--verify", "--verbose=2"])
            .arg(binary.display().to_string());

        let output = self.runner.run(&cmd).await.map_err(|e| {
            SigningError::from_spawn(CODESIGN, e, |reason| SigningError::VerificationFailed {
                path: binary.to_path_buf(),
                reason,
            })
        })?;

        if output.success() {
            Ok(Verification::Verified(output.diagnostics().to_string()))
        } else {
            Err(SigningError::VerificationFailed {
                path: binary.to_path_buf(),
                reason: output.diagnostics().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::testutil::{fail, ok, ScriptedRunner};
    use tempfile::TempDir;

    fn dev_cert() -> Credentials {
        Credentials::from_pairs(&[(MACOS_CERTIFICATE_NAME, "DevCert")])
    }

    #[test]
    fn test_identifier_uses_file_stem() {
        let signer = MacOSSigner::new(Arc::new(ScriptedRunner::new()), HostPlatform::MacOS, "browseros");
        assert_eq!(signer.identifier(Path::new("/out/server")), "com.browseros.server");
        assert_eq!(
            signer.identifier(Path::new("/out/helper.bin")),
            "com.browseros.helper"
        );
    }

    #[tokio::test]
    async fn test_sign_builds_codesign_command() {
        let temp = TempDir::new().unwrap();
        let binary = temp.path().join("server");
        std::fs::write(&binary, b"binary").unwrap();

        let runner = Arc::new(ScriptedRunner::new().then(ok("")));
        let signer = MacOSSigner::new(runner.clone(), HostPlatform::MacOS, "browseros");

        let report = signer
            .sign(&SigningRequest::new(&binary), &dev_cert())
            .await
            .unwrap();
        assert_eq!(report, SignReport::Signed);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program(), "codesign");
        assert_eq!(
            calls[0].get_args(),
            &[
                "--sign",
                "DevCert",
                "--force",
                "--timestamp",
                "--identifier",
                "com.browseros.server",
                "--options",
                "runtime",
                binary.to_str().unwrap(),
            ]
        );
        assert!(binary.exists());
    }

    #[tokio::test]
    async fn test_entitlements_attached_only_when_present() {
        let temp = TempDir::new().unwrap();
        let binary = temp.path().join("server");
        let plist = temp.path().join("entitlements.plist");
        std::fs::write(&binary, b"binary").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        let signer = MacOSSigner::new(runner.clone(), HostPlatform::MacOS, "browseros");

        let request = SigningRequest::new(&binary).with_entitlements(Some(plist.clone()));
        signer.sign(&request, &dev_cert()).await.unwrap();
        assert!(!runner.calls()[0].get_args().contains(&"--entitlements".to_string()));

        std::fs::write(&plist, "<plist/>").unwrap();
        signer.sign(&request, &dev_cert()).await.unwrap();
        let args = runner.calls()[1].get_args().to_vec();
        let pos = args.iter().position(|a| a == "--entitlements").unwrap();
        assert_eq!(args[pos + 1], plist.display().to_string());
    }

    #[tokio::test]
    async fn test_missing_identity_is_an_error() {
        let runner = Arc::new(ScriptedRunner::new());
        let signer = MacOSSigner::new(runner.clone(), HostPlatform::MacOS, "browseros");

        let err = signer
            .sign(&SigningRequest::new("/tmp/server"), &Credentials::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingCredentials);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_host_invokes_nothing() {
        let runner = Arc::new(ScriptedRunner::new());
        let signer = MacOSSigner::new(runner.clone(), HostPlatform::Linux, "browseros");

        let err = signer
            .sign(&SigningRequest::new("/tmp/server"), &dev_cert())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PlatformMismatch);

        let err = signer.verify(Path::new("/tmp/server")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::PlatformMismatch);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let runner = Arc::new(
            ScriptedRunner::new().then(fail(1, "server: no identity found\n")),
        );
        let signer = MacOSSigner::new(runner, HostPlatform::MacOS, "browseros");

        let err = signer
            .sign(&SigningRequest::new("/tmp/server"), &dev_cert())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::SigningToolFailure);
        assert!(err.to_string().contains("no identity found"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_tool_not_found() {
        let runner = Arc::new(ScriptedRunner::new().then_with(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "codesign"))
        }));
        let signer = MacOSSigner::new(runner, HostPlatform::MacOS, "browseros");

        let err = signer
            .sign(&SigningRequest::new("/tmp/server"), &dev_cert())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ToolNotFound);
    }

    #[tokio::test]
    async fn test_verify_uses_exit_code_only() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then(ok(""))
                .then(fail(1, "code object is not signed at all")),
        );
        let signer = MacOSSigner::new(runner.clone(), HostPlatform::MacOS, "browseros");

        let verification = signer.verify(Path::new("/tmp/server")).await.unwrap();
        assert!(verification.is_verified());
        assert_eq!(
            runner.calls()[0].get_args(),
            &["--verify", "--verbose=2", "/tmp/server"]
        );

        let err = signer.verify(Path::new("/tmp/server")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::VerificationFailed);
        assert!(err.to_string().contains("not signed"));
    }
}
