//! Doctor command - check the environment for signing tools and credentials

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use otasign_signing::credentials::{
    ALL_VARIABLES, CODE_SIGN_TOOL_EXE, CODE_SIGN_TOOL_PATH, ESIGNER_CREDENTIAL_ID,
};
use otasign_signing::{Credentials, HostPlatform, WindowsSigner};

use crate::cli::{Cli, OutputFormat};

/// Check signing tools and credentials
#[derive(Debug, Args)]
pub struct DoctorCommand {
    /// Show suggestions for fixing issues
    #[arg(long)]
    pub fix: bool,
}

/// Result of a single check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: Option<String>,
    pub fix_suggestion: Option<String>,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: Some(message.into()),
            fix_suggestion: None,
        }
    }

    fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix_suggestion = Some(fix.into());
        self
    }
}

/// Status of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
    Skip,
}

/// Summary of all checks
#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub host: HostPlatform,
    pub checks: Vec<CheckResult>,
    pub ok_count: usize,
    pub warn_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
}

impl DoctorSummary {
    fn new(host: HostPlatform, checks: Vec<CheckResult>) -> Self {
        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        Self {
            host,
            ok_count: count(CheckStatus::Ok),
            warn_count: count(CheckStatus::Warn),
            fail_count: count(CheckStatus::Fail),
            skip_count: count(CheckStatus::Skip),
            checks,
        }
    }
}

impl DoctorCommand {
    /// Execute the doctor command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(fix = self.fix, "executing doctor command");
        let host = HostPlatform::current();
        let credentials = Credentials::from_env();

        if cli.prints_text() {
            println!("{}", style("Checking signing environment...").bold());
            println!();
        }

        let mut checks = tool_checks(host, &credentials, |tool| which::which(tool).is_ok());
        checks.extend(credential_checks(&credentials));
        let summary = DoctorSummary::new(host, checks);

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text => {
                self.print_results(&summary.checks, cli);
                if !cli.quiet {
                    print_summary(&summary);
                }

                if self.fix && (summary.fail_count > 0 || summary.warn_count > 0) {
                    println!();
                    println!("{}", style("Suggested fixes:").bold());
                    for check in &summary.checks {
                        if matches!(check.status, CheckStatus::Fail | CheckStatus::Warn) {
                            if let Some(ref fix) = check.fix_suggestion {
                                println!(
                                    "  {} {}: {}",
                                    status_icon(check.status),
                                    style(&check.name).bold(),
                                    fix
                                );
                            }
                        }
                    }
                }
            }
        }

        if summary.fail_count > 0 {
            anyhow::bail!("{} check(s) failed", summary.fail_count);
        }

        Ok(())
    }

    fn print_results(&self, checks: &[CheckResult], cli: &Cli) {
        if cli.quiet {
            return;
        }

        for check in checks {
            let icon = status_icon(check.status);
            let name = &check.name;
            let msg = check.message.as_deref().unwrap_or("");

            match check.status {
                CheckStatus::Ok => println!("  {} {} {}", icon, style(name).green(), style(msg).dim()),
                CheckStatus::Warn => println!("  {} {} {}", icon, style(name).yellow(), style(msg).dim()),
                CheckStatus::Fail => println!("  {} {} {}", icon, style(name).red(), style(msg).dim()),
                CheckStatus::Skip => println!("  {} {} {}", icon, style(name).dim(), style(msg).dim()),
            }
        }
    }
}

fn print_summary(summary: &DoctorSummary) {
    println!();
    let total = summary.checks.len();

    if summary.fail_count == 0 && summary.warn_count == 0 {
        println!(
            "{} All {} checks passed!",
            style("✓").green().bold(),
            summary.ok_count
        );
    } else {
        println!(
            "Summary: {} ok, {} warnings, {} failed, {} skipped (out of {})",
            style(summary.ok_count).green(),
            style(summary.warn_count).yellow(),
            style(summary.fail_count).red(),
            style(summary.skip_count).dim(),
            total
        );
    }
}

/// Check the external tools each signer shells out to.
///
/// Tools belonging to another host are reported as skipped, not missing.
fn tool_checks(
    host: HostPlatform,
    credentials: &Credentials,
    on_path: impl Fn(&str) -> bool,
) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for tool in ["codesign", "xcrun", "ditto"] {
        let check = if host != HostPlatform::MacOS {
            CheckResult::new(tool, CheckStatus::Skip, "macOS only")
        } else if on_path(tool) {
            CheckResult::new(tool, CheckStatus::Ok, "Found")
        } else {
            CheckResult::new(tool, CheckStatus::Fail, "Not found")
                .with_fix("Install the Xcode command line tools with 'xcode-select --install'")
        };
        results.push(check);
    }

    let powershell = if host != HostPlatform::Windows {
        CheckResult::new("powershell", CheckStatus::Skip, "Windows only; verification will be skipped")
    } else if on_path("powershell") {
        CheckResult::new("powershell", CheckStatus::Ok, "Found")
    } else {
        CheckResult::new("powershell", CheckStatus::Warn, "Not found")
            .with_fix("Authenticode verification needs Windows PowerShell on PATH")
    };
    results.push(powershell);

    let code_sign_tool = match WindowsSigner::resolve_tool(credentials) {
        Some(path) if path.exists() => {
            CheckResult::new("CodeSignTool", CheckStatus::Ok, path.display().to_string())
        }
        Some(path) => CheckResult::new(
            "CodeSignTool",
            CheckStatus::Fail,
            format!("{} does not exist", path.display()),
        )
        .with_fix(format!("Point {} or {} at the CodeSignTool install", CODE_SIGN_TOOL_EXE, CODE_SIGN_TOOL_PATH)),
        None => CheckResult::new(
            "CodeSignTool",
            CheckStatus::Skip,
            "Not configured; Windows signing will be skipped",
        )
        .with_fix(format!("Set {} or {}", CODE_SIGN_TOOL_EXE, CODE_SIGN_TOOL_PATH)),
    };
    results.push(code_sign_tool);

    results
}

/// Report which credential variables are set, never their values
fn credential_checks(credentials: &Credentials) -> Vec<CheckResult> {
    ALL_VARIABLES
        .iter()
        .filter(|(name, _)| *name != CODE_SIGN_TOOL_EXE && *name != CODE_SIGN_TOOL_PATH)
        .map(|&(name, secret)| {
            if credentials.is_set(name) {
                let message = if secret { "Set (hidden)" } else { "Set" };
                CheckResult::new(name, CheckStatus::Ok, message)
            } else if name == ESIGNER_CREDENTIAL_ID {
                CheckResult::new(name, CheckStatus::Skip, "Not set (optional)")
            } else {
                CheckResult::new(name, CheckStatus::Warn, "Not set")
                    .with_fix(format!("Export {} before signing", name))
            }
        })
        .collect()
}

fn status_icon(status: CheckStatus) -> console::StyledObject<&'static str> {
    match status {
        CheckStatus::Ok => style("[OK]").green(),
        CheckStatus::Warn => style("[WARN]").yellow(),
        CheckStatus::Fail => style("[FAIL]").red(),
        CheckStatus::Skip => style("[SKIP]").dim(),
    }
}
