//! Sign command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use otasign_signing::{
    BatchReport, BinaryReport, Credentials, PipelineOptions, SigningError, SigningPipeline,
    SigningRequest,
};

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

use super::{config_error, load_config_or_exit, parse_platform, runtime};

/// Sign binaries, then notarize and verify them
#[derive(Debug, Args)]
pub struct SignCommand {
    /// Binaries to sign (defaults to the configured artifact globs)
    pub binaries: Vec<PathBuf>,

    /// Target platform (macos, windows); inferred from the extension when omitted
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Entitlements plist for macOS binaries
    #[arg(long)]
    pub entitlements: Option<PathBuf>,

    /// Root directory searched for the default entitlements file
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Skip notarization of macOS binaries
    #[arg(long)]
    pub no_notarize: bool,

    /// Skip signature verification
    #[arg(long)]
    pub no_verify: bool,
}

/// JSON row for one binary
#[derive(Debug, Serialize)]
struct BinaryRow<'a> {
    #[serde(flatten)]
    report: &'a BinaryReport,
    verified: bool,
}

/// JSON document for a whole run
#[derive(Debug, Serialize)]
struct SignSummary<'a> {
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
    succeeded: usize,
    failed: usize,
    binaries: Vec<BinaryRow<'a>>,
}

impl SignCommand {
    /// Execute the sign command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            binaries = self.binaries.len(),
            platform = ?self.platform,
            "executing sign command"
        );
        let cwd = std::env::current_dir()?;
        let config = load_config_or_exit()?;
        let platform = parse_platform(self.platform.as_deref());

        let binaries = if self.binaries.is_empty() {
            match expand_artifacts(&config.artifacts, &cwd) {
                Ok(found) if !found.is_empty() => found,
                Ok(_) => config_error(&SigningError::Config(
                    "no binaries given and no configured artifacts matched".to_string(),
                )),
                Err(e) => config_error(&e),
            }
        } else {
            self.binaries.clone()
        };

        let entitlements = match &self.entitlements {
            Some(path) => Some(path.clone()),
            None => {
                let root = self.root.clone().unwrap_or_else(|| cwd.clone());
                config.entitlements.resolver().resolve(&root)
            }
        };
        if let Some(path) = &entitlements {
            info!(path = %path.display(), "using entitlements");
        }

        let requests: Vec<SigningRequest> = binaries
            .iter()
            .map(|binary| {
                let request = SigningRequest::new(binary).with_entitlements(entitlements.clone());
                match platform {
                    Some(p) => request.with_platform(p),
                    None => request,
                }
            })
            .collect();

        let options = PipelineOptions {
            notarize: config.notarization.enabled && !self.no_notarize,
            verify: config.verification.enabled && !self.no_verify,
        };
        let pipeline = SigningPipeline::new(&config).with_options(options);
        let credentials = Credentials::from_env();

        if cli.prints_text() {
            output::info(&format!("Signing {} binary(ies)", requests.len()));
        }

        let rt = runtime()?;
        let report = rt.block_on(pipeline.process_batch(&requests, &credentials));

        match cli.format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Text => print_text(&report, cli),
        }

        if !report.all_succeeded() {
            std::process::exit(exit_codes::SIGNING_FAILED);
        }
        Ok(())
    }
}

fn print_json(report: &BatchReport) -> anyhow::Result<()> {
    let summary = SignSummary {
        started_at: report.started_at,
        finished_at: report.finished_at,
        succeeded: report.succeeded(),
        failed: report.failed(),
        binaries: report
            .binaries
            .iter()
            .map(|b| BinaryRow {
                report: b,
                verified: b.outcome.is_verified(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn print_text(report: &BatchReport, cli: &Cli) {
    for binary in &report.binaries {
        if cli.quiet && binary.success() {
            continue;
        }
        output::outcome(&binary.binary.display().to_string(), &binary.outcome);
        if cli.quiet {
            continue;
        }
        if let Some(stage) = binary.failed_stage {
            println!("{}", output::key_value("failed at", &stage.to_string()));
        }
        if cli.verbose {
            if let Some(id) = &binary.submission_id {
                println!("{}", output::key_value("submission", id));
            }
            if let Some(digest) = &binary.sha256 {
                println!("{}", output::key_value("sha256", digest));
            }
        }
    }

    if cli.quiet {
        return;
    }
    println!();
    let elapsed = report.finished_at - report.started_at;
    println!(
        "{} {} succeeded, {} failed ({}s)",
        output::header("Summary:"),
        style(report.succeeded()).green(),
        style(report.failed()).red(),
        elapsed.num_seconds()
    );
}

/// Expand artifact globs relative to `base`, keeping first-seen order
fn expand_artifacts(patterns: &[String], base: &Path) -> Result<Vec<PathBuf>, SigningError> {
    let mut found = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            base.join(pattern).to_string_lossy().to_string()
        };

        let paths = glob::glob(&full)
            .map_err(|e| SigningError::Config(format!("artifacts - invalid pattern '{}': {}", pattern, e)))?;

        for path in paths.flatten() {
            if path.is_file() && !found.contains(&path) {
                found.push(path);
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_artifacts() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        std::fs::create_dir_all(out.join("nested.exe")).unwrap();
        for name in ["b.exe", "a.exe", "notes.txt"] {
            std::fs::write(out.join(name), b"x").unwrap();
        }

        let found = expand_artifacts(
            &["out/*.exe".to_string(), "out/a.*".to_string()],
            temp.path(),
        )
        .unwrap();

        assert_eq!(found, vec![out.join("a.exe"), out.join("b.exe")]);
    }

    #[test]
    fn test_expand_artifacts_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = expand_artifacts(&["out/[".to_string()], temp.path()).unwrap_err();
        assert!(err.to_string().contains("artifacts"));
    }

    #[test]
    fn test_expand_artifacts_no_match() {
        let temp = TempDir::new().unwrap();
        let found = expand_artifacts(&["*.dll".to_string()], temp.path()).unwrap();
        assert!(found.is_empty());
    }
}
