//! Verify command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use otasign_signing::{SigningPipeline, TargetPlatform};

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

use super::{load_config_or_exit, parse_platform, runtime};

/// Verify the signature of a binary
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Binary to check
    #[arg(required = true)]
    pub binary: PathBuf,

    /// Target platform (macos, windows); inferred from the extension when omitted
    #[arg(short, long)]
    pub platform: Option<String>,
}

impl VerifyCommand {
    /// Execute the verify command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(binary = %self.binary.display(), "executing verify command");
        let config = load_config_or_exit()?;
        let platform = parse_platform(self.platform.as_deref())
            .unwrap_or_else(|| TargetPlatform::infer(&self.binary));
        let pipeline = SigningPipeline::new(&config);

        let rt = runtime()?;
        let outcome = rt.block_on(pipeline.verify(platform, &self.binary));

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "binary": self.binary,
                    "platform": platform,
                    "verified": outcome.is_verified(),
                    "outcome": outcome,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet || !outcome.success {
                    output::outcome(&self.binary.display().to_string(), &outcome);
                }
            }
        }

        if !outcome.success {
            std::process::exit(exit_codes::SIGNING_FAILED);
        }
        Ok(())
    }
}
