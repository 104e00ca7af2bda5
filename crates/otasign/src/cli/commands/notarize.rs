//! Notarize command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use otasign_signing::{Credentials, SigningPipeline};

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

use super::{load_config_or_exit, runtime};

/// Notarize a signed macOS binary
#[derive(Debug, Args)]
pub struct NotarizeCommand {
    /// Signed binary to submit
    #[arg(required = true)]
    pub binary: PathBuf,
}

impl NotarizeCommand {
    /// Execute the notarize command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(binary = %self.binary.display(), "executing notarize command");
        let config = load_config_or_exit()?;
        let pipeline = SigningPipeline::new(&config);
        let credentials = Credentials::from_env();

        if cli.prints_text() {
            output::info("Submitting for notarization (this may take a while)...");
        }

        let rt = runtime()?;
        let outcome = rt.block_on(pipeline.notarize(&self.binary, &credentials));

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "binary": self.binary,
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
