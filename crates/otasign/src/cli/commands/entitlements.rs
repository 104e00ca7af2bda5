//! Entitlements command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::{output, Cli, OutputFormat};

use super::load_config_or_exit;

/// Show which entitlements file would be used
#[derive(Debug, Args)]
pub struct EntitlementsCommand {
    /// Root directory to search (defaults to the working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl EntitlementsCommand {
    /// Execute the entitlements command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        info!(root = %root.display(), "executing entitlements command");

        let config = load_config_or_exit()?;
        let resolver = config.entitlements.resolver();
        let found = resolver.resolve(&root);

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "root": root,
                    "entitlements": found,
                    "candidates": resolver.candidates(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => match &found {
                Some(path) => {
                    if cli.quiet {
                        println!("{}", path.display());
                    } else {
                        output::success(&format!(
                            "Entitlements: {}",
                            output::path_style().apply_to(path.display())
                        ));
                    }
                }
                None => {
                    output::warning("No entitlements file found; binaries will be signed without one");
                    if cli.verbose {
                        println!("{}", output::header("Searched:"));
                        for candidate in resolver.candidates() {
                            println!("  {}", root.join(candidate).display());
                        }
                    }
                }
            },
        }

        Ok(())
    }
}
