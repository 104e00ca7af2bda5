//! CLI definition and command handling

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{DoctorCommand, EntitlementsCommand, NotarizeCommand, SignCommand, VerifyCommand};

/// otasign - Sign, notarize and verify release binaries
#[derive(Debug, Parser)]
#[command(name = "otasign")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign binaries, then notarize and verify them
    Sign(SignCommand),

    /// Notarize a signed macOS binary
    Notarize(NotarizeCommand),

    /// Verify the signature of a binary
    Verify(VerifyCommand),

    /// Show which entitlements file would be used
    Entitlements(EntitlementsCommand),

    /// Check signing tools and credentials
    Doctor(DoctorCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Sign(ref cmd) => cmd.execute(&self),
            Commands::Notarize(ref cmd) => cmd.execute(&self),
            Commands::Verify(ref cmd) => cmd.execute(&self),
            Commands::Entitlements(ref cmd) => cmd.execute(&self),
            Commands::Doctor(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human-readable progress should be printed
    pub fn prints_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}
