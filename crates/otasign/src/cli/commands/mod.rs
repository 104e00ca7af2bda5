//! CLI commands

mod doctor;
mod entitlements;
mod notarize;
mod sign;
mod verify;

pub use doctor::DoctorCommand;
pub use entitlements::EntitlementsCommand;
pub use notarize::NotarizeCommand;
pub use sign::SignCommand;
pub use verify::VerifyCommand;

use otasign_signing::{load_config_or_default, SigningConfig, SigningError, TargetPlatform};
use tracing::debug;

use crate::cli::output;
use crate::exit_codes;

/// Load the config for the working directory; a broken file ends the process
/// with the configuration exit code.
fn load_config_or_exit() -> anyhow::Result<SigningConfig> {
    let cwd = std::env::current_dir()?;
    match load_config_or_default(&cwd) {
        Ok((config, path)) => {
            debug!(path = ?path, "using configuration");
            Ok(config)
        }
        Err(e) => config_error(&e),
    }
}

/// Parse an explicit `--platform` value, exiting on an unknown name
fn parse_platform(value: Option<&str>) -> Option<TargetPlatform> {
    match value.map(str::parse::<TargetPlatform>).transpose() {
        Ok(platform) => platform,
        Err(e) => config_error(&e),
    }
}

fn config_error(error: &SigningError) -> ! {
    output::error(&error.to_string());
    std::process::exit(exit_codes::CONFIG_ERROR)
}

/// Build the tokio runtime used by async commands
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
