//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, SigningError};

use super::defaults::config_file_names;
use super::types::SigningConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<SigningConfig> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path)
        .map_err(|e| SigningError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: SigningConfig = if format == "TOML" {
        toml::from_str(&content)
            .map_err(|e| SigningError::Config(format!("TOML parsing error: {}", e)))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| SigningError::Config(format!("YAML parsing error: {}", e)))?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in `start_dir` or any parent directory.
///
/// The first match wins; file names are tried in [`config_file_names`] order
/// at each level before moving up.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(SigningConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| {
        SigningError::Config(format!("Configuration file not found at {}", dir.display()))
    })?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration, falling back to defaults only when no file exists.
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(dir: &Path) -> Result<(SigningConfig, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((SigningConfig::default(), None))
        }
    }
}
