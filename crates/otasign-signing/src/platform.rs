//! Host and target platform tags

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SigningError};

/// Operating system family the process is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    MacOS,
    Windows,
    Linux,
    Other,
}

impl HostPlatform {
    /// The platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOS
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOS => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "unsupported"),
        }
    }
}

/// Platform family a binary is being signed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    /// Signed with codesign and notarized by Apple
    MacOS,
    /// Signed with the eSigner cloud HSM
    Windows,
}

impl TargetPlatform {
    /// Guess the target from the file name. PE extensions mean Windows,
    /// anything else (including extensionless executables) means macOS.
    pub fn infer(path: &Path) -> Self {
        const WINDOWS_EXTENSIONS: &[&str] = &["exe", "dll", "msi", "sys"];

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext)
                if WINDOWS_EXTENSIONS
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(ext)) =>
            {
                Self::Windows
            }
            _ => Self::MacOS,
        }
    }
}

impl std::fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOS => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

impl std::str::FromStr for TargetPlatform {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "macos" | "darwin" | "apple" | "codesign" => Ok(Self::MacOS),
            "windows" | "win" | "esigner" | "authenticode" => Ok(Self::Windows),
            _ => Err(SigningError::Config(format!("Unknown target platform: {}", s))),
        }
    }
}
