//! otasign-signing - Code signing for OTA release binaries
//!
//! This crate signs build outputs before they are published:
//! - macOS: codesign with a Developer ID, hardened runtime, notarytool notarization
//! - Windows: SSL.com eSigner CodeSignTool, Authenticode verification
//!
//! Each binary flows through [`SigningPipeline`], which returns value-level
//! [`Outcome`]s so a batch keeps going past individual failures.

pub mod config;
pub mod credentials;
pub mod entitlements;
pub mod error;
pub mod notarize;
pub mod outcome;
pub mod pipeline;
pub mod platform;
pub mod provider;
pub mod providers;
pub mod runner;

#[cfg(test)]
mod testutil;

pub use config::{load_config, load_config_or_default, SigningConfig};
pub use credentials::Credentials;
pub use entitlements::{get_entitlements_path, EntitlementResolver};
pub use error::{FailureKind, Result, SigningError};
pub use notarize::{NotarizationVerdict, Notarizer};
pub use outcome::{Outcome, OutcomeStatus, Verification};
pub use pipeline::{BatchReport, BinaryReport, PipelineOptions, SigningPipeline, Stage};
pub use platform::{HostPlatform, TargetPlatform};
pub use provider::{PlatformSigner, SignReport, SigningRequest};
pub use providers::{MacOSSigner, WindowsSigner};
pub use runner::{SystemRunner, ToolCommand, ToolOutput, ToolRunner};
