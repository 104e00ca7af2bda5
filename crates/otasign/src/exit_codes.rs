//! Exit codes for the CLI

#![allow(dead_code)]

/// Success
pub const SUCCESS: i32 = 0;

/// At least one binary failed to sign, notarize or verify
pub const SIGNING_FAILED: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;
