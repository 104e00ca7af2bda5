//! Platform signer implementations

pub mod macos;
pub mod windows;

pub use macos::MacOSSigner;
pub use windows::WindowsSigner;
