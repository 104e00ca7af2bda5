//! Entitlement file lookup

use std::path::{Path, PathBuf};

use tracing::debug;

/// Default candidate locations, relative to the repository root, in
/// priority order.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "resources/entitlements/browseros-executable-entitlements.plist",
    "packages/browseros/resources/entitlements/browseros-executable-entitlements.plist",
];

/// Finds the entitlements plist to attach when signing executables
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    candidates: Vec<PathBuf>,
}

impl EntitlementResolver {
    /// Create a resolver over an ordered list of relative candidate paths
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// Return the first candidate under `root` that exists on disk
    pub fn resolve(&self, root: &Path) -> Option<PathBuf> {
        let found = self
            .candidates
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists());

        match &found {
            Some(path) => debug!(path = %path.display(), "resolved entitlements"),
            None => debug!(root = %root.display(), "no entitlements file found"),
        }
        found
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl Default for EntitlementResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES.iter().copied())
    }
}

/// Resolve entitlements under `root` using the default candidates
pub fn get_entitlements_path(root: &Path) -> Option<PathBuf> {
    EntitlementResolver::default().resolve(root)
}
