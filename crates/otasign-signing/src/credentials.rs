//! Credential provider backed by process environment variables

use std::collections::HashMap;
use std::env;

use tracing::debug;

use crate::error::{Result, SigningError};

/// codesign certificate identity
pub const MACOS_CERTIFICATE_NAME: &str = "MACOS_CERTIFICATE_NAME";
/// Apple ID used for notarization
pub const NOTARIZATION_APPLE_ID: &str = "PROD_MACOS_NOTARIZATION_APPLE_ID";
/// Apple developer team ID used for notarization
pub const NOTARIZATION_TEAM_ID: &str = "PROD_MACOS_NOTARIZATION_TEAM_ID";
/// App-specific password used for notarization
pub const NOTARIZATION_PASSWORD: &str = "PROD_MACOS_NOTARIZATION_PWD";
/// Direct path to the CodeSignTool executable
pub const CODE_SIGN_TOOL_EXE: &str = "CODE_SIGN_TOOL_EXE";
/// Directory containing `CodeSignTool.bat`
pub const CODE_SIGN_TOOL_PATH: &str = "CODE_SIGN_TOOL_PATH";
/// eSigner account username
pub const ESIGNER_USERNAME: &str = "ESIGNER_USERNAME";
/// eSigner account password
pub const ESIGNER_PASSWORD: &str = "ESIGNER_PASSWORD";
/// eSigner TOTP seed
pub const ESIGNER_TOTP_SECRET: &str = "ESIGNER_TOTP_SECRET";
/// eSigner credential ID, only needed when the account holds several
pub const ESIGNER_CREDENTIAL_ID: &str = "ESIGNER_CREDENTIAL_ID";

/// Every variable the credential provider reads, paired with whether its
/// value is a secret.
pub const ALL_VARIABLES: &[(&str, bool)] = &[
    (MACOS_CERTIFICATE_NAME, false),
    (NOTARIZATION_APPLE_ID, false),
    (NOTARIZATION_TEAM_ID, false),
    (NOTARIZATION_PASSWORD, true),
    (CODE_SIGN_TOOL_EXE, false),
    (CODE_SIGN_TOOL_PATH, false),
    (ESIGNER_USERNAME, false),
    (ESIGNER_PASSWORD, true),
    (ESIGNER_TOTP_SECRET, true),
    (ESIGNER_CREDENTIAL_ID, false),
];

/// Immutable credential bundle for one signing session.
///
/// Unset and empty variables are both treated as absent. Reading never
/// fails; enforcing presence is up to the code path that needs a value.
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<&'static str, String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values: HashMap<_, _> = ALL_VARIABLES
            .iter()
            .filter_map(|(name, _)| {
                lookup(name)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (*name, value))
            })
            .collect();

        debug!(count = values.len(), "credential variables present");
        Self { values }
    }

    /// Build credentials from literal name/value pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::from_lookup(|name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    /// Get a credential value by variable name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a credential variable is present
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn certificate_name(&self) -> Option<&str> {
        self.get(MACOS_CERTIFICATE_NAME)
    }

    pub fn esigner_credential_id(&self) -> Option<&str> {
        self.get(ESIGNER_CREDENTIAL_ID)
    }

    /// Fetch several credentials at once.
    ///
    /// Fails with `MissingCredentials` naming every absent variable, so the
    /// operator sees the full list in one run.
    pub fn require<const N: usize>(&self, names: [&'static str; N]) -> Result<[&str; N]> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.is_set(name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(SigningError::MissingCredentials(missing));
        }

        Ok(names.map(|name| self.get(name).unwrap_or_default()))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, secret) in ALL_VARIABLES {
            if let Some(value) = self.get(name) {
                if *secret {
                    map.entry(name, &"<redacted>");
                } else {
                    map.entry(name, &value);
                }
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_absent() {
        let creds = Credentials::from_pairs(&[
            (MACOS_CERTIFICATE_NAME, ""),
            (ESIGNER_USERNAME, "   "),
            (ESIGNER_PASSWORD, "hunter2"),
        ]);

        assert!(creds.certificate_name().is_none());
        assert!(!creds.is_set(ESIGNER_USERNAME));
        assert_eq!(creds.get(ESIGNER_PASSWORD), Some("hunter2"));
    }

    #[test]
    fn test_unknown_variables_are_ignored() {
        let creds = Credentials::from_pairs(&[("HOME", "/root")]);
        assert!(creds.get("HOME").is_none());
    }

    #[test]
    fn test_require_returns_values_in_order() {
        let creds = Credentials::from_pairs(&[
            (NOTARIZATION_APPLE_ID, "dev@example.com"),
            (NOTARIZATION_TEAM_ID, "TEAM123"),
            (NOTARIZATION_PASSWORD, "app-pass"),
        ]);

        let [apple_id, team_id, password] = creds
            .require([NOTARIZATION_APPLE_ID, NOTARIZATION_TEAM_ID, NOTARIZATION_PASSWORD])
            .unwrap();
        assert_eq!(apple_id, "dev@example.com");
        assert_eq!(team_id, "TEAM123");
        assert_eq!(password, "app-pass");
    }

    #[test]
    fn test_require_names_all_missing() {
        let creds = Credentials::from_pairs(&[(ESIGNER_PASSWORD, "pw")]);

        let err = creds
            .require([ESIGNER_USERNAME, ESIGNER_PASSWORD, ESIGNER_TOTP_SECRET])
            .unwrap_err();
        match err {
            SigningError::MissingCredentials(missing) => {
                assert_eq!(missing, vec![ESIGNER_USERNAME, ESIGNER_TOTP_SECRET]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::from_pairs(&[
            (ESIGNER_USERNAME, "builder"),
            (ESIGNER_PASSWORD, "hunter2"),
            (ESIGNER_TOTP_SECRET, "JBSWY3DPEHPK3PXP"),
        ]);

        let debug = format!("{:?}", creds);
        assert!(debug.contains("builder"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));
    }
}
