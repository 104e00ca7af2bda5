//! Configuration validation

use tracing::debug;

use crate::error::{Result, SigningError};

use super::types::SigningConfig;

/// Validate configuration
pub fn validate_config(config: &SigningConfig) -> Result<()> {
    debug!("validating configuration");
    validate_product(config)?;
    validate_notarization(config)?;
    validate_entitlements(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: &str) -> SigningError {
    SigningError::Config(format!("{} - {}", field, message))
}

fn validate_product(config: &SigningConfig) -> Result<()> {
    if config.product.is_empty() {
        return Err(invalid("product", "product cannot be empty"));
    }

    if config
        .product
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    {
        return Err(invalid(
            "product",
            "must not contain whitespace or path separators",
        ));
    }

    Ok(())
}

fn validate_notarization(config: &SigningConfig) -> Result<()> {
    if config.notarization.profile.trim().is_empty() {
        return Err(invalid("notarization.profile", "profile cannot be empty"));
    }
    Ok(())
}

fn validate_entitlements(config: &SigningConfig) -> Result<()> {
    if config
        .entitlements
        .candidates
        .iter()
        .any(|c| c.trim().is_empty())
    {
        return Err(invalid("entitlements.candidates", "entries cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SigningConfig::default()).is_ok());
    }

    #[test]
    fn test_product_rules() {
        let mut config = SigningConfig::default();
        config.product = String::new();
        assert!(validate_config(&config).is_err());

        config.product = "browser os".to_string();
        assert!(validate_config(&config).is_err());

        config.product = "browseros/nightly".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("product"));

        config.product = "browseros-nightly".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_profile_rejected() {
        let mut config = SigningConfig::default();
        config.notarization.profile = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_candidate_rejected() {
        let mut config = SigningConfig::default();
        config.entitlements.candidates.push(String::new());
        assert!(validate_config(&config).is_err());
    }
}
