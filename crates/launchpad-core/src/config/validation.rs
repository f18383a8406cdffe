//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::DeliverConfig;

/// Validate configuration
pub fn validate_config(config: &DeliverConfig) -> Result<()> {
    debug!("validating configuration");
    validate_artifact(config)?;
    validate_version(config)?;
    config.platform()?;
    validate_price_tier(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_artifact(config: &DeliverConfig) -> Result<()> {
    if config.ipa.is_some() && config.pkg.is_some() {
        return Err(ConfigError::InvalidValue {
            field: "ipa/pkg".to_string(),
            message: "only one of ipa and pkg may be set".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_version(config: &DeliverConfig) -> Result<()> {
    let Some(version) = &config.app_version else {
        return Ok(());
    };

    let valid = !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if !valid {
        return Err(ConfigError::InvalidValue {
            field: "app_version".to_string(),
            message: format!("'{}' must be dot-separated numbers, e.g. 1.2.0", version),
        }
        .into());
    }
    Ok(())
}

fn validate_price_tier(config: &DeliverConfig) -> Result<()> {
    if config.price_tier.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: "price_tier".to_string(),
            message: "price tier cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(validate_config(&DeliverConfig::default()).is_ok());
    }

    #[test]
    fn test_ipa_and_pkg_conflict() {
        let config = DeliverConfig {
            ipa: Some("a.ipa".into()),
            pkg: Some("a.pkg".into()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_version_format() {
        for good in ["1", "2.0", "1.2.3", "10.0.1.4"] {
            let config = DeliverConfig {
                app_version: Some(good.to_string()),
                ..Default::default()
            };
            assert!(validate_config(&config).is_ok(), "{good} should be accepted");
        }
        for bad in ["", "1.", "v1.0", "1.0-beta", "1..2"] {
            let config = DeliverConfig {
                app_version: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(validate_config(&config).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_unknown_platform() {
        let config = DeliverConfig {
            platform: Some("watchos".to_string()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_price_tier() {
        let config = DeliverConfig {
            price_tier: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
