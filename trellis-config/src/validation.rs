// Configuration validation

use crate::{ConfigError, Result};
use trellis_core::AppConfig;
use trellis_core::config::MAX_AGE_DAYS_LIMIT;

/// Minimum length of `encryption.key`
pub const MIN_ENCRYPTION_KEY_LENGTH: usize = 16;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a string has at least `min` characters
    pub fn min_length(value: &str, min: usize, field: &str) -> Result<()> {
        if value.chars().count() < min {
            return Err(ConfigError::ValidationError(format!(
                "{} length must be greater than or equal to {}",
                field, min
            )));
        }
        Ok(())
    }

    /// Validate that a number is within range
    pub fn in_range<T: PartialOrd + std::fmt::Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}",
                field, min, max
            )));
        }
        Ok(())
    }

    /// Validate port number
    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a valid port number",
                field
            )));
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::min_length(&self.encryption.key, MIN_ENCRYPTION_KEY_LENGTH, "Encryption key")?;
        ConfigValidator::not_empty(&self.host, "host")?;
        ConfigValidator::is_port(self.port, "port")?;
        ConfigValidator::in_range(self.cache.max_age, 0, MAX_AGE_DAYS_LIMIT, "cache.maxAge")?;
        ConfigValidator::in_range(self.cookies.max_age, 0, MAX_AGE_DAYS_LIMIT, "cookies.maxAge")?;

        if self.tls.enabled {
            ConfigValidator::not_empty(&self.tls.key, "tls.key")?;
            ConfigValidator::not_empty(&self.tls.cert, "tls.cert")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());
        assert!(ConfigValidator::in_range(11, 1, 10, "field").is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(ConfigValidator::is_port(8080, "field").is_ok());
        assert!(ConfigValidator::is_port(0, "field").is_err());
    }

    #[test]
    fn test_default_app_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_short_encryption_key() {
        let mut config = AppConfig::default();
        config.encryption.key = "too-short".to_string();

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Encryption key length must be greater than or equal to 16"
        );
    }

    #[test]
    fn test_max_age_out_of_range() {
        let mut config = AppConfig::default();
        config.cookies.max_age = u64::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookies.maxAge must be between 0 and 36500"));

        config.cookies.max_age = 365;
        config.cache.max_age = MAX_AGE_DAYS_LIMIT + 1;
        assert!(config.validate().is_err());

        config.cache.max_age = MAX_AGE_DAYS_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_requires_key_and_cert() {
        let mut config = AppConfig::default();
        config.tls.enabled = true;
        assert!(config.validate().is_err());

        config.tls.key = "key.pem".to_string();
        config.tls.cert = "cert.pem".to_string();
        assert!(config.validate().is_ok());
    }
}
