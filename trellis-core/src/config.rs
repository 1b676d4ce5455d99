// Application configuration consumed by the router

use crate::injector::{Dependencies, Injectable};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root application configuration.
///
/// Field names serialize in camelCase so that partial overrides and dotted
/// keys (`tls.enabled`, `cors.allowedOrigins`) read the same in every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub encryption: EncryptionConfig,
    pub host: String,
    pub is_production: bool,
    pub logger: LoggerConfig,
    pub port: u16,
    pub tls: TlsConfig,
    pub cors: CorsConfig,
    pub cache: CacheConfig,
    pub cookies: CookieConfig,
    pub content_security_policy: ContentSecurityPolicyConfig,
    pub static_files: StaticFilesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            encryption: EncryptionConfig::default(),
            host: "localhost".to_string(),
            is_production: false,
            logger: LoggerConfig::default(),
            port: 5050,
            tls: TlsConfig::default(),
            cors: CorsConfig::default(),
            cache: CacheConfig::default(),
            cookies: CookieConfig::default(),
            content_security_policy: ContentSecurityPolicyConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Injectable for AppConfig {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(Self::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub key: String,
}

impl Default for EncryptionConfig {
    /// A random key; production deployments are expected to set one.
    fn default() -> Self {
        Self {
            key: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub key: String,
    pub cert: String,
}

/// Cross-origin resource sharing allow-lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsConfig {
    pub allow_credentials: bool,
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    /// `["*"]` allows every origin.
    pub allowed_origins: Vec<String>,
    pub exposed_headers: Vec<String>,
    /// Preflight cache lifetime in seconds
    pub max_age: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of cached static files, in days
    pub max_age: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieConfig {
    /// Cookie lifetime, in days
    pub max_age: u64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { max_age: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentSecurityPolicyConfig {
    pub allowed_origins: Vec<String>,
    pub allow_inline_scripts: bool,
    pub allow_inline_styles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory static files are served from
    pub root: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
        }
    }
}

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Largest lifetime, in days, accepted for cached files and cookies
pub const MAX_AGE_DAYS_LIMIT: u64 = 365 * 100;

impl CacheConfig {
    /// Saturates instead of overflowing on out-of-range values.
    pub fn max_age_seconds(&self) -> u64 {
        self.max_age.saturating_mul(SECONDS_PER_DAY)
    }
}

impl CookieConfig {
    pub fn max_age_seconds(&self) -> u64 {
        self.max_age.saturating_mul(SECONDS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5050);
        assert!(!config.is_production);
        assert!(config.logger.enabled);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_age_seconds(), 30 * 86_400);
        assert_eq!(config.static_files.root, PathBuf::from("public"));
        assert!(config.encryption.key.len() >= 16);
    }

    #[test]
    fn test_max_age_saturates() {
        let mut config = AppConfig::default();
        config.cookies.max_age = u64::MAX / 2;
        config.cache.max_age = u64::MAX;
        assert_eq!(config.cookies.max_age_seconds(), u64::MAX);
        assert_eq!(config.cache.max_age_seconds(), u64::MAX);
    }

    #[test]
    fn test_partial_json_uses_camel_case() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "isProduction": true,
            "cors": { "allowedOrigins": ["*"], "maxAge": 600 },
            "contentSecurityPolicy": { "allowInlineStyles": true }
        }))
        .unwrap();

        assert!(config.is_production);
        assert_eq!(config.cors.allowed_origins, vec!["*"]);
        assert_eq!(config.cors.max_age, 600);
        assert!(config.content_security_policy.allow_inline_styles);
        assert_eq!(config.port, 5050);
    }
}
