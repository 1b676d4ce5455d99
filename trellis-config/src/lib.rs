// Configuration loading for the Trellis framework

pub mod env;
pub mod error;
pub mod loader;
pub mod merge;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use merge::{get_dotted, merge_deep, set_dotted};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_core::{AppConfig, Dependencies, Injectable, Injector};

/// Main configuration manager.
///
/// Holds the application configuration as a JSON tree seeded with the
/// [`AppConfig`] defaults. Environment variables, `.env` files, config files
/// and partial overrides are deep-merged into it; [`ConfigManager::app_config`]
/// turns the tree back into a validated [`AppConfig`].
#[derive(Clone)]
pub struct ConfigManager {
    state: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// A manager holding the defaults only
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(default_tree())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix (`MYAPP_PORT`, ...)
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        let manager = Self::new();
        manager.load_env();
        manager
    }

    /// Merge `HOST`, `PORT`, `PRODUCTION`, `TLS`, `TLS_KEY`, `TLS_CERT` and
    /// `ENCRYPTION_KEY` from the environment
    pub fn load_env(&self) {
        let overrides = EnvLoader::new(self.env_prefix.clone()).app_overrides();
        debug!(overrides = overrides.as_object().map_or(0, |o| o.len()), "Loaded environment configuration");
        merge_deep(&mut self.state.write(), overrides);
    }

    /// Load a `.env` file into the process environment, then merge the
    /// environment. Without a path a missing `.env` is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env();
        Ok(())
    }

    /// Merge a configuration file, detecting the format from its extension
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        self.load_file_as(path, loader.format())
    }

    /// Merge a configuration file of a known format
    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        if !data.is_object() {
            return Err(ConfigError::ParseError(format!(
                "{} must contain a table of settings",
                path.display()
            )));
        }

        merge_deep(&mut self.state.write(), data);
        info!(path = %path.display(), format = ?format, "Loaded configuration file");
        Ok(())
    }

    /// Deep-merge a partial configuration and validate the result.
    ///
    /// Nothing is kept when the merged configuration is invalid.
    pub fn setup(&self, partial: Value) -> Result<AppConfig> {
        let mut state = self.state.write();
        let mut merged = state.clone();
        merge_deep(&mut merged, partial);

        let config = to_app_config(&merged)?;
        *state = merged;
        Ok(config)
    }

    /// Set a value at a dotted key such as `cors.allowedOrigins`
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        set_dotted(&mut self.state.write(), key, value);
        Ok(())
    }

    /// Get the value at a dotted key
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let state = self.state.read();
        let value = get_dotted(&state, key).ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a dotted key exists
    pub fn has(&self, key: &str) -> bool {
        get_dotted(&self.state.read(), key).is_some()
    }

    /// Top-level configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Read one environment variable, parsed as JSON when possible.
    /// `None` when unset or not convertible to `T`.
    pub fn env<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = EnvLoader::new(self.env_prefix.clone()).value(key)?;
        serde_json::from_value(value).ok()
    }

    /// Deep-merge another manager's configuration into this one
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.state, &other.state) {
            return;
        }
        let other = other.state.read().clone();
        merge_deep(&mut self.state.write(), other);
    }

    /// The whole tree as a validated [`AppConfig`]
    pub fn app_config(&self) -> Result<AppConfig> {
        to_app_config(&self.state.read())
    }

    /// Deserialize the whole tree into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let value = self.state.read().clone();
        let validated: T =
            serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;
        Ok(validated)
    }

    /// Validate the configuration and register it on `injector`, where the
    /// router picks it up.
    pub fn install(&self, injector: &Injector) -> Result<Arc<AppConfig>> {
        let config = self.app_config()?;
        info!(
            host = %config.host,
            port = config.port,
            production = config.is_production,
            "Configuration installed"
        );
        Ok(injector.register(config))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Injectable for ConfigManager {
    fn construct(_: &mut Dependencies) -> std::result::Result<Self, trellis_core::Error> {
        Ok(Self::from_env())
    }
}

fn default_tree() -> Value {
    serde_json::to_value(AppConfig::default()).unwrap_or_default()
}

fn to_app_config(value: &Value) -> Result<AppConfig> {
    let config: AppConfig = serde_json::from_value(value.clone())
        .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
