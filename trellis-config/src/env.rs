// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;

/// How the raw text of an application variable is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarKind {
    /// Kept verbatim
    Text,
    /// Parsed as JSON, falling back to the raw text
    Json,
}

/// Environment variables read into the application configuration:
/// `(variable, dotted config key, kind)`
const APP_VARIABLES: [(&str, &str, VarKind); 7] = [
    ("ENCRYPTION_KEY", "encryption.key", VarKind::Text),
    ("HOST", "host", VarKind::Text),
    ("PRODUCTION", "isProduction", VarKind::Json),
    ("PORT", "port", VarKind::Json),
    ("TLS", "tls.enabled", VarKind::Json),
    ("TLS_KEY", "tls.key", VarKind::Text),
    ("TLS_CERT", "tls.cert", VarKind::Text),
];

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all environment variables (filtered and stripped by prefix),
    /// with lowercased names
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut vars = HashMap::new();

        for (key, value) in env::vars() {
            match self.prefix {
                Some(ref prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        vars.insert(rest.trim_start_matches('_').to_lowercase(), value);
                    }
                }
                None => {
                    vars.insert(key.to_lowercase(), value);
                }
            }
        }

        Ok(vars)
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Read a variable as a JSON value; text that is not JSON is returned
    /// as a string. `None` when the variable is unset.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.load_var(key).ok().map(|raw| parse_value(&raw))
    }

    /// Partial application configuration built from the process
    /// environment (`HOST`, `PORT`, `PRODUCTION`, `TLS`, ...).
    pub fn app_overrides(&self) -> Value {
        app_overrides_from(|key| self.load_var(key).ok())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// JSON first, raw string otherwise
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Partial application configuration from an arbitrary variable source.
pub fn app_overrides_from(lookup: impl Fn(&str) -> Option<String>) -> Value {
    let mut overrides = Value::Object(Map::new());

    for (variable, key, kind) in APP_VARIABLES {
        let Some(raw) = lookup(variable) else {
            continue;
        };

        let value = match kind {
            VarKind::Text => Value::String(raw),
            VarKind::Json => parse_value(&raw),
        };
        tracing::trace!(variable, key, "Configuration read from environment");
        crate::merge::set_dotted(&mut overrides, key, value);
    }

    overrides
}
