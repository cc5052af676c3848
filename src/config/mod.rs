//! Configuration management module
//!
//! Two layers: [`AdapterConfig`], the per-adapter key/value map merged from
//! defaults and call-site overrides, and [`ConfigResolver`], the process-wide
//! environment-plus-settings-file cache behind the backend secret table.

pub mod resolver;

pub use resolver::{
    global, install, reset, secret_key_for, ConfigResolver, SETTINGS_FILE,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Secret masking
// ============================================================================

/// Substrings that mark a configuration key as secret-bearing.
const SECRET_MARKERS: [&str; 3] = ["key", "token", "secret"];

/// Whether a configuration key looks like it holds a secret.
pub fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Mask a secret for display: first and last four characters with the middle
/// elided, or `***` when the value is too short to split safely.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

// ============================================================================
// Adapter configuration map
// ============================================================================

/// Configuration for one adapter instance.
///
/// An ordered key/value map. Adapters seed it with their defaults and the
/// router merges call-site overrides on top at construction; later merges via
/// `update_config` follow the same rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterConfig(BTreeMap<String, Value>);

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of a value; non-string JSON values are not coerced.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Merge `overrides` into this map; overriding keys win.
    pub fn merge(&mut self, overrides: AdapterConfig) {
        self.0.extend(overrides.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy of the map with secret-like values masked for display.
    pub fn masked(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| {
                if is_secret_key(key) {
                    let rendered = match value {
                        Value::String(secret) => mask_secret(secret),
                        other => mask_secret(&other.to_string()),
                    };
                    (key.clone(), Value::String(rendered))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}
