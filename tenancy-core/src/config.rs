//! # Configuration
//!
//! A minimal string key/value store, mirroring `app.set()` / `app.get()`.
//! Components read typed views out of a [`ConfigSnapshot`]:
//!
//! ```rust
//! use tenancy_core::Config;
//!
//! let mut config = Config::new();
//! config.set("auth.tenant_claim", "org_id");
//! config.set("isolation.stamp_policy", "reject_mismatch");
//!
//! let snap = config.snapshot();
//! assert_eq!(snap.get("auth.tenant_claim"), Some("org_id"));
//! ```
//!
//! ## Environment overrides
//!
//! [`Config::load_env`] maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export TENANCY__AUTH__TENANT_CLAIM=org_id   # auth.tenant_claim
//! export TENANCY__HTTP__PORT=8080             # http.port
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Apply every `PREFIX__A__B=value` variable as `a.b = value`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}__", prefix.trim_end_matches('_'));
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(&prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                tracing::debug!(key = %normalized, "config override from environment");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            map: self.values.clone(),
        }
    }
}

/// Immutable copy of the configuration handed to hooks and components.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// Comma separated list, blanks dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
