use dashmap::DashMap;
use serde_json::Value;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Separator between configuration sections, e.g. `database:url`
pub const SECTION_SEPARATOR: &str = ":";

/// Key/value configuration shared with every module through the context.
///
/// Cloning is cheap; clones share the same underlying store.
///
/// # Example
/// ```
/// use modhost::config::Configuration;
///
/// let config = Configuration::from_json(r#"{ "database": { "pool": 8 } }"#).unwrap();
/// assert_eq!(config.get_parsed::<u32>("database:pool"), Some(8));
/// ```
#[derive(Clone, Default)]
pub struct Configuration {
    values: Arc<DashMap<String, String>>,
}

impl Configuration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every process environment variable.
    ///
    /// A double underscore in a variable name maps to the section separator,
    /// so `DATABASE__URL` is readable as `DATABASE:URL`.
    pub fn from_env() -> Self {
        let config = Self::new();
        for (key, value) in env::vars() {
            config.set(&key.replace("__", SECTION_SEPARATOR), &value);
        }
        config
    }

    /// Load environment variables starting with `prefix`, with the prefix stripped
    pub fn from_env_prefixed(prefix: &str) -> Self {
        let config = Self::new();
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(prefix) {
                if !stripped.is_empty() {
                    config.set(&stripped.replace("__", SECTION_SEPARATOR), &value);
                }
            }
        }
        config
    }

    /// Load a JSON document; nested objects are flattened into `a:b:c` keys
    /// and array elements are indexed (`servers:0`).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let document: Value = serde_json::from_str(json)?;
        let config = Self::new();
        config.flatten_into(None, &document);
        Ok(config)
    }

    fn flatten_into(&self, prefix: Option<&str>, value: &Value) {
        let join = |segment: &str| match prefix {
            Some(prefix) => format!("{}{}{}", prefix, SECTION_SEPARATOR, segment),
            None => segment.to_string(),
        };

        match value {
            Value::Object(map) => {
                for (key, nested) in map {
                    self.flatten_into(Some(&join(key)), nested);
                }
            }
            Value::Array(items) => {
                for (index, nested) in items.iter().enumerate() {
                    self.flatten_into(Some(&join(&index.to_string())), nested);
                }
            }
            Value::Null => {}
            Value::String(s) => {
                if let Some(key) = prefix {
                    self.set(key, s);
                }
            }
            other => {
                if let Some(key) = prefix {
                    self.set(key, &other.to_string());
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a value; `None` if missing or unparsable
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy every value from `other`, overwriting existing keys
    pub fn merge(&self, other: &Configuration) {
        for entry in other.values.iter() {
            self.set(entry.key(), entry.value());
        }
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("keys", &self.keys())
            .finish()
    }
}
