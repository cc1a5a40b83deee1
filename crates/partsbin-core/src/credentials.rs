//! Credential and configuration maps handed to `configure()`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decrypted supplier credentials, keyed by schema field name.
///
/// `Debug` never prints values.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), value.to_owned());
    }

    /// Returns the trimmed value for `key`, treating blank values as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrowed view as a JSON-like map for schema validation.
    #[must_use]
    pub fn to_values(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl FromIterator<(String, String)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[redacted]")))
            .finish()
    }
}

/// Non-secret supplier configuration, keyed by schema field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierConfig(BTreeMap<String, Value>);

impl SupplierConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// String value for `key`, or `default` when absent or blank.
    #[must_use]
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
            _ => default,
        }
    }

    /// Boolean value for `key`; accepts JSON booleans and the usual truthy strings.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => crate::fields::parse_bool_literal(s).unwrap_or(default),
            Some(Value::Number(n)) => n.as_i64().map_or(default, |n| n != 0),
            _ => default,
        }
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

impl From<BTreeMap<String, Value>> for SupplierConfig {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credential_values() {
        let creds = Credentials::new().with("api_key", "super-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("api_key"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn blank_credentials_read_as_absent() {
        let creds = Credentials::new().with("api_key", "   ");
        assert!(creds.get("api_key").is_none());
    }

    #[test]
    fn config_bool_accepts_string_literals() {
        let config = SupplierConfig::new()
            .with("sandbox", "yes")
            .with("debug", false);
        assert!(config.bool_or("sandbox", false));
        assert!(!config.bool_or("debug", true));
        assert!(config.bool_or("missing", true));
    }

    #[test]
    fn config_str_falls_back_on_blank() {
        let config = SupplierConfig::new().with("currency", " ");
        assert_eq!(config.str_or("currency", "USD"), "USD");
    }
}
