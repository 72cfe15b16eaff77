//! Free-form named attributes attached to a principal
//!
//! Reads never mutate: [`Properties::get_or`] hands back the default without
//! storing it. Use [`Properties::set_default`] when the default should stick.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Mapping-based property bag
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, Value>,
}

impl Properties {
    /// Empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stored value for `key`, or `default` when absent
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// Store `default` under `key` unless a value is already present, returning the stored value
    pub fn set_default(&mut self, key: impl Into<String>, default: Value) -> &Value {
        self.values.entry(key.into()).or_insert(default)
    }

    /// Store `value` under `key`, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Remove `key`
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_or_does_not_store_default() {
        let props = Properties::new();

        assert_eq!(props.get("api_key"), None);
        assert_eq!(props.get_or("api_key", json!("ABC")), json!("ABC"));
        assert!(!props.contains("api_key"));
    }

    #[test]
    fn test_set_default_stores_once() {
        let mut props = Properties::new();

        assert_eq!(props.set_default("api_key", json!("ABC")), &json!("ABC"));
        assert_eq!(props.set_default("api_key", json!("XYZ")), &json!("ABC"));
        assert_eq!(props.get("api_key"), Some(&json!("ABC")));
        assert_eq!(props.get_or("api_key", json!("other")), json!("ABC"));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut props: Properties = [("region", json!("eu"))].into_iter().collect();

        assert_eq!(props.insert("region", json!("us")), Some(json!("eu")));
        assert_eq!(props.remove("region"), Some(json!("us")));
        assert!(!props.contains("region"));
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let mut props = Properties::new();
        props.insert("team", json!("core"));
        assert_eq!(serde_json::to_value(&props).unwrap(), json!({"team": "core"}));
    }
}
