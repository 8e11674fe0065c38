//! Request context values that compiled policy conditions evaluate against.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Value;

/// Typed wrapper for request context keys such as `aws:SourceIp`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RequestContext(BTreeMap<String, Value>);

impl RequestContext {
    /// Create an empty request context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one context key and return the updated context.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert one context key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true when there are no context keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of context keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over context keys.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for RequestContext {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self(value)
    }
}

impl From<serde_json::Value> for RequestContext {
    /// Objects become context maps; anything else yields an empty context.
    fn from(value: serde_json::Value) -> Self {
        match Value::from(value) {
            Value::Map(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl<'a> IntoIterator for &'a RequestContext {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
