//! The pre-resolution template tree.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Number;

use super::function::FunctionKind;
use super::value::Value;

/// A template value that may still contain intrinsic function calls.
///
/// Mappings keep declaration order, which matters for `Conditions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
    Function(Box<FunctionNode>),
}

/// A single intrinsic function call and its one argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub kind: FunctionKind,
    pub arg: Node,
}

impl Serialize for FunctionNode {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = ser.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.as_ref(), &self.arg)?;
        map.end()
    }
}

impl Node {
    pub fn function(kind: FunctionKind, arg: impl Into<Node>) -> Self {
        Node::Function(Box::new(FunctionNode {
            kind,
            arg: arg.into(),
        }))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Node::Function(_))
    }

    /// True if any function call remains anywhere in the tree.
    pub fn contains_function(&self) -> bool {
        match self {
            Node::Function(_) => true,
            Node::List(items) => items.iter().any(Node::contains_function),
            Node::Map(map) => map.values().any(Node::contains_function),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// The list elements, or the node itself as a singleton.
    pub fn elements(&self) -> Vec<&Node> {
        match self {
            Node::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Convert to a concrete value. Returns `None` if a function call remains.
    pub fn as_value(&self) -> Option<Value> {
        Some(match self {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Date(d) => Value::Date(*d),
            Node::List(items) => Value::List(
                items
                    .iter()
                    .map(Node::as_value)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Node::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| v.as_value().map(|v| (k.clone(), v)))
                    .collect::<Option<_>>()?,
            ),
            Node::Function(_) => return None,
        })
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(b),
            serde_json::Value::Number(n) => Node::Number(n),
            serde_json::Value::String(s) => Node::String(s),
            serde_json::Value::Array(items) => {
                Node::List(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, arg)) = map.iter().next() {
                        if let Ok(kind) = FunctionKind::from_str(key) {
                            return Node::function(kind, Node::from(arg.clone()));
                        }
                    }
                }
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Date(d) => Node::Date(d),
            Value::List(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Map(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}
