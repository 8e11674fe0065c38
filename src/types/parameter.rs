//! Declared template parameters.

use serde::Serialize;

use crate::error::EngineError;

use super::{Node, Value};

/// Resolved value of a no-echo parameter when the caller supplied a value.
pub const NOECHO_WITH_VALUE: &str = "NOECHO_WITH_VALUE";
/// Resolved value of a no-echo parameter falling back to its declared default.
pub const NOECHO_WITH_DEFAULT: &str = "NOECHO_WITH_DEFAULT";
/// Resolved value of a no-echo parameter with neither a value nor a default.
pub const NOECHO_NO_DEFAULT: &str = "NOECHO_NO_DEFAULT";

/// A parameter declared in the template's `Parameters` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: String,
    pub default: Option<Value>,
    pub no_echo: bool,
    pub allowed_values: Vec<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            default: None,
            no_echo: false,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_no_echo(mut self, no_echo: bool) -> Self {
        self.no_echo = no_echo;
        self
    }

    /// Build a parameter from its declaration body, e.g.
    /// `{"Type": "String", "Default": "a", "NoEcho": true}`.
    pub fn from_node(name: &str, node: &Node) -> Result<Self, EngineError> {
        let Some(body) = node.as_map() else {
            return Err(EngineError::InvalidFormat(format!(
                "parameter '{name}' must be a mapping"
            )));
        };

        let param_type = body
            .get("Type")
            .and_then(Node::as_str)
            .ok_or_else(|| EngineError::InvalidFormat(format!("parameter '{name}' has no Type")))?;

        let default = match body.get("Default") {
            Some(node) => Some(node.as_value().ok_or_else(|| {
                EngineError::InvalidFormat(format!(
                    "default of parameter '{name}' must be a literal"
                ))
            })?),
            None => None,
        };

        let no_echo = body
            .get("NoEcho")
            .and_then(Node::as_value)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let allowed_values = body
            .get("AllowedValues")
            .and_then(Node::as_value)
            .map(|v| v.elements().into_iter().cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            default,
            no_echo,
            allowed_values,
        })
    }

    /// True for parameter types whose values are comma separated lists.
    pub fn is_list(&self) -> bool {
        self.param_type == "CommaDelimitedList" || self.param_type.starts_with("List<")
    }

    /// The value a `Ref` to this parameter resolves to.
    ///
    /// No-echo parameters never expose their content, only whether a value
    /// or default exists. Returns `None` when there is nothing to resolve to.
    pub fn ref_value(&self, provided: Option<&Value>) -> Option<Value> {
        if self.no_echo {
            let present = |v: &Value| !v.to_text().is_empty();
            let sentinel = if provided.is_some_and(present) {
                NOECHO_WITH_VALUE
            } else if self.default.as_ref().is_some_and(present) {
                NOECHO_WITH_DEFAULT
            } else {
                NOECHO_NO_DEFAULT
            };
            return Some(Value::from(sentinel));
        }

        let value = provided.or(self.default.as_ref())?;
        if self.is_list() {
            return Some(match value {
                Value::List(items) => {
                    Value::List(items.iter().map(|v| Value::String(v.to_text())).collect())
                }
                other => Value::List(
                    other
                        .to_text()
                        .split(',')
                        .map(|s| Value::from(s.trim()))
                        .collect(),
                ),
            });
        }
        Some(Value::String(value.to_text()))
    }
}
