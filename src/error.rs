use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    #[error("condition operand for {operator} on key '{key}' is not resolved")]
    MalformedConditionOperand { operator: String, key: String },

    #[error("condition '{condition}' did not resolve to a boolean: {value}")]
    InvalidBooleanCoercion { condition: String, value: String },

    #[error("unknown condition operator: {0}")]
    UnknownConditionOperator(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("failed to parse template: {0}")]
    Json(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Json(err.to_string())
    }
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        EngineError::InvalidPattern(err.to_string())
    }
}
