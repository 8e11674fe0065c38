use crate::error::EngineError;
use crate::template::Template;
use crate::types::Node;

/// Load a JSON template into a [`Template`].
///
/// Single-key objects naming an intrinsic function become function nodes;
/// section order (and so condition declaration order) is preserved.
/// JSON syntax errors are mapped into `EngineError::Json`.
///
/// Example:
/// ```rust
/// use cfscan_core::load_template;
/// let text = r#"{
///     "Parameters": {"Env": {"Type": "String", "Default": "dev"}},
///     "Resources": {"Topic": {"Type": "AWS::SNS::Topic"}}
/// }"#;
/// let template = load_template(text).unwrap();
/// assert_eq!(template.resources.len(), 1);
/// ```
pub fn load_template(text: &str) -> Result<Template, EngineError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    Template::from_node(&Node::from(raw))
}
