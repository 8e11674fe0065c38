//! Template condition resolution.
//!
//! Conditions are folded in declaration order: each one is resolved against
//! the conditions before it and then becomes visible to the ones after it.
//! A reference to a condition declared later resolves to false.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::PseudoParameters;
use crate::error::EngineError;
use crate::resolver::{ResolutionContext, resolve};
use crate::types::{Node, Parameter, Value};

/// Build the effective parameter table.
///
/// Pseudo-parameters, then declared parameters, with caller overrides taking
/// precedence. An override is consumed by the declared parameter it names;
/// overrides naming no declared parameter are applied as-is afterwards, which
/// is how pseudo-parameters are overridden.
pub fn build_params<'a>(
    pseudo: &PseudoParameters,
    parameters: impl IntoIterator<Item = &'a Parameter>,
    mut overrides: BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut params = pseudo.to_params();

    for parameter in parameters {
        let provided = overrides.remove(&parameter.name);
        match parameter.ref_value(provided.as_ref()) {
            Some(value) => {
                params.insert(parameter.name.clone(), value);
            }
            None => {
                debug!(
                    event = "Parameters",
                    phase = "Build",
                    parameter = %parameter.name,
                    "parameter has no value and no default"
                );
            }
        }
    }

    params.extend(overrides);
    params
}

/// Resolve every condition in declaration order, folding each result into
/// `ctx.conditions`.
///
/// Fails if a condition does not resolve to a boolean.
pub fn resolve_conditions(
    conditions: &IndexMap<String, Node>,
    ctx: &mut ResolutionContext,
) -> Result<IndexMap<String, bool>, EngineError> {
    let mut resolved = IndexMap::with_capacity(conditions.len());
    for (name, node) in conditions {
        let value = strict_bool(name, &resolve(node, ctx)?)?;
        debug!(event = "Conditions", phase = "Resolved", condition = %name, value = value);
        ctx.conditions.insert(name.clone(), value);
        resolved.insert(name.clone(), value);
    }
    Ok(resolved)
}

/// Resolve each entry whose `Condition` (if any) is true and drop the rest.
///
/// Used for both `Resources` and `Outputs`.
pub fn resolve_conditional_entries(
    entries: &IndexMap<String, Node>,
    ctx: &ResolutionContext,
) -> Result<IndexMap<String, Value>, EngineError> {
    let mut resolved = IndexMap::with_capacity(entries.len());
    for (logical_id, node) in entries {
        if let Some(condition) = node.get("Condition").and_then(Node::as_str) {
            if !ctx.condition(condition) {
                debug!(
                    event = "Resources",
                    phase = "Dropped",
                    logical_id = %logical_id,
                    condition = %condition
                );
                continue;
            }
        }
        resolved.insert(logical_id.clone(), resolve(node, ctx)?);
    }
    Ok(resolved)
}

fn strict_bool(name: &str, value: &Value) -> Result<bool, EngineError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EngineError::InvalidBooleanCoercion {
            condition: name.to_string(),
            value: other.to_text(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodes(value: serde_json::Value) -> IndexMap<String, Node> {
        match Node::from(value) {
            Node::Map(map) => map,
            other => panic!("expected a mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_override_wins_and_is_consumed() {
        let parameters = [
            Parameter::new("Env", "String").with_default("dev"),
            Parameter::new("Other", "String"),
        ];
        let overrides = BTreeMap::from([
            ("Env".to_string(), Value::from("prod")),
            ("AWS::Region".to_string(), Value::from("us-east-1")),
        ]);

        let params = build_params(&PseudoParameters::default(), &parameters, overrides);

        assert_eq!(params["Env"], Value::from("prod"));
        assert_eq!(params["AWS::Region"], Value::from("us-east-1"));
        assert!(!params.contains_key("Other"));
    }

    #[test]
    fn test_conditions_fold_in_declaration_order() {
        let conditions = nodes(json!({
            "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
            "IsNotProd": {"Fn::Not": [{"Condition": "IsProd"}]},
            "UsesLater": {"Condition": "DeclaredLater"},
            "DeclaredLater": {"Fn::Equals": ["a", "a"]}
        }));
        let mut ctx = ResolutionContext::new().with_param("Env", "prod");

        let resolved = resolve_conditions(&conditions, &mut ctx).unwrap();

        assert_eq!(
            resolved.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
            vec![
                ("IsProd", true),
                ("IsNotProd", false),
                ("UsesLater", false),
                ("DeclaredLater", true),
            ]
        );
        assert!(ctx.condition("DeclaredLater"));
    }

    #[test]
    fn test_non_boolean_condition_fails() {
        let conditions = nodes(json!({"Broken": {"Ref": "Env"}}));
        let mut ctx = ResolutionContext::new().with_param("Env", "true");

        let err = resolve_conditions(&conditions, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidBooleanCoercion {
                condition: "Broken".to_string(),
                value: "true".to_string(),
            }
        );
    }

    #[test]
    fn test_resources_filtered_by_condition() {
        let resources = nodes(json!({
            "Always": {"Type": "AWS::S3::Bucket"},
            "ProdOnly": {
                "Type": "AWS::S3::Bucket",
                "Condition": "C",
                "Properties": {"BucketName": {"Fn::Sub": "${Env}-bucket"}}
            }
        }));

        let off = ResolutionContext::new().with_param("Env", "prod").with_condition("C", false);
        let resolved = resolve_conditional_entries(&resources, &off).unwrap();
        assert!(resolved.contains_key("Always"));
        assert!(!resolved.contains_key("ProdOnly"));

        let on = off.with_condition("C", true);
        let resolved = resolve_conditional_entries(&resources, &on).unwrap();
        assert_eq!(
            resolved["ProdOnly"],
            Value::from(json!({
                "Type": "AWS::S3::Bucket",
                "Condition": "C",
                "Properties": {"BucketName": "prod-bucket"}
            }))
        );
    }
}
