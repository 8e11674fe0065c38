//! Templates and their resolved form.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::conditions::{build_params, resolve_conditional_entries, resolve_conditions};
use crate::config::ResolverConfig;
use crate::error::EngineError;
use crate::resolver::{Mappings, ResolutionContext};
use crate::types::{Node, Parameter, PolicyDocument, Value};

/// Keys whose values are IAM policy documents, whatever the resource type.
const POLICY_DOCUMENT_KEYS: [&str; 3] = ["PolicyDocument", "AssumeRolePolicyDocument", "KeyPolicy"];

/// A template as handed over by the parsing layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub parameters: IndexMap<String, Parameter>,
    pub mappings: Mappings,
    /// In declaration order.
    pub conditions: IndexMap<String, Node>,
    pub resources: IndexMap<String, Node>,
    pub outputs: IndexMap<String, Node>,
}

impl Template {
    pub fn from_node(node: &Node) -> Result<Self, EngineError> {
        let Some(body) = node.as_map() else {
            return Err(EngineError::InvalidFormat(
                "template must be a mapping".to_string(),
            ));
        };

        let section = |name: &str| -> Result<IndexMap<String, Node>, EngineError> {
            match body.get(name) {
                None => Ok(IndexMap::new()),
                Some(Node::Map(map)) => Ok(map.clone()),
                Some(_) => Err(EngineError::InvalidFormat(format!(
                    "{name} section must be a mapping"
                ))),
            }
        };

        let parameters = section("Parameters")?
            .iter()
            .map(|(name, node)| Parameter::from_node(name, node).map(|p| (name.clone(), p)))
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(Self {
            parameters,
            mappings: parse_mappings(&section("Mappings")?)?,
            conditions: section("Conditions")?,
            resources: section("Resources")?,
            outputs: section("Outputs")?,
        })
    }

    /// Resolve the template: conditions become booleans, resources and
    /// outputs whose condition is false are dropped, everything else has its
    /// functions resolved.
    pub fn resolve(&self, config: &ResolverConfig) -> Result<ResolvedTemplate, EngineError> {
        let params = build_params(
            config.pseudo_parameters(),
            self.parameters.values(),
            config.overrides().clone(),
        );
        let mut ctx = ResolutionContext {
            params,
            mappings: self.mappings.clone(),
            conditions: Default::default(),
        };

        let conditions = resolve_conditions(&self.conditions, &mut ctx)?;
        let resources = resolve_conditional_entries(&self.resources, &ctx)?;
        let outputs = resolve_conditional_entries(&self.outputs, &ctx)?;

        debug!(
            event = "Template",
            phase = "Resolved",
            conditions = conditions.len(),
            resources = resources.len(),
            dropped = self.resources.len() - resources.len()
        );

        Ok(ResolvedTemplate {
            parameters: self.parameters.clone(),
            mappings: self.mappings.clone(),
            conditions,
            resources,
            outputs,
        })
    }
}

fn parse_mappings(section: &IndexMap<String, Node>) -> Result<Mappings, EngineError> {
    let mut mappings = Mappings::new();
    for (name, node) in section {
        let invalid =
            || EngineError::InvalidFormat(format!("mapping '{name}' must be two levels of keys"));
        let Some(Value::Map(top_level)) = node.as_value() else {
            return Err(invalid());
        };
        let entry = mappings.entry(name.clone()).or_default();
        for (top, second_level) in top_level {
            let Value::Map(second_level) = second_level else {
                return Err(invalid());
            };
            entry.insert(top, second_level);
        }
    }
    Ok(mappings)
}

/// A template with no remaining functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedTemplate {
    #[serde(skip)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(skip)]
    pub mappings: Mappings,
    pub conditions: IndexMap<String, bool>,
    pub resources: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Value>,
}

impl ResolvedTemplate {
    /// Every policy document found anywhere in the resolved resources,
    /// keyed by the logical id of the resource that holds it.
    ///
    /// Documents that cannot be read are logged and skipped.
    pub fn policy_documents(&self) -> Vec<(String, PolicyDocument)> {
        let mut out = Vec::new();
        for (logical_id, resource) in &self.resources {
            collect_policy_documents(logical_id, resource, &mut out);
        }
        out
    }
}

fn collect_policy_documents(
    logical_id: &str,
    value: &Value,
    out: &mut Vec<(String, PolicyDocument)>,
) {
    match value {
        Value::Map(map) => {
            for (key, child) in map {
                if POLICY_DOCUMENT_KEYS.contains(&key.as_str()) && child.as_map().is_some() {
                    match PolicyDocument::from_node(&Node::from(child.clone())) {
                        Ok(doc) => out.push((logical_id.to_string(), doc)),
                        Err(err) => warn!(
                            event = "Template",
                            phase = "PolicyDocuments",
                            logical_id = %logical_id,
                            error = %err,
                            "skipping unreadable policy document"
                        ),
                    }
                } else {
                    collect_policy_documents(logical_id, child, out);
                }
            }
        }
        Value::List(items) => items
            .iter()
            .for_each(|item| collect_policy_documents(logical_id, item, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(value: serde_json::Value) -> Template {
        Template::from_node(&Node::from(value)).unwrap()
    }

    #[test]
    fn test_from_node_sections() {
        let t = template(json!({
            "Parameters": {"Env": {"Type": "String", "Default": "dev"}},
            "Mappings": {"M": {"a": {"b": "c"}}},
            "Conditions": {"Z": {"Fn::Equals": [1, 1]}, "A": {"Fn::Equals": [1, 2]}},
            "Resources": {"R": {"Type": "AWS::SNS::Topic"}}
        }));
        assert_eq!(t.parameters["Env"].default, Some(Value::from("dev")));
        assert_eq!(t.mappings["M"]["a"]["b"], Value::from("c"));
        assert_eq!(t.conditions.keys().collect::<Vec<_>>(), vec!["Z", "A"]);
        assert_eq!(t.resources.len(), 1);
        assert!(t.outputs.is_empty());
    }

    #[test]
    fn test_from_node_rejects_bad_mappings() {
        let result = Template::from_node(&Node::from(json!({"Mappings": {"M": {"a": "flat"}}})));
        assert!(matches!(result, Err(EngineError::InvalidFormat(_))));
    }

    #[test]
    fn test_resolve_outputs_with_conditions() {
        let t = template(json!({
            "Conditions": {"Never": {"Fn::Equals": ["a", "b"]}},
            "Resources": {},
            "Outputs": {
                "Region": {"Value": {"Ref": "AWS::Region"}},
                "Hidden": {"Condition": "Never", "Value": "x"}
            }
        }));
        let resolved = t.resolve(&ResolverConfig::default()).unwrap();
        assert_eq!(resolved.outputs.len(), 1);
        assert_eq!(resolved.outputs["Region"], Value::from(json!({"Value": "eu-west-1"})));
    }

    #[test]
    fn test_policy_documents_are_collected() {
        let t = template(json!({
            "Resources": {
                "Role": {
                    "Type": "AWS::IAM::Role",
                    "Properties": {
                        "AssumeRolePolicyDocument": {
                            "Statement": [{"Effect": "Allow", "Principal": {"Service": "ec2.amazonaws.com"}, "Action": "sts:AssumeRole"}]
                        },
                        "Policies": [{
                            "PolicyName": "root",
                            "PolicyDocument": {"Statement": [{"Effect": "Allow", "Action": "*", "Resource": "*"}]}
                        }]
                    }
                },
                "Topic": {"Type": "AWS::SNS::Topic"}
            }
        }));
        let resolved = t.resolve(&ResolverConfig::default()).unwrap();
        let docs = resolved.policy_documents();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|(id, _)| id == "Role"));
    }
}
