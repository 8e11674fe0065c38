//! IAM policy documents and their statements.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::EngineError;
use crate::policy_condition::StatementCondition;
use crate::resolver::{ResolutionContext, resolve};

use super::{Node, Principal};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
pub enum Effect {
    Allow,
    Deny,
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_ref())
    }
}

/// A single policy statement.
///
/// Action, resource and principal fields keep the raw node so a statement
/// can be inspected before its template has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_action: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Node>,
}

impl Statement {
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            action: None,
            not_action: None,
            resource: None,
            not_resource: None,
            principal: None,
            not_principal: None,
            condition: None,
        }
    }

    pub fn from_node(node: &Node) -> Result<Self, EngineError> {
        let Some(body) = node.as_map() else {
            return Err(EngineError::InvalidFormat(
                "statement must be a mapping".to_string(),
            ));
        };

        let effect = body
            .get("Effect")
            .and_then(Node::as_str)
            .and_then(|s| s.parse::<Effect>().ok())
            .ok_or_else(|| {
                EngineError::InvalidFormat("statement Effect must be Allow or Deny".to_string())
            })?;

        let principal = body.get("Principal").map(Principal::from_node).transpose()?;
        let not_principal = body
            .get("NotPrincipal")
            .map(Principal::from_node)
            .transpose()?;

        Ok(Self {
            sid: body.get("Sid").and_then(Node::as_str).map(str::to_string),
            effect,
            action: body.get("Action").cloned(),
            not_action: body.get("NotAction").cloned(),
            resource: body.get("Resource").cloned(),
            not_resource: body.get("NotResource").cloned(),
            principal,
            not_principal,
            condition: body.get("Condition").cloned(),
        })
    }

    /// The condition block, ready to compile.
    pub fn statement_condition(&self) -> Result<Option<StatementCondition>, EngineError> {
        self.condition
            .as_ref()
            .map(StatementCondition::from_node)
            .transpose()
    }

    /// Produce a new statement with every field resolved. A field that
    /// resolves to the NoValue sentinel is dropped.
    pub fn resolve(&self, ctx: &ResolutionContext) -> Result<Self, EngineError> {
        let field = |node: &Option<Node>| -> Result<Option<Node>, EngineError> {
            let Some(node) = node else {
                return Ok(None);
            };
            let value = resolve(node, ctx)?;
            Ok((!value.is_no_value()).then(|| Node::from(value)))
        };
        let principal = |p: &Option<Principal>| -> Result<Option<Principal>, EngineError> {
            let node = match p {
                None => return Ok(None),
                Some(Principal::Single(node)) => node.clone(),
                Some(Principal::List(items)) => Node::List(items.clone()),
                Some(Principal::Typed(map)) => Node::Map(map.clone()),
            };
            let value = resolve(&node, ctx)?;
            if value.is_no_value() {
                return Ok(None);
            }
            Principal::from_node(&Node::from(value)).map(Some)
        };

        Ok(Self {
            sid: self.sid.clone(),
            effect: self.effect,
            action: field(&self.action)?,
            not_action: field(&self.not_action)?,
            resource: field(&self.resource)?,
            not_resource: field(&self.not_resource)?,
            principal: principal(&self.principal)?,
            not_principal: principal(&self.not_principal)?,
            condition: field(&self.condition)?,
        })
    }
}

/// An IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "Statement")]
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            version: None,
            statements,
        }
    }

    /// Build a document from its node form. `Statement` may be a single
    /// mapping or a list of them.
    pub fn from_node(node: &Node) -> Result<Self, EngineError> {
        let Some(body) = node.as_map() else {
            return Err(EngineError::InvalidFormat(
                "policy document must be a mapping".to_string(),
            ));
        };

        let statements = match body.get("Statement") {
            Some(statements) => statements
                .elements()
                .into_iter()
                .map(Statement::from_node)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            version: body.get("Version").and_then(Node::as_str).map(str::to_string),
            statements,
        })
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, EngineError> {
        Self::from_node(&Node::from(value))
    }

    /// Produce a new, independent document with every function resolved.
    pub fn resolve(&self, ctx: &ResolutionContext) -> Result<Self, EngineError> {
        Ok(Self {
            version: self.version.clone(),
            statements: self
                .statements
                .iter()
                .map(|s| s.resolve(ctx))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use serde_json::json;

    #[test]
    fn test_single_statement_document() {
        let doc = PolicyDocument::from_json(json!({
            "Version": "2012-10-17",
            "Statement": {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}
        }))
        .unwrap();

        assert_eq!(doc.version.as_deref(), Some("2012-10-17"));
        assert_eq!(doc.statements.len(), 1);
        assert_eq!(doc.statements[0].effect, Effect::Allow);
    }

    #[test]
    fn test_invalid_effect_rejected() {
        let result = PolicyDocument::from_json(json!({
            "Statement": [{"Effect": "Maybe", "Action": "*"}]
        }));
        assert!(matches!(result, Err(EngineError::InvalidFormat(_))));
    }

    #[test]
    fn test_resolve_produces_independent_document() {
        let doc = PolicyDocument::from_json(json!({
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": {"Fn::Sub": "arn:aws:iam::${AWS::AccountId}:root"}},
                "Action": ["s3:GetObject", {"Ref": "AWS::NoValue"}],
                "Resource": {"Fn::Join": ["", ["arn:aws:s3:::", {"Ref": "Bucket"}, "/*"]]}
            }]
        }))
        .unwrap();

        let ctx = ResolutionContext::new()
            .with_param("AWS::AccountId", "123456789012")
            .with_param("AWS::NoValue", crate::types::NO_VALUE)
            .with_param("Bucket", "logs");
        let resolved = doc.resolve(&ctx).unwrap();

        let statement = &resolved.statements[0];
        assert_eq!(
            statement.resource.as_ref().and_then(Node::as_value),
            Some(Value::from("arn:aws:s3:::logs/*"))
        );
        assert_eq!(
            statement.action.as_ref().and_then(Node::as_value),
            Some(Value::from(json!(["s3:GetObject"])))
        );
        let principal = statement.principal.as_ref().unwrap();
        assert_eq!(
            principal.tokens()[0].as_literal(),
            Some("arn:aws:iam::123456789012:root")
        );
        // the original still carries its functions
        assert!(doc.statements[0].resource.as_ref().unwrap().is_function());
    }

    #[test]
    fn test_resolve_drops_no_value_fields() {
        let doc = PolicyDocument::from_json(json!({
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"Ref": "AWS::NoValue"},
                "Action": {"Ref": "AWS::NoValue"},
                "NotAction": "kms:*",
                "Resource": "*",
                "Condition": {"Ref": "AWS::NoValue"}
            }]
        }))
        .unwrap();

        let ctx = ResolutionContext::new().with_param("AWS::NoValue", crate::types::NO_VALUE);
        let statement = &doc.resolve(&ctx).unwrap().statements[0];

        assert!(statement.action.is_none());
        assert!(statement.principal.is_none());
        assert!(statement.condition.is_none());
        assert_eq!(
            statement.not_action.as_ref().and_then(Node::as_value),
            Some(Value::from("kms:*"))
        );
    }

    #[test]
    fn test_serialize_statement() {
        let doc = PolicyDocument::from_json(json!({
            "Statement": [{"Effect": "Deny", "Action": "iam:*", "Resource": "*"}]
        }))
        .unwrap();
        insta::assert_json_snapshot!(doc, @r#"
        {
          "Statement": [
            {
              "Effect": "Deny",
              "Action": "iam:*",
              "Resource": "*"
            }
          ]
        }
        "#);
    }
}
