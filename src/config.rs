//! Resolution configuration.
//!
//! Everything the resolver needs beyond the template itself is passed in
//! explicitly through a [`ResolverConfig`]; nothing is read from process
//! state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{NO_VALUE, Value};

/// Default values for the template-implicit pseudo-parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "snake_case")]
pub struct PseudoParameters {
    pub account_id: String,
    pub region: String,
    pub partition: String,
    pub stack_id: String,
    pub stack_name: String,
    pub url_suffix: String,
    pub notification_arns: Vec<String>,
}

impl Default for PseudoParameters {
    fn default() -> Self {
        Self {
            account_id: "123456789012".to_string(),
            region: "eu-west-1".to_string(),
            partition: "aws".to_string(),
            stack_id: "arn:aws:cloudformation:eu-west-1:123456789012:stack/stack-name/00000000-0000-0000-0000-000000000000".to_string(),
            stack_name: "stack-name".to_string(),
            url_suffix: "amazonaws.com".to_string(),
            notification_arns: vec![
                "arn:aws:sns:eu-west-1:123456789012:notification-topic".to_string(),
            ],
        }
    }
}

impl PseudoParameters {
    /// The pseudo-parameter table keyed by `AWS::` name.
    pub fn to_params(&self) -> BTreeMap<String, Value> {
        let mut params = BTreeMap::new();
        params.insert("AWS::AccountId".to_string(), Value::from(self.account_id.as_str()));
        params.insert(
            "AWS::NotificationARNs".to_string(),
            Value::List(
                self.notification_arns
                    .iter()
                    .map(|arn| Value::from(arn.as_str()))
                    .collect(),
            ),
        );
        params.insert("AWS::NoValue".to_string(), Value::from(NO_VALUE));
        params.insert("AWS::Partition".to_string(), Value::from(self.partition.as_str()));
        params.insert("AWS::Region".to_string(), Value::from(self.region.as_str()));
        params.insert("AWS::StackId".to_string(), Value::from(self.stack_id.as_str()));
        params.insert("AWS::StackName".to_string(), Value::from(self.stack_name.as_str()));
        params.insert("AWS::URLSuffix".to_string(), Value::from(self.url_suffix.as_str()));
        params
    }
}

/// Configuration for resolving one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverConfig {
    pseudo_parameters: PseudoParameters,
    overrides: BTreeMap<String, Value>,
}

impl ResolverConfig {
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::default()
    }

    pub fn pseudo_parameters(&self) -> &PseudoParameters {
        &self.pseudo_parameters
    }

    /// Caller supplied parameter values. These win over declared defaults
    /// and pseudo-parameters.
    pub fn overrides(&self) -> &BTreeMap<String, Value> {
        &self.overrides
    }
}

/// Builder for [`ResolverConfig`].
#[derive(Debug, Default)]
pub struct ResolverConfigBuilder {
    pseudo_parameters: PseudoParameters,
    overrides: BTreeMap<String, Value>,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pseudo_parameters(mut self, pseudo_parameters: PseudoParameters) -> Self {
        self.pseudo_parameters = pseudo_parameters;
        self
    }

    pub fn with_parameter_override(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn build(self) -> ResolverConfig {
        ResolverConfig {
            pseudo_parameters: self.pseudo_parameters,
            overrides: self.overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_parameter_table() {
        let params = PseudoParameters::default().to_params();
        assert_eq!(params.len(), 8);
        assert_eq!(params["AWS::AccountId"], Value::from("123456789012"));
        assert_eq!(params["AWS::NoValue"], Value::from(NO_VALUE));
        assert!(matches!(params["AWS::NotificationARNs"], Value::List(_)));
    }

    #[test]
    fn test_pseudo_parameters_deserialize_partial() {
        let pseudo: PseudoParameters =
            serde_json::from_str(r#"{"region": "us-east-1"}"#).unwrap();
        assert_eq!(pseudo.region, "us-east-1");
        assert_eq!(pseudo.partition, "aws");
    }

    #[test]
    fn test_builder() {
        let config = ResolverConfig::builder()
            .with_parameter_override("Env", "prod")
            .with_overrides(vec![("Count".to_string(), Value::from(3_i64))])
            .build();
        assert_eq!(config.overrides().len(), 2);
        assert_eq!(config.pseudo_parameters().region, "eu-west-1");
    }
}
