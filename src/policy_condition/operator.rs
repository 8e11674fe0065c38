//! Condition operator names, e.g. `ForAnyValue:StringLikeIfExists`.

use std::fmt::{Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::EngineError;

/// The comparison an operator performs, without modifiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
    ToSchema,
)]
pub enum BaseOperator {
    Bool,
    Null,
    StringEquals,
    StringNotEquals,
    StringEqualsIgnoreCase,
    StringNotEqualsIgnoreCase,
    StringLike,
    StringNotLike,
    ArnEquals,
    ArnNotEquals,
    ArnLike,
    ArnNotLike,
    NumericEquals,
    NumericNotEquals,
    NumericLessThan,
    NumericLessThanEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,
    DateEquals,
    DateNotEquals,
    DateLessThan,
    DateLessThanEquals,
    DateGreaterThan,
    DateGreaterThanEquals,
    IpAddress,
    NotIpAddress,
    BinaryEquals,
}

/// Set operator prefix for multi-valued context keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Quantifier {
    /// No prefix.
    Plain,
    ForAllValues,
    ForAnyValue,
}

/// A decomposed operator key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorKey {
    pub quantifier: Quantifier,
    pub base: BaseOperator,
    /// `...IfExists`: the operator only applies when the key is present.
    pub if_exists: bool,
}

impl OperatorKey {
    pub fn new(base: BaseOperator) -> Self {
        Self {
            quantifier: Quantifier::Plain,
            base,
            if_exists: false,
        }
    }
}

impl FromStr for OperatorKey {
    type Err = EngineError;

    /// Colons are stripped first, so `ForAllValues:StringLike` and
    /// `ForAllValuesStringLike` are the same operator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace(':', "");
        let mut rest = normalized.as_str();

        let quantifier = if let Some(r) = rest.strip_prefix("ForAllValues") {
            rest = r;
            Quantifier::ForAllValues
        } else if let Some(r) = rest.strip_prefix("ForAnyValue") {
            rest = r;
            Quantifier::ForAnyValue
        } else {
            Quantifier::Plain
        };

        let if_exists = match rest.strip_suffix("IfExists") {
            Some(r) => {
                rest = r;
                true
            }
            None => false,
        };

        let base = BaseOperator::from_str(rest)
            .map_err(|_| EngineError::UnknownConditionOperator(s.to_string()))?;

        Ok(Self {
            quantifier,
            base,
            if_exists,
        })
    }
}

impl std::fmt::Display for OperatorKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.quantifier {
            Quantifier::Plain => {}
            Quantifier::ForAllValues => write!(f, "ForAllValues:")?,
            Quantifier::ForAnyValue => write!(f, "ForAnyValue:")?,
        }
        write!(f, "{}", self.base)?;
        if self.if_exists {
            write!(f, "IfExists")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use yare::parameterized;

    #[parameterized(
        plain = { "StringEquals", Quantifier::Plain, BaseOperator::StringEquals, false },
        if_exists = { "NumericLessThanIfExists", Quantifier::Plain, BaseOperator::NumericLessThan, true },
        for_all_colon = { "ForAllValues:StringLike", Quantifier::ForAllValues, BaseOperator::StringLike, false },
        for_all_no_colon = { "ForAllValuesStringLike", Quantifier::ForAllValues, BaseOperator::StringLike, false },
        for_any_if_exists = { "ForAnyValue:ArnLikeIfExists", Quantifier::ForAnyValue, BaseOperator::ArnLike, true },
        not_ip = { "NotIpAddress", Quantifier::Plain, BaseOperator::NotIpAddress, false },
        ignore_case = { "StringNotEqualsIgnoreCaseIfExists", Quantifier::Plain, BaseOperator::StringNotEqualsIgnoreCase, true },
    )]
    fn test_operator_key_from_str(
        input: &str,
        quantifier: Quantifier,
        base: BaseOperator,
        if_exists: bool,
    ) {
        let key = OperatorKey::from_str(input).unwrap();
        assert_eq!(key.quantifier, quantifier);
        assert_eq!(key.base, base);
        assert_eq!(key.if_exists, if_exists);
    }

    #[parameterized(
        unknown = { "StringSortOf" },
        empty = { "" },
        only_quantifier = { "ForAllValues:" },
        lowercase = { "stringequals" },
    )]
    fn test_operator_key_rejects(input: &str) {
        assert_eq!(
            OperatorKey::from_str(input),
            Err(EngineError::UnknownConditionOperator(input.to_string()))
        );
    }

    #[test]
    fn test_display_round_trips_every_operator() {
        for base in BaseOperator::iter() {
            let key = OperatorKey {
                quantifier: Quantifier::ForAnyValue,
                base,
                if_exists: true,
            };
            assert_eq!(OperatorKey::from_str(&key.to_string()).unwrap(), key);
        }
    }
}
