//! Compilation of IAM statement `Condition` blocks into predicates over a
//! request context.
//!
//! A condition block maps operator names to `{context key: comparison
//! value(s)}`. Compiling binds every comparison value once and produces a
//! single [`Predicate`]; keys within a block and blocks within a statement are
//! ANDed.

mod evaluators;
mod operator;


use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::EngineError;
use crate::types::{Node, RequestContext, Value};

use evaluators::{Evaluator, base_evaluator};
pub use operator::{BaseOperator, OperatorKey, Quantifier};

/// A compiled condition, safe to share between threads.
pub type Predicate = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

type KeyEvaluator = Box<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// One operator with its context keys and comparison values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBlock {
    /// The operator name as written in the document.
    pub name: String,
    pub operator: OperatorKey,
    pub entries: IndexMap<String, Node>,
}

/// A statement's `Condition` member, parsed but not compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementCondition {
    pub blocks: Vec<ConditionBlock>,
}

impl StatementCondition {
    pub fn from_node(node: &Node) -> Result<Self, EngineError> {
        let Some(body) = node.as_map() else {
            return Err(EngineError::InvalidFormat(
                "Condition must be a mapping of operators".to_string(),
            ));
        };

        let mut blocks = Vec::with_capacity(body.len());
        for (name, entries) in body {
            let operator = OperatorKey::from_str(name)?;
            let Some(entries) = entries.as_map() else {
                return Err(EngineError::InvalidFormat(format!(
                    "Condition operator '{name}' must map context keys to values"
                )));
            };
            blocks.push(ConditionBlock {
                name: name.clone(),
                operator,
                entries: entries.clone(),
            });
        }
        Ok(Self { blocks })
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, EngineError> {
        Self::from_node(&Node::from(value))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.entries.is_empty())
    }

    /// Compile into a predicate.
    ///
    /// Fails with `MalformedConditionOperand` if any comparison value still
    /// holds an unresolved function.
    pub fn compile(&self) -> Result<CompiledCondition, EngineError> {
        let mut evaluators: Vec<KeyEvaluator> = Vec::new();
        for block in &self.blocks {
            for (key, node) in &block.entries {
                let Some(expected) = node.as_value() else {
                    return Err(EngineError::MalformedConditionOperand {
                        operator: block.name.clone(),
                        key: key.clone(),
                    });
                };
                evaluators.push(key_evaluator(block.operator, key.clone(), &expected)?);
            }
        }

        debug!(
            event = "Condition",
            phase = "Compiled",
            blocks = self.blocks.len(),
            keys = evaluators.len()
        );

        let predicate: Predicate =
            Arc::new(move |ctx: &RequestContext| evaluators.iter().all(|e| e(ctx)));
        Ok(CompiledCondition {
            condition: self.clone(),
            predicate,
        })
    }
}

/// A condition together with its compiled predicate.
#[derive(Clone)]
pub struct CompiledCondition {
    condition: StatementCondition,
    predicate: Predicate,
}

impl CompiledCondition {
    pub fn evaluate(&self, ctx: &RequestContext) -> bool {
        (self.predicate)(ctx)
    }

    pub fn condition(&self) -> &StatementCondition {
        &self.condition
    }

    pub fn predicate(&self) -> Predicate {
        Arc::clone(&self.predicate)
    }
}

impl Debug for CompiledCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CompiledCondition")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// A statement condition that is compiled on first use.
#[derive(Debug, Clone)]
pub enum ConditionState {
    Uncompiled(StatementCondition),
    Compiled(CompiledCondition),
}

impl ConditionState {
    pub fn new(condition: StatementCondition) -> Self {
        Self::Uncompiled(condition)
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }

    /// Compile if needed and return the compiled form. A failed compilation
    /// leaves the state untouched.
    pub fn compiled(&mut self) -> Result<&CompiledCondition, EngineError> {
        match self {
            Self::Compiled(compiled) => Ok(compiled),
            Self::Uncompiled(condition) => {
                let compiled = condition.compile()?;
                *self = Self::Compiled(compiled);
                self.compiled()
            }
        }
    }

    pub fn evaluate(&mut self, ctx: &RequestContext) -> Result<bool, EngineError> {
        Ok(self.compiled()?.evaluate(ctx))
    }
}

/// Build the evaluator for a single context key under one operator.
///
/// With the key absent, `IfExists` operators and `ForAllValues` hold, every
/// other operator fails. With the key present:
/// - `ForAllValues`: every context value matches some comparison value.
/// - `ForAnyValue`, or a list of comparison values: some context value
///   matches some comparison value.
/// - otherwise the context value is compared directly.
fn key_evaluator(
    operator: OperatorKey,
    key: String,
    expected: &Value,
) -> Result<KeyEvaluator, EngineError> {
    if operator.base == BaseOperator::Null {
        let expect_absent = expected.as_bool().unwrap_or(false);
        return Ok(Box::new(move |ctx: &RequestContext| {
            ctx.get(&key).is_none_or(Value::is_null) == expect_absent
        }));
    }

    let multi = matches!(expected, Value::List(_));
    let evaluators = expected
        .elements()
        .into_iter()
        .map(|value| base_evaluator(operator.base, value))
        .collect::<Result<Vec<Evaluator>, _>>()?;

    Ok(Box::new(move |ctx: &RequestContext| {
        let Some(actual) = ctx.get(&key) else {
            return operator.if_exists || operator.quantifier == Quantifier::ForAllValues;
        };
        let matches_any = |value: &Value| evaluators.iter().any(|e| e(value));
        match operator.quantifier {
            Quantifier::ForAllValues => actual.elements().into_iter().all(matches_any),
            Quantifier::ForAnyValue => actual.elements().into_iter().any(matches_any),
            Quantifier::Plain if multi => actual.elements().into_iter().any(matches_any),
            Quantifier::Plain => matches_any(actual),
        }
    }))
}
