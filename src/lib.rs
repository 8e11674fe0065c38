// src/lib.rs
pub use actions::{ActionCatalog, catalog, expand_action, expand_actions, privileged_actions};
pub use conditions::{build_params, resolve_conditional_entries, resolve_conditions};
pub use config::{PseudoParameters, ResolverConfig, ResolverConfigBuilder};
pub use error::EngineError;
pub use loader::load_template;
pub use pattern::wildcard_regex;
pub use policy_condition::{
    BaseOperator, CompiledCondition, ConditionBlock, ConditionState, OperatorKey, Predicate,
    Quantifier, StatementCondition,
};
pub use resolver::{GETATT, GETAZS, Mappings, ResolutionContext, resolve};
pub use template::{ResolvedTemplate, Template};

pub mod types;

mod actions;
mod conditions;
mod config;
mod error;
mod loader;
mod pattern;
mod policy_condition;
mod query;
mod resolver;
mod template;

#[cfg(test)]
mod tests;
