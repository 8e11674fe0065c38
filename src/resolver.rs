//! Intrinsic function resolution.
//!
//! [`resolve`] collapses a [`Node`] tree into a concrete [`Value`]. It is
//! best effort: references to unknown parameters or mapping entries become
//! deterministic placeholders, attributes that only exist after deployment
//! become fixed sentinels, and the call only fails when a function argument
//! has the wrong shape.

use std::collections::BTreeMap;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::error::EngineError;
use crate::types::{FunctionKind, Node, Value};

/// Resolved value of `Fn::GetAtt`.
pub const GETATT: &str = "GETATT";
/// Resolved value of `Fn::GetAZs`.
pub const GETAZS: &str = "GETAZS";

/// `${token}` references inside `Fn::Sub` templates.
static SUB_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("valid Fn::Sub token pattern"));

pub type Mappings = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// Parameters, mappings and already-resolved conditions visible to the
/// resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionContext {
    pub params: BTreeMap<String, Value>,
    pub mappings: Mappings,
    pub conditions: BTreeMap<String, bool>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_mapping(
        mut self,
        map: impl Into<String>,
        top: impl Into<String>,
        second: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.mappings
            .entry(map.into())
            .or_default()
            .entry(top.into())
            .or_default()
            .insert(second.into(), value.into());
        self
    }

    pub fn with_condition(mut self, name: impl Into<String>, value: bool) -> Self {
        self.conditions.insert(name.into(), value);
        self
    }

    /// A condition that has not been resolved (yet) is false.
    pub fn condition(&self, name: &str) -> bool {
        self.conditions.get(name).copied().unwrap_or(false)
    }
}

/// Resolve a node against the context.
pub fn resolve(node: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    match node {
        Node::Null => Ok(Value::Null),
        Node::Bool(b) => Ok(Value::Bool(*b)),
        Node::Number(n) => Ok(Value::Number(n.clone())),
        Node::String(s) => Ok(Value::String(s.clone())),
        Node::Date(d) => Ok(Value::Date(*d)),
        Node::List(items) => resolve_list(items, ctx).map(Value::List),
        Node::Map(map) => {
            if map.len() == 1 {
                if let Some((key, arg)) = map.first() {
                    if let Ok(kind) = FunctionKind::from_str(key) {
                        return resolve_function(kind, arg, ctx);
                    }
                }
            }
            let mut out = BTreeMap::new();
            for (key, value) in map {
                let resolved = resolve(value, ctx)?;
                if !resolved.is_no_value() {
                    out.insert(key.clone(), resolved);
                }
            }
            Ok(Value::Map(out))
        }
        Node::Function(func) => resolve_function(func.kind, &func.arg, ctx),
    }
}

fn resolve_list(items: &[Node], ctx: &ResolutionContext) -> Result<Vec<Value>, EngineError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let resolved = resolve(item, ctx)?;
        if !resolved.is_no_value() {
            out.push(resolved);
        }
    }
    Ok(out)
}

fn resolve_function(
    kind: FunctionKind,
    arg: &Node,
    ctx: &ResolutionContext,
) -> Result<Value, EngineError> {
    match kind {
        FunctionKind::Ref | FunctionKind::ImportValue => resolve_ref(arg, ctx),
        FunctionKind::FindInMap => resolve_find_in_map(arg, ctx),
        FunctionKind::Join => resolve_join(arg, ctx),
        FunctionKind::Sub => resolve_sub(arg, ctx),
        FunctionKind::Select => resolve_select(arg, ctx),
        FunctionKind::Split => resolve_split(arg, ctx),
        FunctionKind::If => resolve_if(arg, ctx),
        FunctionKind::And => {
            let operands = resolve_args(kind, arg, ctx)?;
            Ok(Value::Bool(operands.iter().all(Value::truthy)))
        }
        FunctionKind::Or => {
            let operands = resolve_args(kind, arg, ctx)?;
            Ok(Value::Bool(operands.iter().any(Value::truthy)))
        }
        FunctionKind::Not => {
            let operands = resolve_args(kind, arg, ctx)?;
            match operands.as_slice() {
                [operand] => Ok(Value::Bool(!operand.truthy())),
                _ => Err(bad_shape(kind, "exactly one operand")),
            }
        }
        FunctionKind::Equals => {
            let [left, right] = fixed_args::<2>(kind, arg)?;
            let left = resolve(left, ctx)?.canonical();
            let right = resolve(right, ctx)?.canonical();
            Ok(Value::Bool(left == right))
        }
        FunctionKind::Base64 => {
            let text = resolve(arg, ctx)?.to_text();
            Ok(Value::String(STANDARD.encode(text.as_bytes())))
        }
        FunctionKind::GetAtt => {
            warn!(event = "Resolve", phase = "GetAtt", "attribute only exists after deployment");
            Ok(Value::from(GETATT))
        }
        FunctionKind::GetAZs => {
            warn!(event = "Resolve", phase = "GetAZs", "availability zones are not known offline");
            Ok(Value::from(GETAZS))
        }
        FunctionKind::Condition => {
            let name = resolve(arg, ctx)?.to_text();
            Ok(Value::Bool(ctx.condition(&name)))
        }
    }
}

fn resolve_ref(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let key = resolve(arg, ctx)?.to_text();
    match ctx.params.get(&key) {
        Some(value) => Ok(value.clone()),
        None => {
            warn!(event = "Resolve", phase = "Ref", key = %key, "parameter is not defined");
            Ok(Value::String(format!("UNDEFINED_PARAM_{key}")))
        }
    }
}

fn resolve_find_in_map(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let [map, top, second] = fixed_args::<3>(FunctionKind::FindInMap, arg)?;
    let map = resolve(map, ctx)?.to_text();
    let top = resolve(top, ctx)?.to_text();
    let second = resolve(second, ctx)?.to_text();

    let found = ctx
        .mappings
        .get(&map)
        .and_then(|m| m.get(&top))
        .and_then(|m| m.get(&second));
    match found {
        Some(value) => Ok(value.clone()),
        None => {
            warn!(
                event = "Resolve",
                phase = "FindInMap",
                map = %map,
                top = %top,
                second = %second,
                "mapping entry is not defined"
            );
            Ok(Value::String(format!("UNDEFINED_MAPPING_{map}_{top}_{second}")))
        }
    }
}

fn resolve_join(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let [delimiter, items] = fixed_args::<2>(FunctionKind::Join, arg)?;
    let delimiter = resolve(delimiter, ctx)?.to_text();
    let items = resolve(items, ctx)?;
    let joined = items
        .elements()
        .into_iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(&delimiter);
    Ok(Value::String(joined))
}

fn resolve_sub(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let (template, extra) = match arg {
        Node::List(items) => match items.as_slice() {
            [template] => (template, None),
            [template, vars] => (template, Some(vars)),
            _ => return Err(bad_shape(FunctionKind::Sub, "a string or [template, variables]")),
        },
        other => (other, None),
    };

    let template = resolve(template, ctx)?.to_text();
    let extra = match extra {
        Some(vars) => match resolve(vars, ctx)? {
            Value::Map(map) => map,
            _ => return Err(bad_shape(FunctionKind::Sub, "a variables mapping")),
        },
        None => BTreeMap::new(),
    };

    let substituted = SUB_TOKEN.replace_all(&template, |caps: &Captures| {
        let token = &caps[1];
        if let Some(literal) = token.strip_prefix('!') {
            return format!("${{{literal}}}");
        }
        match extra.get(token).or_else(|| ctx.params.get(token)) {
            Some(value) => value.to_text(),
            None => caps[0].to_string(),
        }
    });
    Ok(Value::String(substituted.into_owned()))
}

fn resolve_select(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let [index, items] = fixed_args::<2>(FunctionKind::Select, arg)?;
    let index = resolve(index, ctx)?;
    let Some(index) = index.as_i64() else {
        return Err(bad_shape(FunctionKind::Select, "an integer index"));
    };

    match resolve(items, ctx)? {
        Value::List(items) => {
            let found = usize::try_from(index).ok().and_then(|i| items.get(i).cloned());
            match found {
                Some(value) => Ok(value),
                None => {
                    warn!(
                        event = "Resolve",
                        phase = "Select",
                        index = index,
                        len = items.len(),
                        "index out of range"
                    );
                    Ok(Value::Null)
                }
            }
        }
        // Sentinels such as GETAZS stand in for whole lists.
        other => Ok(other),
    }
}

fn resolve_split(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let [delimiter, source] = fixed_args::<2>(FunctionKind::Split, arg)?;
    let delimiter = resolve(delimiter, ctx)?.to_text();
    let source = resolve(source, ctx)?.to_text();
    if delimiter.is_empty() {
        return Ok(Value::List(vec![Value::String(source)]));
    }
    Ok(Value::List(source.split(delimiter.as_str()).map(Value::from).collect()))
}

fn resolve_if(arg: &Node, ctx: &ResolutionContext) -> Result<Value, EngineError> {
    let [condition, when_true, when_false] = fixed_args::<3>(FunctionKind::If, arg)?;
    let condition = Node::function(FunctionKind::Condition, condition.clone());
    if resolve(&condition, ctx)?.truthy() {
        resolve(when_true, ctx)
    } else {
        resolve(when_false, ctx)
    }
}

fn resolve_args(
    kind: FunctionKind,
    arg: &Node,
    ctx: &ResolutionContext,
) -> Result<Vec<Value>, EngineError> {
    match arg {
        Node::List(items) => items.iter().map(|item| resolve(item, ctx)).collect(),
        _ => Err(bad_shape(kind, "a list of operands")),
    }
}

fn fixed_args<const N: usize>(kind: FunctionKind, arg: &Node) -> Result<[&Node; N], EngineError> {
    let items = arg
        .as_list()
        .ok_or_else(|| bad_shape(kind, &format!("a list of {N} arguments")))?;
    let refs: Vec<&Node> = items.iter().collect();
    refs.try_into()
        .map_err(|_| bad_shape(kind, &format!("a list of {N} arguments")))
}

fn bad_shape(kind: FunctionKind, expected: &str) -> EngineError {
    EngineError::UnsupportedValueType(format!("{kind} expects {expected}"))
}
