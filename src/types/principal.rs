//! Statement principals.

use std::fmt::{Display, Formatter, Result as FmtResult};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::EngineError;

use super::{FunctionNode, Node};

/// The `Principal` / `NotPrincipal` element of a statement.
///
/// Either a bare principal (usually `"*"`), a list of them, or a typed block
/// such as `{"AWS": [...], "Service": "ec2.amazonaws.com"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Principal {
    Single(Node),
    List(Vec<Node>),
    Typed(IndexMap<String, Node>),
}

/// One flattened principal entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PrincipalToken {
    Literal(String),
    /// A function marker left over from an unresolved template.
    Unresolved(Box<FunctionNode>),
}

impl PrincipalToken {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            PrincipalToken::Literal(s) => Some(s),
            PrincipalToken::Unresolved(_) => None,
        }
    }
}

impl Display for PrincipalToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PrincipalToken::Literal(s) => write!(f, "{s}"),
            PrincipalToken::Unresolved(func) => {
                write!(f, "{}", serde_json::to_string(func).unwrap_or_default())
            }
        }
    }
}

impl Principal {
    pub fn from_node(node: &Node) -> Result<Self, EngineError> {
        match node {
            Node::Map(map) => Ok(Principal::Typed(map.clone())),
            Node::List(items) => Ok(Principal::List(items.clone())),
            Node::String(_) | Node::Function(_) => Ok(Principal::Single(node.clone())),
            other => Err(EngineError::InvalidFormat(format!(
                "unsupported principal: {}",
                serde_json::to_string(other).unwrap_or_default()
            ))),
        }
    }

    pub fn nodes(&self) -> Vec<&Node> {
        match self {
            Principal::Single(node) => vec![node],
            Principal::List(items) => items.iter().collect(),
            Principal::Typed(map) => map.values().collect(),
        }
    }

    /// Flatten into a list of tokens, dropping principal kinds.
    pub fn tokens(&self) -> Vec<PrincipalToken> {
        let mut out = Vec::new();
        for node in self.nodes() {
            collect_tokens(node, &mut out);
        }
        out
    }
}

fn collect_tokens(node: &Node, out: &mut Vec<PrincipalToken>) {
    match node {
        Node::String(s) => out.push(PrincipalToken::Literal(s.clone())),
        Node::Function(func) => out.push(PrincipalToken::Unresolved(func.clone())),
        Node::List(items) => items.iter().for_each(|item| collect_tokens(item, out)),
        Node::Map(map) => map.values().for_each(|item| collect_tokens(item, out)),
        Node::Number(n) => out.push(PrincipalToken::Literal(n.to_string())),
        Node::Null | Node::Bool(_) | Node::Date(_) => {}
    }
}
