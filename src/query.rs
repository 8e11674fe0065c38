//! Read-only queries over policy documents.
//!
//! Every query tolerates partially resolved documents: a function marker is
//! never a literal, so it never matches a pattern.

use std::collections::BTreeSet;

use itertools::Itertools;
use regex::Regex;
use tracing::warn;

use crate::actions::{ActionCatalog, privileged_actions};
use crate::pattern::{has_wildcard, wildcard_regex};
use crate::types::{Effect, Node, PolicyDocument, PrincipalToken, Statement};

fn literals(node: &Node) -> Vec<&str> {
    match node {
        Node::String(s) => vec![s.as_str()],
        Node::List(items) => items.iter().flat_map(literals).collect(),
        _ => Vec::new(),
    }
}

fn field_literals(node: Option<&Node>) -> Vec<&str> {
    node.map(literals).unwrap_or_default()
}

impl Statement {
    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Literal `Action` entries.
    pub fn actions(&self) -> Vec<&str> {
        field_literals(self.action.as_ref())
    }

    /// Literal `NotAction` entries.
    pub fn not_actions(&self) -> Vec<&str> {
        field_literals(self.not_action.as_ref())
    }

    /// Literal `Resource` entries.
    pub fn resources(&self) -> Vec<&str> {
        field_literals(self.resource.as_ref())
    }

    /// Flattened `Principal` entries, in document order.
    pub fn principals(&self) -> Vec<PrincipalToken> {
        self.principal
            .as_ref()
            .map(|p| p.tokens())
            .unwrap_or_default()
    }

    /// The concrete actions this statement covers.
    ///
    /// `Action` patterns are expanded against `catalog`; `NotAction` covers
    /// every catalog entry its patterns do not.
    pub fn expanded_actions(&self, catalog: &ActionCatalog) -> Vec<String> {
        let mut covered: BTreeSet<String> = BTreeSet::new();
        if self.action.is_some() {
            covered.extend(catalog.expand_all(self.actions(), false));
        }
        if self.not_action.is_some() {
            covered.extend(catalog.expand_all(self.not_actions(), true));
        }
        covered.into_iter().collect()
    }

    pub fn has_resource_matching(&self, pattern: &Regex) -> bool {
        self.resources().into_iter().any(|r| pattern.is_match(r))
    }

    pub fn has_action_matching(&self, pattern: &Regex) -> bool {
        self.actions().into_iter().any(|a| pattern.is_match(a))
    }
}

impl PolicyDocument {
    fn allow_statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| s.is_allow())
    }

    /// Statements with at least one resource matching `pattern`.
    pub fn statements_with(&self, pattern: &Regex) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.has_resource_matching(pattern))
            .collect()
    }

    /// Allow statements with at least one action matching `pattern`.
    pub fn allowed_actions_with(&self, pattern: &Regex) -> Vec<&Statement> {
        self.allow_statements()
            .filter(|s| s.has_action_matching(pattern))
            .collect()
    }

    /// Literal principals of Allow statements matching `pattern`.
    pub fn allowed_principals_with(&self, pattern: &Regex) -> BTreeSet<String> {
        self.allow_statements()
            .flat_map(Statement::principals)
            .filter_map(|token| token.as_literal().map(str::to_string))
            .filter(|principal| pattern.is_match(principal))
            .collect()
    }

    /// Principals of Allow statements that are not in `whitelist`.
    ///
    /// Unresolved principals can never be whitelisted and are always
    /// returned.
    pub fn non_whitelisted_allowed_principals<S: AsRef<str>>(
        &self,
        whitelist: &[S],
    ) -> Vec<PrincipalToken> {
        let whitelist: BTreeSet<&str> = whitelist.iter().map(|s| s.as_ref()).collect();
        let mut out: Vec<PrincipalToken> = Vec::new();
        for token in self.allow_statements().flat_map(Statement::principals) {
            let whitelisted = token
                .as_literal()
                .is_some_and(|principal| whitelist.contains(principal));
            if !whitelisted && !out.contains(&token) {
                out.push(token);
            }
        }
        out
    }

    /// Literal allowed actions that still contain a wildcard.
    pub fn allowed_actions_with_wildcard(&self) -> Vec<&str> {
        self.allow_statements()
            .flat_map(Statement::actions)
            .filter(|a| has_wildcard(a))
            .unique()
            .collect()
    }

    /// Every concrete action granted by an Allow statement.
    pub fn expanded_allowed_actions(&self, catalog: &ActionCatalog) -> Vec<String> {
        self.allow_statements()
            .flat_map(|s| s.expanded_actions(catalog))
            .sorted()
            .dedup()
            .collect()
    }

    /// Privileged actions granted by Allow statements, matched against the
    /// bundled privileged-action list. With `difference`, the privileged
    /// actions that are not granted.
    pub fn privileged_actions(&self, difference: bool) -> Vec<String> {
        self.privileged_actions_in(privileged_actions(), difference)
    }

    /// Same as [`PolicyDocument::privileged_actions`] with a caller supplied
    /// reference list.
    pub fn privileged_actions_in<S: AsRef<str>>(
        &self,
        reference: &[S],
        difference: bool,
    ) -> Vec<String> {
        let patterns: Vec<Regex> = self
            .allow_statements()
            .flat_map(Statement::actions)
            .unique()
            .filter_map(|action| match wildcard_regex(action) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(
                        event = "Query",
                        phase = "PrivilegedActions",
                        action = %action,
                        error = %err
                    );
                    None
                }
            })
            .collect();

        reference
            .iter()
            .map(|s| s.as_ref())
            .filter(|privileged| {
                patterns.iter().any(|re| re.is_match(privileged)) != difference
            })
            .map(str::to_string)
            .sorted()
            .dedup()
            .collect()
    }
}
