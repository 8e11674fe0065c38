//! The known-actions catalog and wildcard action expansion.
//!
//! The bundled catalog is parsed once, on first use, and is read-only for the
//! rest of the process.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::pattern::wildcard_regex;

const BUNDLED_CATALOG: &str = include_str!("../data/iam_actions.json");
const BUNDLED_PRIVILEGED: &str = include_str!("../data/privileged_actions.json");

static CATALOG: Lazy<ActionCatalog> =
    Lazy::new(|| ActionCatalog::bundled().expect("bundled action catalog is valid"));

static PRIVILEGED_ACTIONS: Lazy<Vec<String>> = Lazy::new(|| {
    serde_json::from_str(BUNDLED_PRIVILEGED).expect("bundled privileged actions are valid")
});

#[derive(Deserialize)]
struct CatalogFile {
    version: String,
    /// Service prefix to privilege names.
    actions: BTreeMap<String, Vec<String>>,
}

/// A sorted set of `service:Privilege` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionCatalog {
    version: String,
    actions: BTreeSet<String>,
}

impl ActionCatalog {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: String::new(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a catalog in the bundled format:
    /// `{"version": "...", "actions": {"s3": ["GetObject", ...]}}`.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        let actions = file
            .actions
            .iter()
            .flat_map(|(service, privileges)| {
                privileges.iter().map(move |p| format!("{service}:{p}"))
            })
            .collect::<BTreeSet<_>>();

        debug!(
            event = "ActionCatalog",
            phase = "Loaded",
            version = %file.version,
            services = file.actions.len(),
            actions = actions.len()
        );

        Ok(Self {
            version: file.version,
            actions,
        })
    }

    pub fn bundled() -> Result<Self, EngineError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// Expand one action pattern. See [`ActionCatalog::expand_all`].
    pub fn expand(&self, action: &str, negate: bool) -> Vec<String> {
        self.expand_all([action], negate)
    }

    /// Expand every pattern positively and union the results; with `negate`
    /// the result is the rest of the catalog instead.
    ///
    /// Patterns are case-insensitive full matches. A pattern matching no
    /// catalog entry contributes nothing.
    pub fn expand_all<I, S>(&self, actions: I, negate: bool) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matched: BTreeSet<&str> = BTreeSet::new();
        for action in actions {
            let action = action.as_ref();
            let re = match wildcard_regex(action) {
                Ok(re) => re,
                Err(err) => {
                    warn!(event = "Actions", phase = "Expand", action = %action, error = %err);
                    continue;
                }
            };
            let before = matched.len();
            let mut hits = 0;
            for known in self.iter().filter(|known| re.is_match(known)) {
                matched.insert(known);
                hits += 1;
            }
            if hits == 0 {
                warn!(
                    event = "Actions",
                    phase = "Expand",
                    action = %action,
                    "action not found in catalog"
                );
            }
            debug!(
                event = "Actions",
                phase = "Expand",
                action = %action,
                matched = hits,
                new = matched.len() - before
            );
        }

        if negate {
            self.iter()
                .filter(|known| !matched.contains(known))
                .map(str::to_string)
                .collect()
        } else {
            matched.into_iter().map(str::to_string).collect()
        }
    }
}

/// The bundled catalog.
pub fn catalog() -> &'static ActionCatalog {
    &CATALOG
}

/// Expand one action pattern against the bundled catalog.
pub fn expand_action(action: &str, negate: bool) -> Vec<String> {
    CATALOG.expand(action, negate)
}

/// Expand several action patterns against the bundled catalog.
pub fn expand_actions<I, S>(actions: I, negate: bool) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    CATALOG.expand_all(actions, negate)
}

/// The bundled reference list of privileged actions.
pub fn privileged_actions() -> &'static [String] {
    &PRIVILEGED_ACTIONS
}
