//! Scope policy: translation from foreign vocabularies and requirement checks.
//!
//! Identity providers name their scopes however they like (`User.Read`,
//! `openid`, comma-joined strings). Tools declare requirements in the local
//! vocabulary. [`ScopeMapping`] bridges the two, and [`require_scopes`] is the
//! single gate every protected operation goes through.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Forbidden;
use crate::types::{Identity, ScopeSet};

/// Scope added to every translated set
pub const BASELINE_SCOPE: &str = "authenticated";

/// Foreign-to-local scope translation table
///
/// One foreign scope may expand to several local scopes. Foreign scopes with
/// no entry are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeMapping(BTreeMap<String, Vec<String>>);

impl ScopeMapping {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a foreign scope to one more local scope
    #[must_use]
    pub fn with(mut self, foreign: impl Into<String>, local: impl Into<String>) -> Self {
        self.insert(foreign, local);
        self
    }

    /// Map a foreign scope to one more local scope
    pub fn insert(&mut self, foreign: impl Into<String>, local: impl Into<String>) {
        self.0.entry(foreign.into()).or_default().push(local.into());
    }

    /// Local scopes for one foreign scope
    pub fn get(&self, foreign: &str) -> Option<&[String]> {
        self.0.get(foreign).map(Vec::as_slice)
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<F, L> FromIterator<(F, L)> for ScopeMapping
where
    F: Into<String>,
    L: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (F, L)>>(iter: T) -> Self {
        let mut mapping = Self::new();
        for (foreign, local) in iter {
            mapping.insert(foreign, local);
        }
        mapping
    }
}

/// Translate foreign scopes into the local vocabulary
///
/// The result always contains [`BASELINE_SCOPE`], even for an empty input.
pub fn translate(foreign: &ScopeSet, mapping: &ScopeMapping) -> ScopeSet {
    let mut local: ScopeSet = foreign
        .iter()
        .filter_map(|scope| mapping.get(scope))
        .flatten()
        .cloned()
        .collect();
    local.insert(BASELINE_SCOPE.to_string());
    local
}

/// Required scopes that `granted` does not contain
pub fn missing_scopes(granted: &ScopeSet, required: &ScopeSet) -> ScopeSet {
    required.difference(granted).cloned().collect()
}

/// Pass the identity through if it holds every required scope
///
/// # Errors
///
/// Returns [`Forbidden`] listing the missing scopes otherwise.
pub fn require_scopes<'a>(
    identity: &'a Identity,
    required: &ScopeSet,
) -> Result<&'a Identity, Forbidden> {
    let missing = missing_scopes(identity.scopes(), required);
    if missing.is_empty() {
        Ok(identity)
    } else {
        Err(Forbidden { missing })
    }
}

/// Read a scope claim value
///
/// Strings are split on whitespace and commas; arrays contribute their string
/// elements. Any other JSON type yields `None`.
pub fn parse_scope_claim(value: &Value) -> Option<ScopeSet> {
    match value {
        Value::String(s) => Some(
            s.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}
