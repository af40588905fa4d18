// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope values: the key/value payload a scope-instantiation event carries,
//! and the two sentinel scopes every job either runs in or is forbidden
//! from claiming.

use crate::topic::{Attrs, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key reserved to mark the "all scopes" sentinel. Never a real scope key;
/// a [`crate::job::Job`] built with this scope is rejected at construction.
pub const ALL_SCOPES_KEY: &str = "__all_scopes__";

/// An ordered key/value map identifying one instantiation of a scope
/// (e.g. `{date: "2024-01-01"}`). Carried by a scope-instantiation event
/// and copied onto every job a scope-expansion generator produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeValues(pub(crate) Attrs);

impl ScopeValues {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self(Attrs::from_pairs(pairs))
    }

    pub fn is_all_scopes(&self) -> bool {
        self.0.contains_key(ALL_SCOPES_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }
}

impl fmt::Display for ScopeValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The default scope every job is created in unless it belongs to a
/// scope-expansion generator.
#[allow(non_snake_case)]
pub fn BASE_SCOPE() -> ScopeValues {
    ScopeValues(Attrs::empty())
}

/// The sentinel scope that a job may never be constructed with directly;
/// it exists only so runner predicates can express "matches any scope".
pub fn all_scopes() -> ScopeValues {
    ScopeValues::new([(ALL_SCOPES_KEY, Scalar::Bool(true))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_scope_is_empty() {
        assert!(BASE_SCOPE().iter().next().is_none());
    }

    #[test]
    fn all_scopes_is_flagged() {
        assert!(all_scopes().is_all_scopes());
        assert!(!BASE_SCOPE().is_all_scopes());
    }
}
