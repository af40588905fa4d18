// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic names: the ordered key/value maps that identify everything the
//! event log talks about (jobs, scope instantiations, anything else a host
//! application wants to log against).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A primitive value a topic name or scope can carry. Kept deliberately
/// small: topic names are identifiers, not payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{s}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// An ordered key/value map with set-like equality: two maps are equal
/// (and hash equal) when they hold the same entries, regardless of
/// insertion order. Shared representation for [`TopicName`] and
/// [`crate::scope::ScopeValues`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Attrs(pub(crate) IndexMap<String, Scalar>);

impl Attrs {
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        let mut map = IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self(map)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    pub fn extended<I, K, V>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        let mut map = self.0.clone();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self(map)
    }
}

impl PartialEq for Attrs {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Attrs {}

impl Hash for Attrs {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // IndexMap's equality is order-independent, so the hash must be
        // order-independent too: hash a sorted snapshot of the entries.
        let mut entries: Vec<(&String, &Scalar)> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.len().hash(state);
        for (k, v) in entries {
            k.hash(state);
            match v {
                Scalar::Str(s) => s.hash(state),
                Scalar::Int(i) => i.hash(state),
                Scalar::Bool(b) => b.hash(state),
            }
        }
    }
}

impl fmt::Display for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

/// Identifies a topic in the event log: an ordered, hashable mapping of
/// string keys to scalar values. Two `TopicName`s are equal iff they carry
/// the same entries regardless of order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicName(pub(crate) Attrs);

impl TopicName {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self(Attrs::from_pairs(pairs))
    }

    /// Convenience constructor for the common case of a single `base` key.
    pub fn base(name: impl Into<String>) -> Self {
        Self::new([("base", Scalar::Str(name.into()))])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    /// Returns a new `TopicName` with the given keys added. Callers are
    /// responsible for checking for collisions first.
    pub fn extended<I, K, V>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self(self.0.extended(pairs))
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sentinel substituted for the job's own name inside a
/// [`crate::trigger::StatePredicate`] that references the current job.
pub fn current_job() -> TopicName {
    TopicName::new([("__current_job__", Scalar::Bool(true))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_insertion_order() {
        let a = TopicName::new([("base", Scalar::from("j1")), ("date", Scalar::from("2024-01-01"))]);
        let b = TopicName::new([("date", Scalar::from("2024-01-01")), ("base", Scalar::from("j1"))]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_matches_equality() {
        use std::collections::HashSet;
        let a = TopicName::new([("base", Scalar::from("j1")), ("date", Scalar::from("x"))]);
        let b = TopicName::new([("date", Scalar::from("x")), ("base", Scalar::from("j1"))]);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn extended_adds_keys() {
        let base = TopicName::base("j1");
        let scoped = base.extended([("date", Scalar::from("2024-01-01"))]);
        assert_eq!(scoped.get("date"), Some(&Scalar::Str("2024-01-01".into())));
        assert_eq!(scoped.get("base"), Some(&Scalar::Str("j1".into())));
    }

    #[test]
    fn current_job_sentinel_is_stable() {
        assert_eq!(current_job(), current_job());
    }
}
