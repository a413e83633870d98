//! A small cache of portal responses keyed by composite query keys.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use tracing::trace;

/// A composite key such as `["income-expense", "car-1", "2025"]`. Keys sort and compare part by
/// part, so every key sharing a prefix can be found together.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self(parts.into_iter().map(|p| p.to_string()).collect())
    }

    /// The key of a car's ledger for one year.
    pub fn ledger(car_id: &str, year: i32) -> Self {
        Self::new(["income-expense".to_string(), car_id.to_string(), year.to_string()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct QueryCache<V> {
    entries: BTreeMap<QueryKey, V>,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<V> {
        let found = self.entries.get(key).cloned();
        trace!("cache {} for {key}", if found.is_some() { "hit" } else { "miss" });
        found
    }

    pub fn put(&mut self, key: QueryKey, value: V) {
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops one entry. Returns true if it was cached.
    pub fn invalidate(&mut self, key: &QueryKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry whose key starts with `prefix`, returning how many were dropped.
    pub fn invalidate_prefix(&mut self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
