//! Per-type tallies and id indices, updated once per inserted instance.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Key;

/// Type tag -> number of instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTally(BTreeMap<String, usize>);

impl TypeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, tag: &str) {
        *self.0.entry(tag.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, tag: &str) -> usize {
        self.0.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag) > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type tag -> ids in insertion order. Flat-list entries record their
/// position as the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeIndex(BTreeMap<String, Vec<Key>>);

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: &str, key: Key) {
        self.0.entry(tag.to_string()).or_default().push(key);
    }

    /// Replace the ids recorded for `tag`.
    pub(crate) fn replace(&mut self, tag: &str, keys: Vec<Key>) {
        self.0.insert(tag.to_string(), keys);
    }

    pub fn get(&self, tag: &str) -> &[Key] {
        self.0.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Key])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keeps_insertion_order() {
        let mut index = TypeIndex::new();
        for id in [30, 10, 20] {
            index.push("GRID", Key::Id(id));
        }
        assert_eq!(index.get("GRID"), &[Key::Id(30), Key::Id(10), Key::Id(20)]);
        assert!(index.get("CQUAD4").is_empty());
    }

    #[test]
    fn tally_counts_per_tag() {
        let mut tally = TypeTally::new();
        tally.increment("SPC1");
        tally.increment("SPC1");
        tally.increment("SPC");
        assert_eq!(tally.get("SPC1"), 2);
        assert_eq!(tally.total(), 3);
        assert!(!tally.contains("MPC"));
    }
}
