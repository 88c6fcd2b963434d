//! Symmetric compatibility tables for tag and ability-type pairings.
//!
//! Entries are stored once per unordered pair under a sorted key, so `lookup(a, b)` and
//! `lookup(b, a)` always agree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityEntry {
    pub first: String,
    pub second: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairTable {
    // lesser key -> greater key -> value
    entries: HashMap<String, HashMap<String, f64>>,
    len: usize,
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl PairTable {
    pub fn from_entries(entries: &[CompatibilityEntry]) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(&entry.first, &entry.second, entry.value);
        }
        table
    }

    fn from_static(entries: &[(&str, &str, f64)]) -> Self {
        let mut table = Self::default();
        for (a, b, value) in entries {
            table.insert(a, b, *value);
        }
        table
    }

    pub fn insert(&mut self, a: &str, b: &str, value: f64) {
        let (low, high) = ordered(a, b);
        let previous = self
            .entries
            .entry(low.to_string())
            .or_default()
            .insert(high.to_string(), value);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Order-independent lookup.
    pub fn lookup(&self, a: &str, b: &str) -> Option<f64> {
        let (low, high) = ordered(a, b);
        self.entries.get(low)?.get(high).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

const DEFAULT_TAG_COMPATIBILITY: &[(&str, &str, f64)] = &[
    ("control", "damage", 80.0),
    ("damage", "support", 75.0),
    ("control", "support", 70.0),
    ("heal", "tank", 85.0),
    ("damage", "tank", 70.0),
    ("damage", "heal", 65.0),
    ("buff", "damage", 80.0),
    ("buff", "burst", 85.0),
    ("control", "debuff", 75.0),
    ("control", "dot", 70.0),
];

const DEFAULT_ABILITY_COMPATIBILITY: &[(&str, &str, f64)] = &[
    ("active", "command", 80.0),
    ("command", "pursuit", 75.0),
    ("active", "pursuit", 70.0),
    ("active", "passive", 65.0),
    ("command", "passive", 70.0),
    ("active", "active", 60.0),
    ("passive", "pursuit", 60.0),
    ("pursuit", "pursuit", 55.0),
    ("command", "command", 50.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityTables {
    pub tags: PairTable,
    pub abilities: PairTable,
}

impl Default for CompatibilityTables {
    fn default() -> Self {
        Self {
            tags: PairTable::from_static(DEFAULT_TAG_COMPATIBILITY),
            abilities: PairTable::from_static(DEFAULT_ABILITY_COMPATIBILITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric() {
        let tables = CompatibilityTables::default();
        assert_eq!(tables.tags.lookup("control", "damage"), Some(80.0));
        assert_eq!(tables.tags.lookup("damage", "control"), Some(80.0));
        assert_eq!(tables.abilities.lookup("pursuit", "command"), Some(75.0));
        assert_eq!(tables.tags.lookup("damage", "damage"), None);
    }

    #[test]
    fn reversed_insert_overwrites_same_pair() {
        let mut table = PairTable::default();
        table.insert("b", "a", 10.0);
        table.insert("a", "b", 20.0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("b", "a"), Some(20.0));
    }
}
