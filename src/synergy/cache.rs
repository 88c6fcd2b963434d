//! Canonical team keys and the bounded score cache.
//!
//! The cache is admission-controlled, not LRU: when full, roughly the oldest tenth of
//! entries by insertion order is dropped before the new entry goes in. Reads never refresh
//! an entry's position.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

const KEY_SEPARATOR: char = '\u{1f}';

/// Sorted, deduplicated member names. Identical for any permutation of a team and for
/// inputs that differ only by repeated names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamKey(String);

impl TeamKey {
    pub fn from_members<S: AsRef<str>>(members: &[S]) -> Self {
        Self(canonical_members(members).join(&KEY_SEPARATOR.to_string()))
    }

    pub fn members(&self) -> Vec<&str> {
        if self.0.is_empty() {
            return Vec::new();
        }
        self.0.split(KEY_SEPARATOR).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.members().join(", "))
    }
}

/// Sort and dedupe member names; blank names are dropped.
pub fn canonical_members<S: AsRef<str>>(members: &[S]) -> Vec<String> {
    let mut names: Vec<String> = members
        .iter()
        .map(|m| m.as_ref().trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct ScoreCache {
    capacity: usize,
    entries: HashMap<TeamKey, f64>,
    insertion_order: VecDeque<TeamKey>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ScoreCache {
    /// A capacity of 0 disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, key: &TeamKey) -> Option<f64> {
        match self.entries.get(key) {
            Some(score) => {
                self.hits += 1;
                Some(*score)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: TeamKey, score: f64) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = score;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.insertion_order.push_back(key.clone());
        self.entries.insert(key, score);
    }

    fn evict_oldest(&mut self) {
        let batch = (self.capacity / 10).max(1);
        let mut removed = 0;
        while removed < batch {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                removed += 1;
            }
        }
        self.evictions += removed as u64;
        tracing::debug!(removed, remaining = self.entries.len(), "score cache evicted");
    }

    pub fn contains(&self, key: &TeamKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(names: &[&str]) -> TeamKey {
        TeamKey::from_members(names)
    }

    #[test]
    fn key_ignores_order_and_duplicates() {
        assert_eq!(key(&["B", "A", "C"]), key(&["C", "B", "A"]));
        assert_eq!(key(&["A", "A", "B"]), key(&["B", "A"]));
        assert_eq!(key(&["A", "B"]).members(), vec!["A", "B"]);
        assert!(key(&[]).members().is_empty());
    }

    #[test]
    fn evicts_oldest_tenth_by_insertion_order() {
        let mut cache = ScoreCache::with_capacity(20);
        for i in 0..20 {
            cache.insert(key(&[&format!("h{i:02}")]), i as f64);
        }
        // Reading the oldest entry must not protect it.
        assert_eq!(cache.get(&key(&["h00"])), Some(0.0));

        cache.insert(key(&["new"]), 99.0);

        assert_eq!(cache.len(), 19);
        assert!(!cache.contains(&key(&["h00"])));
        assert!(!cache.contains(&key(&["h01"])));
        assert!(cache.contains(&key(&["h02"])));
        assert!(cache.contains(&key(&["new"])));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn small_capacity_evicts_at_least_one() {
        let mut cache = ScoreCache::with_capacity(3);
        cache.insert(key(&["a"]), 1.0);
        cache.insert(key(&["b"]), 2.0);
        cache.insert(key(&["c"]), 3.0);
        cache.insert(key(&["d"]), 4.0);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key(&["a"])));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = ScoreCache::with_capacity(0);
        cache.insert(key(&["a"]), 1.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn reinsert_updates_without_growing() {
        let mut cache = ScoreCache::with_capacity(4);
        cache.insert(key(&["a"]), 1.0);
        cache.insert(key(&["a"]), 2.0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(&["a"])), Some(2.0));
    }
}
