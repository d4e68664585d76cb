//! Evaluation-result cache keyed by block hash and domain.
//!
//! Entries map `(structural hash, domain start, domain end)` to the interval
//! list that evaluation produced. Lookups first try the exact key, then any
//! entry for the same block whose stored domain covers the requested one —
//! the covered subset is extracted by clipping each stored interval. Inserts
//! drop entries the new domain strictly covers and evict the least recently
//! used entry once the cache is at capacity.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::interval::{self, Interval};

/// Sizing knobs for [`IntervalCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Maximum number of cached results before LRU eviction.
    pub max_size: usize,
    /// Results with more intervals than this are returned but never stored.
    pub max_ranges_per_entry: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_ranges_per_entry: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    hash: u64,
    start: i64,
    end: i64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    intervals: Vec<Interval>,
    last_accessed: u64,
}

/// Bounded cache of evaluation results with LRU eviction.
#[derive(Debug)]
pub struct IntervalCache {
    entries: FxHashMap<CacheKey, CacheEntry>,
    options: CacheOptions,
    clock: u64,
}

impl IntervalCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: FxHashMap::default(),
            options,
            clock: 0,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up a result for `(hash, start, end)`: exact key first, then
    /// best-effort extraction from any wider entry for the same block.
    pub(crate) fn get(&mut self, hash: u64, start: i64, end: i64) -> Option<Vec<Interval>> {
        self.clock += 1;
        let key = CacheKey { hash, start, end };
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_accessed = self.clock;
            return Some(entry.intervals.clone());
        }
        let (_, entry) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.hash == hash && k.start <= start && k.end >= end)?;
        entry.last_accessed = self.clock;
        // Results from a merge-off block can hold nested intervals, so the
        // extraction must not binary-search.
        Some(interval::clip_all(&entry.intervals, start, end))
    }

    /// Store a result, unless it exceeds `max_ranges_per_entry`.
    pub(crate) fn set(&mut self, hash: u64, start: i64, end: i64, intervals: &[Interval]) {
        if intervals.len() > self.options.max_ranges_per_entry {
            return;
        }
        // The new entry answers every lookup a strictly-covered entry for
        // the same block could answer.
        self.entries
            .retain(|k, _| k.hash != hash || k.start < start || k.end > end);
        let key = CacheKey { hash, start, end };
        if !self.entries.contains_key(&key) && self.entries.len() >= self.options.max_size {
            self.evict_lru();
        }
        self.clock += 1;
        self.entries.insert(
            key,
            CacheEntry {
                intervals: intervals.to_vec(),
                last_accessed: self.clock,
            },
        );
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| *key)
        {
            self.entries.remove(&key);
        }
    }
}
