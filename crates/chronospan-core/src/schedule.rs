//! Named-schedule registry with cached evaluation.
//!
//! A [`Schedule`] maps alphanumeric reference IDs to named block trees and
//! owns the evaluation cache. `REF[...]` nodes resolve against the schedule
//! passed into evaluation; the registry passes itself as that context.
//!
//! The cache sits behind a `RefCell` so read-side evaluation can stamp
//! access times. The engine is single-threaded by contract — consumers that
//! want to share a schedule across threads add their own synchronization.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::block::Block;
use crate::cache::{CacheOptions, IntervalCache};
use crate::error::{Result, SpanError};
use crate::interval::Interval;

/// A named block registered under a reference ID.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// Human-readable display name.
    pub name: String,
    /// The schedule's expression tree.
    pub block: Block,
}

/// Registry of named blocks plus the evaluation cache.
#[derive(Debug)]
pub struct Schedule {
    entries: FxHashMap<String, ScheduleEntry>,
    cache: RefCell<IntervalCache>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::with_options(CacheOptions::default())
    }

    pub fn with_options(options: CacheOptions) -> Self {
        Self {
            entries: FxHashMap::default(),
            cache: RefCell::new(IntervalCache::new(options)),
        }
    }

    /// Register a block under `id`. Rejects non-alphanumeric IDs, and
    /// rejects existing IDs when `overwrite` is false.
    pub fn set(&mut self, id: &str, name: &str, block: Block, overwrite: bool) -> Result<()> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SpanError::InvalidId { id: id.to_string() });
        }
        if !overwrite && self.entries.contains_key(id) {
            return Err(SpanError::Validation {
                message: format!("schedule id {id:?} is already registered"),
            });
        }
        self.entries.insert(
            id.to_string(),
            ScheduleEntry {
                name: name.to_string(),
                block,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ScheduleEntry> {
        self.entries.get(id)
    }

    /// Remove a registered block; returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate a registered block over `[start, end]`, consulting the
    /// cache first. The result is cached when `cache_after` is true and the
    /// interval count fits the cache's per-entry cap.
    pub fn evaluate(
        &self,
        id: &str,
        start: i64,
        end: i64,
        cache_after: bool,
    ) -> Result<Vec<Interval>> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| SpanError::reference(id, "not found in schedule"))?;
        let hash = entry.block.structural_hash();
        if let Some(hit) = self.cache.borrow_mut().get(hash, start, end) {
            return Ok(hit);
        }
        let result = entry.block.evaluate(start, end, Some(self), true)?;
        if cache_after {
            self.cache.borrow_mut().set(hash, start, end, &result);
        }
        Ok(result)
    }

    /// Whether a registered block is "on" at timestamp `t`.
    pub fn evaluate_timestamp(&self, id: &str, t: i64) -> Result<bool> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| SpanError::reference(id, "not found in schedule"))?;
        entry.block.evaluate_timestamp(t, Some(self))
    }

    /// Number of cached evaluation results.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drop all cached evaluation results.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}
