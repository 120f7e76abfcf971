//! Query Cache Module
//!
//! Maps normalized queries to fetched pages, with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::query::{Fetched, Query};

// == Query Cache ==
/// Page cache keyed by normalized query; at most one entry per query.
///
/// Not internally synchronized: share it behind a lock.
#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<Query, CacheEntry>,
    lru: LruTracker<Query>,
    stats: CacheStats,
    max_entries: usize,
    ttl: Duration,
}

impl QueryCache {
    // == Constructor ==
    /// Creates a cache holding at most `max_entries` pages for `ttl` each.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Insert ==
    /// Stores a page, replacing any entry for the same query.
    ///
    /// When the cache is full the least recently used entry is evicted.
    pub fn insert(&mut self, query: Query, fetched: Fetched) {
        let is_overwrite = self.entries.contains_key(&query);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(token = evicted.token(), "Evicted cached page");
            }
        }

        self.entries.insert(query.clone(), CacheEntry::new(fetched, self.ttl));
        self.lru.touch(&query);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Returns the live page for a query.
    ///
    /// Expired entries are dropped and counted as misses.
    pub fn get(&mut self, query: &Query) -> Option<Fetched> {
        match self.entries.get(query) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(query);
                self.lru.remove(query);
                self.stats.set_total_entries(self.entries.len());
                self.stats.record_miss();
                None
            }
            Some(entry) => {
                let fetched = entry.fetched.clone();
                self.stats.record_hit();
                self.lru.touch(query);
                Some(fetched)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Counts a miss that joined an in-flight fetch.
    pub fn record_coalesced(&mut self) {
        self.stats.record_coalesced();
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<Query> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(query, _)| query.clone())
            .collect();

        for query in &expired {
            self.entries.remove(query);
            self.lru.remove(query);
        }

        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
