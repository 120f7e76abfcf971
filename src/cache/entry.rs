//! Cache Entry Module
//!
//! A fetched page together with the moment it stops being served.

use std::time::Duration;

use tokio::time::Instant;

use crate::query::Fetched;

// == Cache Entry ==
/// A previously fetched page and its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored page and its degraded flag
    pub fetched: Fetched,
    /// When the entry stops being served
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now.
    pub fn new(fetched: Fetched, ttl: Duration) -> Self {
        Self {
            fetched,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
