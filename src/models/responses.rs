//! Response DTOs for the lookup API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::error::ErrorKind;
use crate::query::Fetched;
use crate::record::Record;

/// Response body for `GET /search`
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub records: Vec<Arc<Record>>,
    pub has_more: bool,
    /// Pass back as `cursor` to get the following page
    pub next_cursor: Option<String>,
    /// Set when the fallback served this page; names why the primary failed
    pub degraded: Option<ErrorKind>,
    /// Entries the source returned but that failed validation
    pub skipped: usize,
}

impl From<Fetched> for SearchResponse {
    fn from(fetched: Fetched) -> Self {
        Self {
            records: fetched.page.records.clone(),
            has_more: fetched.page.has_more(),
            next_cursor: fetched.page.next_cursor.as_ref().map(|c| c.encode()),
            degraded: fetched.degraded,
            skipped: fetched.page.skipped,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Requests that joined an in-flight fetch instead of starting one
    pub coalesced: u64,
    /// Current number of cached pages
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            coalesced: stats.coalesced,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Name of the primary data source
    pub primary: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<&'static str>,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(primary: &'static str, fallback: Option<&'static str>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            primary,
            fallback,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}
