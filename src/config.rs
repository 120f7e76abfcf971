//! Configuration Module
//!
//! Loads lookup configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::resilient::RetryPolicy;

// == Data Source ==
/// Which backend serves as primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Fixture,
    Remote,
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixture" => Ok(DataSource::Fixture),
            // "sharepoint" is what older deployments set
            "remote" | "sharepoint" => Ok(DataSource::Remote),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Lookup configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary data source
    pub data_source: DataSource,
    /// Local fixture used offline and as fallback
    pub fixture_path: PathBuf,
    /// Remote list service items URL
    pub remote_endpoint: Option<String>,
    /// Bearer credential for the remote service
    pub remote_token: Option<String>,
    /// Per-attempt deadline for remote requests
    pub remote_timeout: Duration,
    /// Records per page
    pub page_size: usize,
    /// Quiet period before a typed query is fetched
    pub debounce: Duration,
    /// How long a fetched page is served from cache
    pub cache_ttl: Duration,
    /// Maximum number of cached pages
    pub cache_max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Retry and backoff for the primary source
    pub retry: RetryPolicy,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATA_SOURCE` - `fixture` or `remote` (default: fixture)
    /// - `SPIRIT_FIXTURE_PATH` - Fixture file (default: data/spirit_fixture.json)
    /// - `REMOTE_ENDPOINT`, `REMOTE_TOKEN` - Remote list service and credential
    /// - `REMOTE_TIMEOUT_MS` - Per-attempt deadline (default: 10000)
    /// - `SPIRIT_PAGE_SIZE` - Page size (default: 50)
    /// - `SPIRIT_DEBOUNCE_MS` - Debounce (default: 250)
    /// - `CACHE_TTL_SECS` - Cache TTL (default: 60)
    /// - `CACHE_MAX_ENTRIES` - Cache capacity (default: 256)
    /// - `CLEANUP_INTERVAL` - Expiry sweep in seconds (default: 30)
    /// - `RETRY_MAX_ATTEMPTS` - Attempts per query (default: 3)
    /// - `RETRY_BASE_DELAY_MS`, `RETRY_MAX_DELAY_MS` - Backoff (default: 200, 2000)
    /// - `RETRY_JITTER` - Jitter fraction of each delay (default: 0.2)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_retry = defaults.retry;

        Self {
            data_source: env_or("DATA_SOURCE", defaults.data_source),
            fixture_path: env::var("SPIRIT_FIXTURE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.fixture_path),
            remote_endpoint: env::var("REMOTE_ENDPOINT").ok().filter(|v| !v.is_empty()),
            remote_token: env::var("REMOTE_TOKEN").ok().filter(|v| !v.is_empty()),
            remote_timeout: Duration::from_millis(env_or("REMOTE_TIMEOUT_MS", 10_000)),
            page_size: env_or("SPIRIT_PAGE_SIZE", defaults.page_size),
            debounce: Duration::from_millis(env_or("SPIRIT_DEBOUNCE_MS", 250)),
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", 60)),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            retry: RetryPolicy {
                max_attempts: env_or("RETRY_MAX_ATTEMPTS", default_retry.max_attempts),
                base_delay: Duration::from_millis(env_or("RETRY_BASE_DELAY_MS", 200)),
                max_delay: Duration::from_millis(env_or("RETRY_MAX_DELAY_MS", 2_000)),
                jitter: env_or("RETRY_JITTER", default_retry.jitter),
            },
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }
}

/// Parses an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DataSource::Fixture,
            fixture_path: PathBuf::from("data/spirit_fixture.json"),
            remote_endpoint: None,
            remote_token: None,
            remote_timeout: Duration::from_secs(10),
            page_size: 50,
            debounce: Duration::from_millis(250),
            cache_ttl: Duration::from_secs(60),
            cache_max_entries: 256,
            cleanup_interval: 30,
            retry: RetryPolicy::default(),
            server_port: 3000,
        }
    }
}
