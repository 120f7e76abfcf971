//! Resilient Provider
//!
//! The single entry point for searches: a cached, de-duplicated, retrying
//! front over a primary provider with an optional fallback provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, QueryCache};
use crate::error::{ErrorKind, LookupError, Result};
use crate::provider::DataProvider;
use crate::query::{Cursor, Fetched, Origin, Page, Query};
use crate::record::Record;

// == Retry Policy ==
/// Exponential backoff for retryable primary failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per query, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Random extra delay, as a fraction of the computed delay
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Base delay doubled per attempt, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Adds up to `jitter * delay` of random delay.
    pub fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = delay.mul_f64(self.jitter.min(1.0));
        delay + spread.mul_f64(rand::random::<f64>())
    }
}

/// Outcome slot shared between the task running a fetch and its waiters.
type Outcome = watch::Receiver<Option<Result<Fetched>>>;

struct Inner {
    primary: Arc<dyn DataProvider>,
    fallback: Option<Arc<dyn DataProvider>>,
    cache: Arc<RwLock<QueryCache>>,
    in_flight: Mutex<HashMap<Query, Outcome>>,
    retry: RetryPolicy,
}

// == Resilient Provider ==
/// Cache, coalescing, retry and fallback in front of the providers.
///
/// Cloning is cheap and clones share the cache and the in-flight map.
#[derive(Clone)]
pub struct ResilientProvider {
    inner: Arc<Inner>,
}

impl ResilientProvider {
    // == Constructor ==
    /// # Arguments
    /// * `primary` - Provider tried first, with retries
    /// * `fallback` - Provider used when the primary fails, if any
    /// * `cache` - Shared page cache
    /// * `retry` - Retry/backoff for the primary
    pub fn new(
        primary: Arc<dyn DataProvider>,
        fallback: Option<Arc<dyn DataProvider>>,
        cache: Arc<RwLock<QueryCache>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                primary,
                fallback,
                cache,
                in_flight: Mutex::new(HashMap::new()),
                retry,
            }),
        }
    }

    /// Shared handle to the page cache.
    pub fn cache(&self) -> Arc<RwLock<QueryCache>> {
        self.inner.cache.clone()
    }

    /// Names of the primary and, when configured, the fallback provider.
    pub fn source_names(&self) -> (&'static str, Option<&'static str>) {
        (
            self.inner.primary.name(),
            self.inner.fallback.as_ref().map(|f| f.name()),
        )
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.cache.read().await.stats()
    }

    // == Fetch ==
    /// Resolves a query to a page.
    ///
    /// A live cache entry is returned without touching a provider. Concurrent
    /// misses for the same query share one underlying fetch and all observe
    /// the same page or error. The fetch runs in its own task, so a caller
    /// that stops waiting does not abort it for the others.
    pub async fn fetch(&self, query: &Query) -> Result<Fetched> {
        if let Some(hit) = self.inner.cache.write().await.get(query) {
            debug!(token = query.token(), "Cache hit");
            return Ok(hit);
        }

        let mut outcome = {
            let mut in_flight = self.inner.in_flight.lock().await;
            if let Some(existing) = in_flight.get(query) {
                self.inner.cache.write().await.record_coalesced();
                debug!(token = query.token(), "Joining in-flight fetch");
                existing.clone()
            } else if let Some(hit) = self.inner.cache.write().await.get(query) {
                // The previous fetch finished between the first check and taking the lock
                return Ok(hit);
            } else {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(query.clone(), rx.clone());
                self.spawn_fetch(query.clone(), tx);
                rx
            }
        };

        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());
        match settled {
            Ok(Some(result)) => result,
            _ => {
                self.forget_abandoned(query).await;
                Err(LookupError::DataUnavailable("fetch task ended without a result".into()))
            }
        }
    }

    /// Drops the in-flight entry of a fetch task that died without sending,
    /// so the next caller starts a fresh fetch.
    async fn forget_abandoned(&self, query: &Query) {
        let mut in_flight = self.inner.in_flight.lock().await;
        if in_flight
            .get(query)
            .is_some_and(|outcome| outcome.has_changed().is_err())
        {
            warn!(token = query.token(), "Fetch task ended without a result");
            in_flight.remove(query);
        }
    }

    fn spawn_fetch(&self, query: Query, tx: watch::Sender<Option<Result<Fetched>>>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = inner.resolve(&query).await;
            if let Ok(fetched) = &result {
                inner.cache.write().await.insert(query.clone(), fetched.clone());
            }
            inner.in_flight.lock().await.remove(&query);
            // No receivers left is fine: the page is cached for the next caller
            let _ = tx.send(Some(result));
        });
    }

    // == Lookup ==
    /// Finds one record by exact Spirit Code, following pages until found.
    pub async fn lookup(&self, code: &str) -> Result<Arc<Record>> {
        let mut query = Query::new(code);
        loop {
            let fetched = self.fetch(&query).await?;
            if let Some(record) = fetched.page.records.iter().find(|r| r.has_code(code)) {
                return Ok(record.clone());
            }
            match &fetched.page.next_cursor {
                Some(cursor) => query = Query::new(code).with_cursor(Some(cursor.clone())),
                None => return Err(LookupError::NotFound(code.trim().to_string())),
            }
        }
    }
}

impl Inner {
    /// Primary with retries, then fallback; no cache involvement.
    async fn resolve(&self, query: &Query) -> Result<Fetched> {
        if let Some(Origin::Fallback(reason)) = query.cursor().map(|c| c.origin()) {
            return self.from_fallback(query, reason).await;
        }

        match self.from_primary(query).await {
            Ok(mut page) => {
                let served = query.cursor().map_or(0, Cursor::served) + page.records.len();
                page.next_cursor = page.next_cursor.map(|cursor| cursor.with_served(served));
                Ok(Fetched {
                    page: Arc::new(page),
                    degraded: None,
                })
            }
            // A refused cursor is the caller's mistake, not an outage
            Err(err @ LookupError::InvalidCursor(_)) => Err(err),
            Err(err) if self.fallback.is_none() => Err(err),
            Err(err) => {
                warn!(
                    token = query.token(),
                    "{} failed ({}), serving from fallback",
                    self.primary.name(),
                    err
                );
                let reason = err.kind();
                match query.cursor() {
                    None => self.from_fallback(query, reason).await,
                    // Continue the listing on the fallback after the records already served
                    Some(cursor) => {
                        let offset = Cursor::new(cursor.served().to_string())
                            .with_origin(Origin::Fallback(reason));
                        let resumed = Query::new(query.token()).with_cursor(Some(offset));
                        self.from_fallback(&resumed, reason).await
                    }
                }
            }
        }
    }

    async fn from_primary(&self, query: &Query) -> Result<Page> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.primary.fetch(query).await {
                Ok(page) => {
                    if page.skipped > 0 {
                        warn!("{} skipped {} malformed entries", self.primary.name(), page.skipped);
                    }
                    return Ok(page);
                }
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.retry.jittered(self.retry.delay_for_attempt(attempt));
                    debug!(attempt, ?delay, "Retrying {} after: {}", self.primary.name(), err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn from_fallback(&self, query: &Query, reason: ErrorKind) -> Result<Fetched> {
        let fallback = self.fallback.as_ref().ok_or_else(|| {
            LookupError::DataUnavailable("no fallback source configured".to_string())
        })?;

        let mut page = fallback.fetch(query).await.map_err(|err| {
            warn!(token = query.token(), "Fallback {} failed too: {}", fallback.name(), err);
            err
        })?;
        page.next_cursor = page
            .next_cursor
            .map(|cursor| cursor.with_origin(Origin::Fallback(reason)));

        info!(
            token = query.token(),
            records = page.records.len(),
            ?reason,
            "Served degraded page from {}",
            fallback.name()
        );
        Ok(Fetched {
            page: Arc::new(page),
            degraded: Some(reason),
        })
    }
}
