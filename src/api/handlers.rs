//! API Handlers
//!
//! HTTP request handlers for each lookup endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::cache::QueryCache;
use crate::config::{Config, DataSource};
use crate::controller::{SearchController, SearchState};
use crate::error::Result;
use crate::models::{HealthResponse, SearchParams, SearchResponse, StatsResponse};
use crate::provider::{DataProvider, FixtureProvider, RemoteProvider};
use crate::record::Record;
use crate::resilient::ResilientProvider;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cached, retrying front over the configured sources
    pub provider: ResilientProvider,
    /// Quiet period for interactive search sessions
    pub debounce: Duration,
}

impl AppState {
    pub fn new(provider: ResilientProvider, debounce: Duration) -> Self {
        Self { provider, debounce }
    }

    /// Opens a debounced search session over the shared provider and cache.
    pub fn search_session(&self) -> (SearchController, mpsc::UnboundedReceiver<SearchState>) {
        SearchController::new(self.provider.clone(), self.debounce)
    }

    /// Builds the providers and cache described by the configuration.
    ///
    /// The fixture is always loaded: it is the primary in fixture mode and
    /// the fallback in remote mode. A fixture that fails to load leaves the
    /// server running with an unavailable dataset.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fixture: Arc<dyn DataProvider> =
            Arc::new(FixtureProvider::load(&config.fixture_path, config.page_size));

        let (primary, fallback) = match config.data_source {
            DataSource::Fixture => (fixture, None),
            DataSource::Remote => {
                let endpoint = config
                    .remote_endpoint
                    .clone()
                    .context("DATA_SOURCE=remote requires REMOTE_ENDPOINT")?;
                let token = config
                    .remote_token
                    .clone()
                    .context("DATA_SOURCE=remote requires REMOTE_TOKEN")?;
                let client = reqwest::Client::builder()
                    .build()
                    .context("Failed to build HTTP client")?;
                info!("Remote source: {}", endpoint);

                let remote = RemoteProvider::new(client, endpoint, token)
                    .with_page_size(config.page_size)
                    .with_timeout(config.remote_timeout);
                (Arc::new(remote) as Arc<dyn DataProvider>, Some(fixture))
            }
        };

        let cache = Arc::new(RwLock::new(QueryCache::new(
            config.cache_max_entries,
            config.cache_ttl,
        )));
        Ok(Self::new(
            ResilientProvider::new(primary, fallback, cache, config.retry),
            config.debounce,
        ))
    }
}

/// Handler for GET /search
///
/// Returns one page of matches; pass `next_cursor` back as `cursor` for the next.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params.to_query()?;
    let fetched = state.provider.fetch(&query).await?;
    Ok(Json(SearchResponse::from(fetched)))
}

/// Handler for GET /records/:code
pub async fn record_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Arc<Record>>> {
    let record = state.provider.lookup(&code).await?;
    Ok(Json(record))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.provider.stats().await))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (primary, fallback) = state.provider.source_names();
    Json(HealthResponse::healthy(primary, fallback))
}
