//! Cache Expiry Sweep
//!
//! Background task that periodically drops expired pages from the query cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::QueryCache;

/// Spawns a background task that removes expired cache entries every
/// `cleanup_interval_secs` seconds.
///
/// Expired entries are already ignored on read; the sweep only keeps stale
/// pages from holding memory until their query is asked again.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(
    cache: Arc<RwLock<QueryCache>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.write().await.cleanup_expired();

            if removed > 0 {
                info!("Cache sweep: removed {} expired pages", removed);
            } else {
                debug!("Cache sweep: no expired pages found");
            }
        }
    })
}
