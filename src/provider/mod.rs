//! Data Provider Module
//!
//! One async contract over interchangeable record backends.
//!
//! # Providers
//! - `FixtureProvider`: static in-memory dataset, sorted and sliced locally
//! - `RemoteProvider`: paginated list service reached over HTTP

mod fixture;
mod remote;

use async_trait::async_trait;

use crate::error::Result;
use crate::query::{Page, Query};

pub use fixture::FixtureProvider;
pub use remote::RemoteProvider;

/// A backend able to resolve a query into a page of records.
///
/// Implementations map raw rows through [`Record::from_raw`](crate::record::Record::from_raw)
/// and skip entries that fail validation instead of failing the page.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// A short name for logs, e.g. "fixture" or "remote".
    fn name(&self) -> &'static str;

    /// Returns the page addressed by the query's token and cursor.
    async fn fetch(&self, query: &Query) -> Result<Page>;
}
