//! Fixture Provider
//!
//! Serves records from a read-only dataset loaded once at startup.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::DataProvider;
use crate::error::{LookupError, Result};
use crate::fixture::load_fixture;
use crate::query::{Cursor, Page, Query};
use crate::record::{RawRecord, Record};

// == Fixture Provider ==
/// In-memory provider over a static dataset.
///
/// Records are validated, de-duplicated by Spirit Code and sorted once at
/// construction; `fetch` only filters and slices.
#[derive(Debug)]
pub struct FixtureProvider {
    /// Sorted records, or the reason the dataset could not be loaded
    dataset: std::result::Result<Vec<Arc<Record>>, String>,
    page_size: usize,
    /// Raw entries rejected while building the dataset
    skipped: usize,
}

impl FixtureProvider {
    // == Constructors ==
    /// Builds the provider from already-parsed raw rows.
    pub fn new(raw: Vec<RawRecord>, page_size: usize) -> Self {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(raw.len());
        let mut skipped = 0;

        for row in &raw {
            match Record::from_raw(row) {
                Ok(record) if seen.insert(record.key().to_string()) => {
                    records.push(Arc::new(record));
                }
                Ok(record) => {
                    warn!("Duplicate Spirit Code '{}' in fixture, keeping first", record.spirit_code());
                    skipped += 1;
                }
                Err(err) => {
                    debug!("Skipping fixture row: {}", err);
                    skipped += 1;
                }
            }
        }

        records.sort_by(|a, b| {
            a.key()
                .cmp(b.key())
                .then_with(|| a.display_name().cmp(b.display_name()))
        });

        Self {
            dataset: Ok(records),
            page_size: page_size.max(1),
            skipped,
        }
    }

    /// Builds a provider whose dataset failed to load; every fetch fails.
    pub fn unavailable(reason: impl Into<String>, page_size: usize) -> Self {
        Self {
            dataset: Err(reason.into()),
            page_size: page_size.max(1),
            skipped: 0,
        }
    }

    /// Loads the dataset from a fixture file, degrading to the unavailable
    /// state when the file cannot be read.
    pub fn load(path: &Path, page_size: usize) -> Self {
        match load_fixture(path) {
            Ok(raw) => {
                let provider = Self::new(raw, page_size);
                if provider.is_empty() {
                    warn!("Fixture {} holds no valid records", path.display());
                } else {
                    info!(
                        "Loaded {} records from {} ({} skipped)",
                        provider.len(),
                        path.display(),
                        provider.skipped()
                    );
                }
                provider
            }
            Err(err) => {
                warn!("Fixture {} unavailable: {}", path.display(), err);
                Self::unavailable(err.to_string(), page_size)
            }
        }
    }

    // == Introspection ==
    /// Number of valid records, zero when unavailable.
    pub fn len(&self) -> usize {
        self.dataset.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    // == Matching ==
    /// Returns every record matching the normalized token, in dataset order.
    ///
    /// An empty token matches everything; otherwise the token must occur in
    /// the Spirit Code or the display name, ignoring case.
    pub fn matches(&self, token: &str) -> Result<Vec<Arc<Record>>> {
        let records = self.records()?;
        if token.is_empty() {
            return Ok(records.to_vec());
        }
        Ok(records
            .iter()
            .filter(|record| {
                record.key().contains(token)
                    || record.display_name().to_lowercase().contains(token)
            })
            .cloned()
            .collect())
    }

    fn records(&self) -> Result<&[Arc<Record>]> {
        self.dataset
            .as_deref()
            .map_err(|reason| LookupError::DataUnavailable(reason.clone()))
    }
}

#[async_trait]
impl DataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch(&self, query: &Query) -> Result<Page> {
        let matches = self.matches(query.token())?;

        let offset = match query.cursor() {
            Some(cursor) => cursor.token().parse::<usize>().map_err(|_| {
                LookupError::InvalidCursor(format!(
                    "cursor '{}' is not a fixture offset",
                    cursor.token()
                ))
            })?,
            None => 0,
        };

        let start = offset.min(matches.len());
        let end = (start + self.page_size).min(matches.len());
        let next_cursor = (end < matches.len()).then(|| Cursor::new(end.to_string()));

        Ok(Page {
            records: matches[start..end].to_vec(),
            next_cursor,
            skipped: 0,
        })
    }
}
