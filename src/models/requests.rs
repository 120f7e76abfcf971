//! Request DTOs for the lookup API
//!
//! Defines the query-string parameters accepted by the search endpoint.

use serde::Deserialize;

use crate::error::Result;
use crate::query::{Cursor, Query};

/// Query string of `GET /search`
///
/// # Fields
/// - `q`: Free text matched against Spirit Code and display name (empty lists everything)
/// - `cursor`: Encoded cursor from a previous response's `next_cursor`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SearchParams {
    /// Builds the normalized query, decoding the cursor if one was sent.
    pub fn to_query(&self) -> Result<Query> {
        let cursor = match self.cursor.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => Some(Cursor::decode(encoded)?),
            _ => None,
        };
        Ok(Query::new(&self.q).with_cursor(cursor))
    }
}
