//! Query and Page types
//!
//! Value types flowing between the controller, the resilient wrapper and
//! the providers.

use std::sync::Arc;

use crate::error::{ErrorKind, LookupError, Result};
use crate::record::Record;

// == Origin ==
/// Which backend minted a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Origin {
    #[default]
    Primary,
    /// Minted by the fallback after the primary failed with this kind
    Fallback(ErrorKind),
}

// == Cursor ==
/// Opaque continuation token.
///
/// Providers fill in the token. The resilient wrapper stamps the origin, so a
/// degraded listing keeps paging through the source that produced it, and the
/// number of records served before the page, so a listing can resume on the
/// fallback when the primary fails mid-way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    token: String,
    origin: Origin,
    served: usize,
}

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            origin: Origin::Primary,
            served: 0,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Records listed before the page this cursor addresses.
    pub fn served(&self) -> usize {
        self.served
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub(crate) fn with_served(mut self, served: usize) -> Self {
        self.served = served;
        self
    }

    /// Serializes the cursor for transports that can only carry a string.
    pub fn encode(&self) -> String {
        match self.origin {
            Origin::Primary => format!("p.{}:{}", self.served, self.token),
            Origin::Fallback(reason) => format!("f.{}:{}", reason.as_str(), self.token),
        }
    }

    /// Parses a string produced by [`Cursor::encode`].
    pub fn decode(encoded: &str) -> Result<Self> {
        let unrecognised =
            || LookupError::InvalidCursor(format!("unrecognised cursor '{}'", encoded));

        let (tag, token) = encoded.split_once(':').ok_or_else(unrecognised)?;
        let cursor = if let Some(served) = tag.strip_prefix("p.") {
            let served = served.parse().map_err(|_| unrecognised())?;
            Self::new(token).with_served(served)
        } else if let Some(reason) = tag.strip_prefix("f.") {
            let reason = ErrorKind::parse(reason).ok_or_else(unrecognised)?;
            Self::new(token).with_origin(Origin::Fallback(reason))
        } else {
            return Err(unrecognised());
        };
        Ok(cursor)
    }
}

// == Query ==
/// One search request: a normalized token plus an optional cursor.
///
/// Equal token and cursor means equal query, which is what the cache keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    token: String,
    cursor: Option<Cursor>,
}

impl Query {
    /// Builds a first-page query, trimming and case-folding the text.
    pub fn new(text: &str) -> Self {
        Self {
            token: normalize(text),
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

/// Trims and case-folds user input.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

// == Page ==
/// An ordered slice of results plus the cursor for the next slice.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Arc<Record>>,
    /// Cursor for the following page; `None` on the last page
    pub next_cursor: Option<Cursor>,
    /// Raw entries dropped because they failed record validation
    pub skipped: usize,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// == Fetched ==
/// A page as returned by the resilient wrapper.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub page: Arc<Page>,
    /// Set when the fallback served the page; carries why the primary failed
    pub degraded: Option<ErrorKind>,
}
