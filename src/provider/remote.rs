//! Remote Provider
//!
//! Queries a paginated list service (Graph-style `value` / `@odata.nextLink`
//! envelope) with a bearer credential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::DataProvider;
use crate::error::{LookupError, Result};
use crate::query::{Cursor, Page, Query};
use crate::record::Record;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

// == Remote Provider ==
/// Provider backed by the remote list service.
///
/// The continuation token handed back by the service is used verbatim as the
/// cursor and requested as-is for the following page.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: Client,
    endpoint: String,
    credential: String,
    page_size: usize,
    timeout: Duration,
}

impl RemoteProvider {
    /// Creates a provider over an already-configured HTTP client.
    ///
    /// # Arguments
    /// * `client` - Shared reqwest client
    /// * `endpoint` - List items URL
    /// * `credential` - Bearer token sent with every request
    pub fn new(client: Client, endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            credential: credential.into(),
            page_size: 50,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parses a continuation link, accepting only links back to the list service.
    ///
    /// Cursors can arrive from clients, and the credential is attached to
    /// whatever URL is followed.
    fn continuation_url(&self, cursor: &Cursor) -> Result<Url> {
        let base = Url::parse(&self.endpoint).map_err(|err| {
            LookupError::DataUnavailable(format!("list service endpoint is not a URL: {}", err))
        })?;
        let next = Url::parse(cursor.token()).map_err(|_| {
            LookupError::InvalidCursor(format!("'{}' is not a continuation link", cursor.token()))
        })?;

        let same_origin = next.scheme() == base.scheme()
            && next.host_str() == base.host_str()
            && next.port_or_known_default() == base.port_or_known_default();
        if !same_origin {
            warn!(cursor = cursor.token(), "Refusing continuation link to a foreign host");
            return Err(LookupError::InvalidCursor(format!(
                "'{}' does not point at the list service",
                cursor.token()
            )));
        }
        Ok(next)
    }

    async fn request(&self, query: &Query) -> Result<Vec<u8>> {
        let request = match query.cursor() {
            Some(cursor) => self.client.get(self.continuation_url(cursor)?),
            None => {
                let mut params = vec![("$top", self.page_size.to_string())];
                if !query.token().is_empty() {
                    params.push(("$search", format!("\"{}\"", query.token())));
                }
                self.client.get(&self.endpoint).query(&params)
            }
        };

        let response = request
            .bearer_auth(&self.credential)
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| classify_reqwest_error(&err, self.timeout))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DataProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[instrument(skip(self), fields(token = %query.token()))]
    async fn fetch(&self, query: &Query) -> Result<Page> {
        let body = tokio::time::timeout(self.timeout, self.request(query))
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))??;

        let payload: ListResponse = serde_json::from_slice(&body).map_err(|err| {
            LookupError::DataUnavailable(format!("unparseable list response: {}", err))
        })?;

        let mut page = Page {
            next_cursor: payload.next_link.map(Cursor::new),
            ..Page::default()
        };

        for item in &payload.value {
            // Items carry their columns under `fields`; bare objects are accepted too.
            let raw = item
                .get("fields")
                .and_then(Value::as_object)
                .or_else(|| item.as_object());
            match raw.map(Record::from_raw) {
                Some(Ok(record)) => page.records.push(record.into()),
                Some(Err(err)) => {
                    debug!("Skipping remote item: {}", err);
                    page.skipped += 1;
                }
                None => {
                    debug!("Skipping non-object remote item");
                    page.skipped += 1;
                }
            }
        }

        debug!(
            records = page.records.len(),
            skipped = page.skipped,
            has_more = page.has_more(),
            "Remote page fetched"
        );
        Ok(page)
    }
}

// == Classification ==
/// Maps a non-success HTTP status onto the failure taxonomy.
pub fn classify_status(status: StatusCode) -> LookupError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        LookupError::AuthFailure(format!("list service answered {}", status))
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        LookupError::Transient(format!("list service answered {}", status))
    } else {
        LookupError::DataUnavailable(format!("list service answered {}", status))
    }
}

/// Maps a transport error onto the failure taxonomy.
pub fn classify_reqwest_error(err: &reqwest::Error, deadline: Duration) -> LookupError {
    if err.is_timeout() {
        LookupError::Timeout(deadline)
    } else if err.is_builder() {
        LookupError::DataUnavailable(err.to_string())
    } else {
        LookupError::Transient(err.to_string())
    }
}
