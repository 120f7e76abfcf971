//! Error types for the lookup core
//!
//! Provides the failure taxonomy shared by providers, the resilient wrapper,
//! the search controller and the HTTP surface.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ErrorResponse;

// == Error Kind ==
/// Fieldless classification of a [`LookupError`], surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedRecord,
    DataUnavailable,
    AuthFailure,
    Timeout,
    Transient,
    NotFound,
    NoMorePages,
    InvalidCursor,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::DataUnavailable => "data_unavailable",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transient => "transient",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NoMorePages => "no_more_pages",
            ErrorKind::InvalidCursor => "invalid_cursor",
        }
    }

    /// Inverse of [`ErrorKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        [
            ErrorKind::MalformedRecord,
            ErrorKind::DataUnavailable,
            ErrorKind::AuthFailure,
            ErrorKind::Timeout,
            ErrorKind::Transient,
            ErrorKind::NotFound,
            ErrorKind::NoMorePages,
            ErrorKind::InvalidCursor,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

// == Lookup Error Enum ==
/// Unified error type for the lookup core.
///
/// `Clone` so that every waiter of a coalesced fetch can receive the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Raw input could not be turned into a record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Source unusable (failed load, unparseable response)
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Credential rejected by the remote service
    #[error("Authentication rejected: {0}")]
    AuthFailure(String),

    /// No response within the per-attempt deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server-side or network failure worth retrying
    #[error("Transient failure: {0}")]
    Transient(String),

    /// No record with the requested Spirit Code
    #[error("Spirit Code '{0}' was not found")]
    NotFound(String),

    /// Next page requested while the current page is the last one
    #[error("No further pages available")]
    NoMorePages,

    /// Client-supplied cursor string could not be decoded
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

impl LookupError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::MalformedRecord(_) => ErrorKind::MalformedRecord,
            LookupError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            LookupError::AuthFailure(_) => ErrorKind::AuthFailure,
            LookupError::Timeout(_) => ErrorKind::Timeout,
            LookupError::Transient(_) => ErrorKind::Transient,
            LookupError::NotFound(_) => ErrorKind::NotFound,
            LookupError::NoMorePages => ErrorKind::NoMorePages,
            LookupError::InvalidCursor(_) => ErrorKind::InvalidCursor,
        }
    }

    /// Only timeouts and transient failures are eligible for another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Timeout(_) | LookupError::Transient(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            LookupError::MalformedRecord(_)
            | LookupError::NoMorePages
            | LookupError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            LookupError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LookupError::Transient(_) | LookupError::DataUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = ErrorResponse::new(self.to_string(), self.kind());

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the lookup core.
pub type Result<T> = std::result::Result<T, LookupError>;
