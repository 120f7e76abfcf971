//! Request and Response models for the lookup API
//!
//! DTOs used for deserializing query strings and serializing JSON bodies.

pub mod requests;
pub mod responses;

pub use requests::SearchParams;
pub use responses::{ErrorResponse, HealthResponse, SearchResponse, StatsResponse};
