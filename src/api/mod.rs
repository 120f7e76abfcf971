//! API Module
//!
//! HTTP handlers and routing for the lookup REST API.
//!
//! # Endpoints
//! - `GET /search` - Search records by Spirit Code or name, one page at a time
//! - `GET /records/:code` - Fetch a single record
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
