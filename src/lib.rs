//! Spirit Lookup - resilient Spirit Code search
//!
//! Searches site records by Spirit Code or name across a remote list service
//! and a local fixture, with caching, request coalescing, retries and
//! fallback, behind a debounced search controller.

pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod fixture;
pub mod models;
pub mod provider;
pub mod query;
pub mod record;
pub mod resilient;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use controller::{SearchController, SearchState};
pub use error::{ErrorKind, LookupError};
pub use query::{Cursor, Page, Query};
pub use record::{Contact, Record};
pub use resilient::{ResilientProvider, RetryPolicy};
pub use tasks::spawn_cleanup_task;
