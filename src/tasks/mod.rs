//! Background Tasks Module
//!
//! Tasks that run periodically while the lookup server is up.
//!
//! # Tasks
//! - Cache sweep: removes expired pages at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
