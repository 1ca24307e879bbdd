//! Fluent, deferred query builder for document stores.
//!
//! Chained calls queue steps; a terminal call (`find`, `remove`, `update`,
//! `insert`) runs them in order against a [`store::Driver`], hands the result
//! back, and closes the connection.

pub mod builder;
pub mod config;
pub mod errors;
pub mod filter;
pub mod logger;
pub mod pipeline;
pub mod store;
pub mod typed;

pub use builder::Builder;
pub use errors::{ConfigError, PipelineError, StoreError};
pub use filter::{CompareOp, UpdateOptions};
pub use store::{DeleteReport, InsertReport, UpdateReport};

use std::sync::Arc;

/// Starts a chain against `driver`.
#[must_use]
pub fn builder(driver: Arc<dyn store::Driver>) -> Builder {
    Builder::new(driver)
}

/// Initializes logging from the environment; see [`logger::configure_from_env`].
///
/// # Errors
/// Returns an error if a logger is already installed or the log directory
/// cannot be created.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()
}
