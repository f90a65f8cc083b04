//! Test utilities for seedmap
//!
//! Helpers shared by unit and integration tests: scratch projects on disk,
//! sample declarations and fragments, and once-only logging setup.
//!
//! # Example
//!
//! ```rust,no_run
//! use seedmap::test_utils::TestProject;
//!
//! let project = TestProject::order().unwrap();
//! let documents = project.load().unwrap().build().unwrap();
//! assert!(documents.document("demo.OrderMapper").is_some());
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestProject;
pub use fixtures::{CRUD_TEMPLATE, ORDER_MODEL, mapper_fragment, order_fragment};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, else `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=seedmap=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
