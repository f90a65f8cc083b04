//! seedmap - mapping-document synthesis and live-reload engine
//!
//! seedmap produces the SQL-mapping documents a statement registry consumes. It
//! reads entity declarations, renders a dialect template per mapped interface,
//! merges hand-written mapper fragments into the result, loads everything into
//! a live registry and keeps that registry in sync with the fragment files
//! without a restart.
//!
//! # Pipeline
//!
//! ```text
//! model ──▶ metadata ──▶ templating ──▶ merge ──▶ document ──▶ registry
//!                                         ▲                      ▲
//!                                  fragment files ◀── reload ─────┘
//! ```
//!
//! 1. [`metadata`] extracts an immutable `EntityMetadata` per mapper from the
//!    [`model`] declarations and the [`config`].
//! 2. [`templating`] renders the dialect template (Tera) into a document body.
//! 3. [`merge`] injects the fragments that belong to the mapper, by exact
//!    filename first and namespace second, each fragment at most once.
//! 4. [`document`] assembles the ordered document set: generated documents,
//!    unclaimed fragments, then the shared fragment.
//! 5. [`registry`] loads the set into an immutable, versioned state published
//!    through an atomic pointer swap.
//! 6. [`reload`] polls the fragment directories and republishes on change.
//!
//! [`runtime::SeedMapper`] ties the steps together.
//!
//! # Configuration (seedmap.toml)
//!
//! ```toml
//! model = "model.toml"
//! base_packages = ["demo"]
//! mapper_locations = ["mapper/**/*.xml"]
//! dialect = "mysql"
//! ignore_update_columns = ["gmt_create"]
//!
//! [templates]
//! dir = "templates"
//!
//! [hot_reload]
//! enabled = true
//! debounce_ms = 300
//!
//! [[fills]]
//! handler = "gmtModified"
//! column = "gmt_modified"
//! phase = "insert_and_update"
//! supplier = "timestamp"
//! ```
//!
//! # Declarations (model.toml)
//!
//! ```toml
//! [[entities]]
//! name = "Order"
//! table = { name = "t_order" }
//! fields = [
//!     { name = "id", type = "Long" },
//!     { name = "amount", type = "BigDecimal" },
//! ]
//!
//! [[mappers]]
//! namespace = "demo.OrderMapper"
//! entity = "Order"
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod document;
pub mod fragment;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod pattern;
pub mod registry;
pub mod reload;
pub mod runtime;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
