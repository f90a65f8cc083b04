//! Integration test suite for seedmap
//!
//! End-to-end tests that run the full pipeline against scratch projects on
//! disk.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **merge_properties**: at-most-once merging, filename priority, pass-through
//!   of unclaimed fragments, render idempotence
//! - **end_to_end**: the `Order` scenario with a custom template
//! - **hot_reload**: live replacement of statements and failed reloads
//! - **cli**: the `seedmap` binary

mod cli;
mod end_to_end;
mod hot_reload;
mod merge_properties;
