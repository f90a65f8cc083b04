//! Core types for seedmap
//!
//! Holds the error taxonomy shared by every stage of the synthesis pipeline and the
//! [`ErrorContext`] used by the CLI to present failures.

pub mod error;

pub use error::{ErrorContext, MapperError, Result, user_friendly_error};
