//! Diagnostics for kql-lint
//!
//! This crate provides the reporting vocabulary shared by the query front end,
//! the schema loaders and the analysis engine: error codes, source locations,
//! and diagnostics with their severities.

mod diagnostic;
mod error_code;
mod span;

pub use diagnostic::*;
pub use error_code::*;
pub use span::*;
