//! Schema symbols for kql-lint
//!
//! This crate provides the immutable schema model handed to the analysis engine:
//! - Scalar types and the mapping from remote column type names
//! - Column, table, function, database and cluster symbols
//! - Schema text parsing and rendering (`(Name: string, Count: long)`)
//! - `GlobalState`, the immutable snapshot threaded through schema resolution

mod error;
mod global_state;
mod scalar;
mod schema_text;
mod symbols;

pub use error::*;
pub use global_state::*;
pub use scalar::*;
pub use schema_text::*;
pub use symbols::*;

/// Result type for symbol operations
pub type Result<T> = std::result::Result<T, SymbolError>;

/// Case-folded key used for every case-insensitive name lookup
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}
