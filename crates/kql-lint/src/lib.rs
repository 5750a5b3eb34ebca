//! Schema-aware linting for Kusto queries
//!
//! This crate ties the kql-lint pieces together:
//! - Query documents and their cluster/database references
//! - Schema symbols loaded from a cluster, a local cache, or both
//! - Lazy resolution of the schema a query references
//! - Name binding diagnostics
//!
//! # Example
//!
//! ```ignore
//! use kql_lint::{Analyzer, GlobalState, LoadOptions};
//!
//! let mut analyzer = Analyzer::new(GlobalState::new());
//! let result = analyzer.analyze("print x=10 | where y > 0", &LoadOptions::new()).await?;
//! assert!(!result.success);
//! ```

// Re-export all public APIs from internal crates
pub use kql_lint_analyzer as analyzer;
pub use kql_lint_diagnostics as diagnostics;
pub use kql_lint_parser as parser;
pub use kql_lint_schema as schema;
pub use kql_lint_symbols as symbols;

// Convenience re-exports
pub use kql_lint_analyzer::{AnalysisEngine, AnalysisResult, Analyzer, BasicAnalyzer};
pub use kql_lint_diagnostics::{Diagnostic, DiagnosticFilter, ErrorCode, Severity};
pub use kql_lint_parser::QueryDocument;
pub use kql_lint_schema::{
    CachedSymbolLoader, FileSymbolLoader, LoadOptions, RemoteSymbolLoader, SchemaError,
    SymbolLoader, SymbolResolver,
};
pub use kql_lint_symbols::GlobalState;

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
