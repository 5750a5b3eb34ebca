//! Analysis of query documents for kql-lint
//!
//! The [`Analyzer`] drives a session: each document is parsed, its explicit
//! cluster and database references are resolved into the schema snapshot, and
//! an [`AnalysisEngine`] reports the names that resolve to nothing.

mod analyzer;
mod engine;
mod scope;
mod tokens;

pub use analyzer::{AnalysisResult, Analyzer};
pub use engine::{AnalysisEngine, BasicAnalyzer};
pub use scope::{Binding, Columns, Scope};
