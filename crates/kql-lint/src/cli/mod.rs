//! Command-line front end
//!
//! - `options`: command line parsing
//! - `runner`: loader selection, cache maintenance and analysis of each input
//! - `file_patterns`: glob expansion of input paths
//! - `output`: terminal colors

pub mod file_patterns;
pub mod options;
pub mod output;
pub mod runner;

pub use options::{ColorChoice, Options};
pub use runner::Runner;
