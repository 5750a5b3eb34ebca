//! Command line options

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use kql_lint_diagnostics::DiagnosticFilter;
use std::path::PathBuf;

/// Environment variable overriding the schema cache directory
pub const CACHE_DIR_ENV: &str = "KQL_LINT_CACHE_DIR";

/// Color output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Lint Kusto queries against cluster schema
#[derive(Debug, Clone, Parser)]
#[command(name = "kql-lint")]
#[command(author, version, about = "Lint Kusto queries against cluster schema", long_about = None)]
pub struct Options {
    /// Connection string of the cluster that supplies schema
    #[arg(short, long)]
    pub connection: Option<String>,

    /// Default cluster for unqualified references
    #[arg(long)]
    pub cluster: Option<String>,

    /// Default database for unqualified references
    #[arg(short, long)]
    pub database: Option<String>,

    /// Directory of the local schema cache
    #[arg(long, env = CACHE_DIR_ENV, value_name = "DIR")]
    pub cache: Option<String>,

    /// Load schema from the cluster only, never from the local cache
    #[arg(long)]
    pub no_cache: bool,

    /// Cache the schema of every database on the connection's cluster
    #[arg(long)]
    pub generate: bool,

    /// Delete the local schema cache
    #[arg(long)]
    pub delete: bool,

    /// Diagnostics to ignore: an error code (KQL0100), a severity or a category
    #[arg(long, value_name = "CODE|SEVERITY|CATEGORY")]
    pub ignore: Vec<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Query files to analyse; `*`, `?` and `**` patterns are expanded
    #[arg(value_name = "FILES")]
    pub patterns: Vec<String>,
}

impl Options {
    /// The cache directory, defaulting to `<data dir>/kql-lint/schemas`
    pub fn cache_path(&self) -> String {
        match self.cache.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(path) => path.to_string(),
            None => default_cache_path().to_string_lossy().into_owned(),
        }
    }

    pub fn connection(&self) -> Option<&str> {
        non_empty(&self.connection)
    }

    pub fn default_cluster(&self) -> Option<&str> {
        non_empty(&self.cluster)
    }

    pub fn default_database(&self) -> Option<&str> {
        non_empty(&self.database)
    }

    /// Build the diagnostic filter from `--ignore` entries
    pub fn diagnostic_filter(&self) -> Result<DiagnosticFilter> {
        let mut filter = DiagnosticFilter::new();
        for entry in &self.ignore {
            if !filter.ignore(entry.trim()) {
                bail!("unrecognized --ignore entry '{}'", entry);
            }
        }
        Ok(filter)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kql-lint")
        .join("schemas")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_options() {
        let options = Options::try_parse_from([
            "kql-lint",
            "-c",
            "https://help.kusto.windows.net;Fed=true",
            "-d",
            "Samples",
            "--no-cache",
            "--ignore",
            "KQL0100",
            "--ignore",
            "warning",
            "queries/*.kql",
            "a.kql",
        ])
        .unwrap();

        assert_eq!(options.connection(), Some("https://help.kusto.windows.net;Fed=true"));
        assert_eq!(options.default_database(), Some("Samples"));
        assert_eq!(options.default_cluster(), None);
        assert!(options.no_cache);
        assert_eq!(options.patterns, vec!["queries/*.kql", "a.kql"]);
        assert!(!options.diagnostic_filter().unwrap().is_empty());
    }

    #[test]
    fn test_cache_path() {
        let options = Options::try_parse_from(["kql-lint", "--cache", "/tmp/schemas"]).unwrap();
        assert_eq!(options.cache_path(), "/tmp/schemas");

        let options = Options::try_parse_from(["kql-lint", "--cache", " "]).unwrap();
        assert!(options.cache_path().ends_with("schemas"));
    }

    #[test]
    fn test_bad_ignore_entry() {
        let options = Options::try_parse_from(["kql-lint", "--ignore", "nonsense"]).unwrap();
        assert!(options.diagnostic_filter().is_err());
    }

    #[test]
    fn test_color_choice() {
        let options = Options::try_parse_from(["kql-lint", "--color", "never"]).unwrap();
        assert_eq!(options.color, ColorChoice::Never);
    }
}
