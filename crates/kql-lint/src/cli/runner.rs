//! One invocation of the linter
//!
//! The runner picks a schema loader from the options, performs the requested
//! cache maintenance, then analyses piped input and each input file in turn.
//! Everything the user sees is written to the runner's output.

use super::file_patterns;
use super::options::Options;
use super::output::{format_diagnostic, format_status};
use anyhow::{Context, Result};
use clap::CommandFactory;
use kql_lint_analyzer::{AnalysisResult, Analyzer};
use kql_lint_schema::{
    add_or_update_default_database, generate_cache, CachedSymbolLoader, FileSymbolLoader,
    LoadOptions, RemoteSymbolLoader, SymbolLoader, SymbolResolver,
};
use kql_lint_symbols::GlobalState;
use std::io::Write;
use std::sync::Arc;

/// Loaders chosen for a run
#[derive(Default)]
struct Loaders {
    /// Used for analysis
    active: Option<Arc<dyn SymbolLoader>>,
    /// Present when a connection is cached locally
    cached: Option<Arc<CachedSymbolLoader>>,
    /// The local cache, when one is in use
    file: Option<FileSymbolLoader>,
    default_cluster: Option<String>,
    default_database: Option<String>,
}

impl Loaders {
    fn from_options(options: &Options) -> Result<Self> {
        let mut loaders = Self::default();
        let cache_path = options.cache_path();

        if let Some(connection) = options.connection() {
            let remote = RemoteSymbolLoader::connect(connection).context("invalid connection")?;
            loaders.default_cluster = remote.default_cluster().map(str::to_string);
            loaders.default_database = remote.default_database().map(str::to_string);

            if options.no_cache {
                loaders.active = Some(Arc::new(remote));
            } else {
                let cached = Arc::new(CachedSymbolLoader::with_cache_path(remote, &cache_path));
                let active: Arc<dyn SymbolLoader> = cached.clone();
                loaders.file = Some(cached.file_loader().clone());
                loaders.active = Some(active);
                loaders.cached = Some(cached);
            }
        }

        if let Some(cluster) = options.default_cluster() {
            loaders.default_cluster = Some(cluster.to_string());
        }

        if loaders.active.is_none() && !options.no_cache {
            // schema from the local cache only
            let file = FileSymbolLoader::new(&cache_path, loaders.default_cluster.as_deref());
            loaders.active = Some(Arc::new(file.clone()));
            loaders.file = Some(file);
        }

        if let Some(database) = options.default_database() {
            loaders.default_database = Some(database.to_string());
        }

        Ok(loaders)
    }
}

pub struct Runner<W: Write> {
    output: W,
    colors: bool,
}

impl<W: Write> Runner<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            colors: false,
        }
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    /// Run with already parsed options. Returns `true` when every analysed
    /// source succeeded.
    pub async fn run(&mut self, options: &Options, piped_input: Option<&str>) -> Result<bool> {
        let filter = options.diagnostic_filter()?;
        let loaders = Loaders::from_options(options)?;
        let load_options = LoadOptions::new();
        let mut acted = false;

        // delete always runs before generate
        if options.delete {
            if let Some(file) = &loaders.file {
                if file.delete_cache().await {
                    writeln!(self.output, "schema cache deleted")?;
                } else {
                    writeln!(self.output, "schema cache could not be deleted: {}", file.root().display())?;
                }
                acted = true;
            }
        }

        if options.generate {
            match &loaders.cached {
                Some(cached) => {
                    self.generate(cached, &load_options).await?;
                    acted = true;
                }
                None => log::warn!("--generate needs a connection with caching enabled"),
            }
        }

        let file_paths = file_patterns::expand(options.patterns.as_slice());
        let analysing = piped_input.is_some() || !file_paths.is_empty();

        let mut globals = GlobalState::new();
        if let (Some(database), Some(loader), true) =
            (&loaders.default_database, &loaders.active, analysing)
        {
            globals = add_or_update_default_database(
                loader.as_ref(),
                &globals,
                database,
                loaders.default_cluster.as_deref(),
                &load_options,
            )
            .await?;
        }

        let mut analyzer = Analyzer::new(globals).with_filter(filter);
        if let Some(loader) = &loaders.active {
            analyzer = analyzer.with_resolver(SymbolResolver::new(loader.clone()));
        }

        let mut success = true;
        if let Some(text) = piped_input {
            let result = analyzer.analyze(text, &load_options).await?;
            success &= self.report("input", &result)?;
            acted = true;
        }

        for path in &file_paths {
            let text = match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(e) => {
                    writeln!(self.output, "{}", format_status(path, false, self.colors))?;
                    writeln!(self.output, "error: could not read file: {}", e)?;
                    success = false;
                    continue;
                }
            };
            let result = analyzer.analyze(&text, &load_options).await?;
            success &= self.report(path, &result)?;
        }
        acted |= !file_paths.is_empty();

        if !acted && piped_input.is_none() && options.patterns.is_empty() {
            writeln!(self.output, "no input")?;
            writeln!(self.output)?;
            writeln!(self.output, "{}", Options::command().render_help())?;
        }

        Ok(success)
    }

    async fn generate(&mut self, cached: &CachedSymbolLoader, options: &LoadOptions) -> Result<()> {
        match generate_cache(cached, options).await? {
            Some(report) => {
                for database in &report.failed {
                    writeln!(self.output, "{}: schema could not be cached", database)?;
                }
                writeln!(self.output, "schema cache generated")?;
            }
            None => {
                let cluster = cached.default_cluster().unwrap_or_default();
                writeln!(self.output, "schema cache could not be generated: cannot list databases of '{}'", cluster)?;
            }
        }
        Ok(())
    }

    fn report(&mut self, source: &str, result: &AnalysisResult) -> Result<bool> {
        writeln!(self.output, "{}", format_status(source, result.success, self.colors))?;
        for diagnostic in &result.diagnostics {
            writeln!(self.output, "{}", format_diagnostic(diagnostic, self.colors))?;
        }
        Ok(result.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_loader_selection() {
        let options = Options::try_parse_from(["kql-lint", "--cache", "/tmp/kql", "--cluster", "help"]).unwrap();
        let loaders = Loaders::from_options(&options).unwrap();
        assert!(loaders.cached.is_none());
        assert_eq!(
            loaders.file.unwrap().cluster_cache_path(None).unwrap(),
            std::path::Path::new("/tmp/kql/help.kusto.windows.net")
        );

        let options = Options::try_parse_from(["kql-lint", "--no-cache"]).unwrap();
        let loaders = Loaders::from_options(&options).unwrap();
        assert!(loaders.active.is_none());
        assert!(loaders.file.is_none());

        let options = Options::try_parse_from([
            "kql-lint",
            "-c",
            "https://help.kusto.windows.net;Fed=true",
            "--cache",
            "/tmp/kql",
        ])
        .unwrap();
        let loaders = Loaders::from_options(&options).unwrap();
        assert!(loaders.cached.is_some());
        assert_eq!(loaders.default_cluster.as_deref(), Some("help.kusto.windows.net"));
    }
}
