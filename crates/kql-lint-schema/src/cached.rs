//! Read-through schema cache over a remote loader

use crate::file::FileSymbolLoader;
use crate::loader::{LoadOptions, SymbolLoader};
use crate::remote::RemoteSymbolLoader;
use crate::Result;
use async_trait::async_trait;
use kql_lint_symbols::DatabaseSymbol;

/// Consults the file cache first and the cluster on a miss, writing remote hits
/// back to the cache. Cache write failures never fail a load.
pub struct CachedSymbolLoader {
    file: FileSymbolLoader,
    remote: RemoteSymbolLoader,
}

impl CachedSymbolLoader {
    pub fn new(remote: RemoteSymbolLoader, file: FileSymbolLoader) -> Self {
        Self { file, remote }
    }

    /// Cache rooted at `cache_path` for the remote loader's cluster
    pub fn with_cache_path(remote: RemoteSymbolLoader, cache_path: &str) -> Self {
        let file = FileSymbolLoader::new(cache_path, remote.default_cluster())
            .with_domain(remote.default_domain());
        Self { file, remote }
    }

    pub fn file_loader(&self) -> &FileSymbolLoader {
        &self.file
    }

    /// Cache reads are never strict; a bad cache file is just a miss
    fn cache_options(options: &LoadOptions) -> LoadOptions {
        LoadOptions {
            strict: false,
            cancel: options.cancel.clone(),
        }
    }
}

#[async_trait]
impl SymbolLoader for CachedSymbolLoader {
    fn default_cluster(&self) -> Option<&str> {
        self.remote.default_cluster()
    }

    fn default_domain(&self) -> &str {
        self.remote.default_domain()
    }

    async fn database_names(
        &self,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<Vec<String>>> {
        let cache_options = Self::cache_options(options);
        if let Some(names) = self.file.database_names(cluster, &cache_options).await? {
            return Ok(Some(names));
        }

        let names = self.remote.database_names(cluster, options).await?;
        if let Some(names) = &names {
            self.file.save_database_names(names, cluster, &cache_options).await?;
        }
        Ok(names)
    }

    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>> {
        let cache_options = Self::cache_options(options);
        if let Some(db) = self.file.load_database(database, cluster, &cache_options).await? {
            log::debug!("loaded database '{}' from cache", database);
            return Ok(Some(db));
        }

        let db = self.remote.load_database(database, cluster, options).await?;
        if let Some(db) = &db {
            self.file.save_database(db, cluster, &cache_options).await?;
        }
        Ok(db)
    }
}

/// Outcome of pre-populating the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Databases written to the cache
    pub saved: Vec<String>,
    /// Databases that could not be loaded or saved
    pub failed: Vec<String>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Populate the cache with every database on the loader's cluster, loading each
/// from the remote cluster even when a cached copy exists.
///
/// Returns `None` if the cluster's databases could not be enumerated.
pub async fn generate_cache(
    loader: &CachedSymbolLoader,
    options: &LoadOptions,
) -> Result<Option<GenerateReport>> {
    let Some(names) = loader.remote.database_names(None, options).await? else {
        return Ok(None);
    };

    let cache_options = CachedSymbolLoader::cache_options(options);
    let mut report = GenerateReport::default();

    for name in &names {
        let saved = match loader.remote.load_database(name, None, options).await? {
            Some(db) => loader.file.save_database(&db, None, &cache_options).await?,
            None => false,
        };
        if saved {
            report.saved.push(name.clone());
        } else {
            report.failed.push(name.clone());
        }
    }

    loader.file.save_database_names(&names, None, &cache_options).await?;
    log::debug!(
        "cache generated: {} saved, {} failed",
        report.saved.len(),
        report.failed.len()
    );
    Ok(Some(report))
}
