//! The loader capability shared by the remote, file and cached loaders

use crate::{Result, SchemaError};
use async_trait::async_trait;
use kql_lint_symbols::{DatabaseSymbol, GlobalState};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Domain appended to short cluster names
pub const DEFAULT_DOMAIN: &str = ".kusto.windows.net";

/// Per-call loading options
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Raise load failures instead of reporting them as "not found"
    pub strict: bool,
    /// Abandons in-flight remote calls and file operations when cancelled
    pub cancel: CancellationToken,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Turn a failure into "absent" unless the caller asked for strict loading.
    /// Fatal errors always propagate.
    pub fn soften<T>(&self, result: Result<Option<T>>) -> Result<Option<T>> {
        match result {
            Err(e) if !self.strict && !e.is_fatal() => {
                log::debug!("treating load failure as not found: {}", e);
                Ok(None)
            }
            other => other,
        }
    }
}

/// Race an I/O future against the cancellation token
pub(crate) async fn cancellable<T>(
    options: &LoadOptions,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = options.cancel.cancelled() => Err(SchemaError::Cancelled),
        result = work => result,
    }
}

/// Retrieves schema for clusters and databases.
///
/// `None` results mean "not found"; with [`LoadOptions::strict`] the underlying
/// failure is returned instead.
#[async_trait]
pub trait SymbolLoader: Send + Sync {
    /// Fully qualified host of the cluster used when none is named
    fn default_cluster(&self) -> Option<&str>;

    /// Domain used to expand short cluster names
    fn default_domain(&self) -> &str;

    /// Names of every database on the cluster
    async fn database_names(
        &self,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<Vec<String>>>;

    /// Full schema of one database
    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>>;

    /// Expand a cluster name or URI, falling back to the default cluster
    fn cluster_host(&self, cluster: Option<&str>) -> Option<String> {
        match cluster {
            Some(name) if !name.trim().is_empty() => Some(full_host_name(name, self.default_domain())),
            _ => self.default_cluster().map(str::to_string),
        }
    }
}

/// Expand a short cluster name or a cluster URI into a fully qualified host name.
///
/// `help` becomes `help.kusto.windows.net`; `https://help.kusto.windows.net/` becomes
/// `help.kusto.windows.net`. Names that already contain a dot are kept.
pub fn full_host_name(name_or_uri: &str, default_domain: &str) -> String {
    let name = name_or_uri.trim();
    let host = if name.contains("://") {
        Url::parse(name)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| name.to_string())
    } else {
        name.trim_end_matches('/').to_string()
    };

    if host.is_empty() || host.contains('.') || host.eq_ignore_ascii_case("localhost") {
        host
    } else if default_domain.starts_with('.') {
        format!("{}{}", host, default_domain)
    } else {
        format!("{}.{}", host, default_domain)
    }
}

/// Load a database and add it to the snapshot, replacing any earlier version.
///
/// Returns the snapshot unchanged when the database cannot be found.
pub async fn add_or_update_database(
    loader: &dyn SymbolLoader,
    globals: &GlobalState,
    database: &str,
    cluster: Option<&str>,
    options: &LoadOptions,
) -> Result<GlobalState> {
    add_or_update(loader, globals, database, cluster, false, options).await
}

/// Like [`add_or_update_database`], and also make the database the default
/// scope for unqualified references
pub async fn add_or_update_default_database(
    loader: &dyn SymbolLoader,
    globals: &GlobalState,
    database: &str,
    cluster: Option<&str>,
    options: &LoadOptions,
) -> Result<GlobalState> {
    add_or_update(loader, globals, database, cluster, true, options).await
}

async fn add_or_update(
    loader: &dyn SymbolLoader,
    globals: &GlobalState,
    database: &str,
    cluster: Option<&str>,
    as_default: bool,
    options: &LoadOptions,
) -> Result<GlobalState> {
    let Some(cluster) = loader.cluster_host(cluster) else {
        log::debug!("no cluster to load database '{}' from", database);
        return Ok(globals.clone());
    };

    let Some(db) = loader.load_database(database, Some(&cluster), options).await? else {
        return Ok(globals.clone());
    };

    let db_name = db.name().to_string();
    let updated = globals.with_database(&cluster, db);
    Ok(if as_default {
        updated.with_default(&cluster, &db_name)
    } else {
        updated
    })
}
