//! Resolve the clusters and databases a query names explicitly
//!
//! Resolution runs in two phases over the whole document. Cluster references
//! are expanded first: a cluster that is unknown (or only provisionally known)
//! has its database names enumerated and installed as open placeholders.
//! Database references in any block then trigger a full load only for
//! databases that are missing or still placeholders.

use crate::loader::{add_or_update_database, full_host_name, LoadOptions, SymbolLoader};
use crate::Result;
use kql_lint_parser::QueryDocument;
use kql_lint_symbols::{ClusterSymbol, DatabaseSymbol, GlobalState};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub struct SymbolResolver {
    loader: Arc<dyn SymbolLoader>,
    /// lowercased hosts whose databases could not be enumerated this session
    ignored_clusters: RwLock<HashSet<String>>,
}

impl SymbolResolver {
    pub fn new(loader: Arc<dyn SymbolLoader>) -> Self {
        Self {
            loader,
            ignored_clusters: RwLock::new(HashSet::new()),
        }
    }

    pub fn loader(&self) -> &Arc<dyn SymbolLoader> {
        &self.loader
    }

    /// Clusters skipped for the rest of the session, sorted
    pub fn ignored_clusters(&self) -> Vec<String> {
        let mut clusters: Vec<String> = self.ignored_clusters.read().iter().cloned().collect();
        clusters.sort();
        clusters
    }

    fn is_ignored(&self, host: &str) -> bool {
        self.ignored_clusters.read().contains(&host.to_lowercase())
    }

    /// Return a snapshot extended with the schema the document references.
    ///
    /// Every cluster reference is expanded before any database is loaded.
    /// Unresolvable references are left for analysis to report; only fatal loader
    /// errors (and any error in strict mode) are returned.
    pub async fn resolve(
        &self,
        globals: &GlobalState,
        document: &QueryDocument,
        options: &LoadOptions,
    ) -> Result<GlobalState> {
        let mut globals = globals.clone();
        let domain = self.loader.default_domain().to_string();

        for reference in document.cluster_references() {
            let host = full_host_name(&reference.cluster, &domain);
            globals = self.add_cluster(globals, &host, options).await?;
        }

        for reference in document.database_references() {
            let cluster = match &reference.cluster {
                Some(name) => Some(full_host_name(name, &domain)),
                None => globals.default_cluster_name().map(str::to_string),
            };
            let Some(cluster) = cluster else {
                continue;
            };
            let Some(known) = globals.cluster(&cluster) else {
                log::debug!("database '{}' is on unknown cluster '{}'", reference.database, cluster);
                continue;
            };

            let needs_load = known
                .database(&reference.database)
                .is_none_or(DatabaseSymbol::is_placeholder);
            if needs_load {
                globals = add_or_update_database(
                    self.loader.as_ref(),
                    &globals,
                    &reference.database,
                    Some(&cluster),
                    options,
                )
                .await?;
            }
        }

        Ok(globals)
    }

    async fn add_cluster(&self, globals: GlobalState, host: &str, options: &LoadOptions) -> Result<GlobalState> {
        if self.is_ignored(host) {
            return Ok(globals);
        }

        let existing = globals.cluster(host);
        if existing.is_some_and(|c| !c.is_open()) {
            return Ok(globals);
        }

        let names = match self.loader.database_names(Some(host), options).await {
            Ok(names) => names,
            Err(e) if options.strict || e.is_fatal() => return Err(e),
            Err(e) => {
                log::debug!("could not enumerate '{}': {}", host, e);
                None
            }
        };
        let Some(names) = names else {
            log::debug!("ignoring cluster '{}' for this session", host);
            self.ignored_clusters.write().insert(host.to_lowercase());
            return Ok(globals);
        };

        // keep databases an open cluster already has loaded
        let mut databases: Vec<DatabaseSymbol> = existing
            .map(|c| c.databases().filter(|db| !db.is_placeholder()).cloned().collect())
            .unwrap_or_default();
        for name in names {
            if !databases.iter().any(|db| db.name().eq_ignore_ascii_case(&name)) {
                databases.push(DatabaseSymbol::open(name));
            }
        }

        let name = existing.map(|c| c.name().to_string()).unwrap_or_else(|| host.to_string());
        Ok(globals.with_cluster(ClusterSymbol::new(name, databases)))
    }
}
