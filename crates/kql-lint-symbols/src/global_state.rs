//! Immutable global symbol snapshot
//!
//! Every update returns a new `GlobalState`; clusters are shared between
//! snapshots through `Arc`, so threading a snapshot through resolution is cheap.

use crate::{name_key, ClusterSymbol, DatabaseSymbol};
use indexmap::IndexMap;
use std::sync::Arc;

/// The set of known clusters plus the default cluster and database used for
/// unqualified references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalState {
    clusters: IndexMap<String, Arc<ClusterSymbol>>,
    default_cluster: Option<String>,
    default_database: Option<String>,
}

impl GlobalState {
    /// An empty snapshot with no clusters and no defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterSymbol> {
        self.clusters.values().map(|c| c.as_ref())
    }

    /// Find a cluster by case-insensitive host name
    pub fn cluster(&self, name: &str) -> Option<&ClusterSymbol> {
        self.clusters.get(&name_key(name)).map(|c| c.as_ref())
    }

    pub fn default_cluster(&self) -> Option<&ClusterSymbol> {
        self.default_cluster.as_deref().and_then(|name| self.cluster(name))
    }

    pub fn default_database(&self) -> Option<&DatabaseSymbol> {
        let cluster = self.default_cluster()?;
        self.default_database
            .as_deref()
            .and_then(|name| cluster.database(name))
    }

    /// Name of the default cluster, even if it has not been installed
    pub fn default_cluster_name(&self) -> Option<&str> {
        self.default_cluster.as_deref()
    }

    pub fn default_database_name(&self) -> Option<&str> {
        self.default_database.as_deref()
    }

    /// Install a cluster, replacing any cluster with the same name
    pub fn with_cluster(&self, cluster: ClusterSymbol) -> Self {
        let mut clusters = self.clusters.clone();
        clusters.insert(name_key(cluster.name()), Arc::new(cluster));
        Self {
            clusters,
            default_cluster: self.default_cluster.clone(),
            default_database: self.default_database.clone(),
        }
    }

    /// Add or replace a database within a cluster.
    ///
    /// An unknown cluster is installed as an open cluster holding just this database.
    pub fn with_database(&self, cluster: &str, database: DatabaseSymbol) -> Self {
        let updated = match self.cluster(cluster) {
            Some(existing) => existing.with_database(database),
            None => ClusterSymbol::open(cluster, [database]),
        };
        self.with_cluster(updated)
    }

    /// Point unqualified references at a cluster and database
    pub fn with_default(&self, cluster: &str, database: &str) -> Self {
        Self {
            clusters: self.clusters.clone(),
            default_cluster: Some(cluster.to_string()),
            default_database: Some(database.to_string()),
        }
    }
}
