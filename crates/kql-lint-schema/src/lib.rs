//! Schema resolution and caching for kql-lint
//!
//! This crate gives analysis the schema of the clusters and databases a query uses:
//! - `RemoteSymbolLoader` reads schema from a cluster with control commands
//! - `FileSymbolLoader` reads and writes a local schema cache
//! - `CachedSymbolLoader` combines the two as a read-through cache
//! - `SymbolResolver` loads what a query document references, lazily

mod admin;
mod cached;
mod connection;
mod error;
mod file;
mod loader;
mod remote;
mod resolver;

pub use admin::{
    AdminClient, HttpAdminClient, ResultTable, ShowDatabaseSchema, ShowDatabases,
    ShowExternalTableSchema, ShowExternalTables, ShowFunctions, ShowMaterializedViewSchema,
    ShowMaterializedViews,
};
pub use cached::{generate_cache, CachedSymbolLoader, GenerateReport};
pub use connection::{ConnectionString, NET_DEFAULT_DB};
pub use error::SchemaError;
pub use file::{
    expand_path, sanitize_path_part, ClusterIndex, DatabaseInfo, FileSymbolLoader, FunctionInfo,
    TableInfo,
};
pub use loader::{
    add_or_update_database, add_or_update_default_database, full_host_name, LoadOptions,
    SymbolLoader, DEFAULT_DOMAIN,
};
pub use remote::RemoteSymbolLoader;
pub use resolver::SymbolResolver;
pub use tokio_util::sync::CancellationToken;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;
