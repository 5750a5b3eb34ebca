//! Schema cache on the local file system
//!
//! Layout: `<root>/<cluster>/<database>.json`, one file per database, plus a
//! `<root>/<cluster>/databases.index` file listing the cluster's database names.
//! Path parts are lowercased with path separators replaced, so lookups are
//! case-insensitive. A part made only of dots is renamed so it never refers
//! to the current or parent directory.

use crate::loader::{cancellable, full_host_name, LoadOptions, SymbolLoader, DEFAULT_DOMAIN};
use crate::{Result, SchemaError};
use async_trait::async_trait;
use kql_lint_symbols::{ClusterSymbol, DatabaseSymbol, FunctionSymbol, Symbol, TableKind, TableSymbol};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const DATABASE_EXTENSION: &str = "json";
const CLUSTER_INDEX_FILE: &str = "databases.index";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serialized form of a database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_tables: Option<Vec<TableInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized_views: Option<Vec<TableInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionInfo {
    pub name: String,
    pub parameters: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Serialized list of a cluster's databases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterIndex {
    pub cluster: String,
    pub databases: Vec<String>,
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn table_info(table: &TableSymbol) -> TableInfo {
    TableInfo {
        name: table.name().to_string(),
        schema: table.schema_text(),
        description: table.description().map(str::to_string),
    }
}

impl DatabaseInfo {
    pub fn from_symbol(db: &DatabaseSymbol) -> Self {
        Self {
            name: db.name().to_string(),
            tables: non_empty(db.tables().map(table_info).collect()),
            external_tables: non_empty(db.external_tables().map(table_info).collect()),
            materialized_views: non_empty(db.materialized_views().map(table_info).collect()),
            functions: non_empty(
                db.functions()
                    .map(|f| FunctionInfo {
                        name: f.name().to_string(),
                        parameters: f.parameters().to_string(),
                        body: f.body().to_string(),
                        description: f.description().map(str::to_string),
                    })
                    .collect(),
            ),
        }
    }

    pub fn to_symbol(&self) -> std::result::Result<DatabaseSymbol, kql_lint_symbols::SymbolError> {
        let mut members = Vec::new();
        for (tables, kind) in [
            (&self.tables, TableKind::Table),
            (&self.external_tables, TableKind::External),
            (&self.materialized_views, TableKind::MaterializedView),
        ] {
            for t in tables.iter().flatten() {
                let table = TableSymbol::from_schema(&t.name, &t.schema)?
                    .with_description(t.description.clone())
                    .with_kind(kind);
                members.push(Symbol::from(table));
            }
        }
        for f in self.functions.iter().flatten() {
            members.push(Symbol::from(
                FunctionSymbol::new(&f.name, &f.parameters, &f.body).with_description(f.description.clone()),
            ));
        }
        Ok(DatabaseSymbol::new(&self.name, members))
    }
}

/// Lowercase a name and replace path separators so it is safe as one path part.
/// Empty and all-dot names become underscores.
pub fn sanitize_path_part(name: &str) -> String {
    let part = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect::<String>()
        .to_lowercase();
    if part.chars().all(|c| c == '.') {
        "_".repeat(part.len().max(1))
    } else {
        part
    }
}

/// Expand `~` and environment references (`$VAR`, `${VAR}`, `%VAR%`) in a path.
/// Unset variables are left as written.
pub fn expand_path(path: &str) -> PathBuf {
    let mut expanded = String::with_capacity(path.len());
    let mut rest = path;

    if let Some(tail) = rest.strip_prefix('~') {
        if tail.is_empty() || tail.starts_with('/') || tail.starts_with('\\') {
            if let Some(home) = dirs::home_dir() {
                expanded.push_str(&home.to_string_lossy());
                rest = tail;
            }
        }
    }

    while let Some(c) = rest.chars().next() {
        let (name, consumed) = match c {
            '%' => match rest[1..].find('%') {
                Some(end) if end > 0 => (&rest[1..end + 1], end + 2),
                _ => ("", 0),
            },
            '$' if rest[1..].starts_with('{') => match rest.find('}') {
                Some(end) => (&rest[2..end], end + 1),
                None => ("", 0),
            },
            '$' => {
                let len = rest[1..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len() - 1);
                (&rest[1..len + 1], len + 1)
            }
            _ => ("", 0),
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => {
                expanded.push_str(&value);
                rest = &rest[consumed..];
            }
            _ => {
                expanded.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    PathBuf::from(expanded)
}

/// Write through a temporary file and rename, so readers never see a partial file
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    // concurrent creation of the same directory is fine
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = async {
        tokio::fs::write(&temp, contents).await?;
        tokio::fs::rename(&temp, path).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}

/// Loads and saves schema in a local cache directory
#[derive(Debug, Clone)]
pub struct FileSymbolLoader {
    root: PathBuf,
    default_cluster: Option<String>,
    default_domain: String,
}

impl FileSymbolLoader {
    /// `root` may contain `~` and environment variable references
    pub fn new(root: &str, default_cluster: Option<&str>) -> Self {
        Self {
            root: expand_path(root),
            default_cluster: default_cluster.map(|c| full_host_name(c, DEFAULT_DOMAIN)),
            default_domain: DEFAULT_DOMAIN.to_string(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        if !domain.is_empty() {
            self.default_cluster = self
                .default_cluster
                .map(|c| full_host_name(&c, &domain));
            self.default_domain = domain;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a cluster's cached databases
    pub fn cluster_cache_path(&self, cluster: Option<&str>) -> Option<PathBuf> {
        let cluster = self.cluster_host(cluster)?;
        Some(self.root.join(sanitize_path_part(&cluster)))
    }

    pub fn database_cache_path(&self, cluster: Option<&str>, database: &str) -> Option<PathBuf> {
        let file = format!("{}.{}", sanitize_path_part(database), DATABASE_EXTENSION);
        Some(self.cluster_cache_path(cluster)?.join(file))
    }

    fn index_path(&self, cluster: Option<&str>) -> Option<PathBuf> {
        Some(self.cluster_cache_path(cluster)?.join(CLUSTER_INDEX_FILE))
    }

    /// Read a cache file; a missing file is `None`
    async fn read(&self, path: &Path, options: &LoadOptions) -> Result<Option<String>> {
        let read = async {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(SchemaError::CacheRead {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }),
            }
        };
        cancellable(options, read).await
    }

    /// Treat unreadable cache files as a miss unless strict
    fn corrupt<T>(&self, error: SchemaError, options: &LoadOptions) -> Result<Option<T>> {
        if options.strict || error.is_fatal() {
            Err(error)
        } else {
            log::warn!("{}", error);
            Ok(None)
        }
    }

    async fn write(&self, path: PathBuf, contents: Vec<u8>, options: &LoadOptions) -> Result<bool> {
        let write = async {
            write_atomic(&path, &contents)
                .await
                .map_err(|e| SchemaError::CacheWrite {
                    path: path.clone(),
                    message: e.to_string(),
                })
        };
        match cancellable(options, write).await {
            Ok(()) => Ok(true),
            Err(e) if options.strict || e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("{}", e);
                Ok(false)
            }
        }
    }

    /// Save a database's schema. Returns whether the file was written.
    pub async fn save_database(
        &self,
        database: &DatabaseSymbol,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<bool> {
        let Some(path) = self.database_cache_path(cluster, database.name()) else {
            return Ok(false);
        };
        let json = serde_json::to_vec_pretty(&DatabaseInfo::from_symbol(database))
            .map_err(|e| SchemaError::CacheWrite {
                path: path.clone(),
                message: e.to_string(),
            })?;
        self.write(path, json, options).await
    }

    /// Save the list of a cluster's database names
    pub async fn save_database_names(
        &self,
        names: &[String],
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<bool> {
        let (Some(path), Some(host)) = (self.index_path(cluster), self.cluster_host(cluster)) else {
            return Ok(false);
        };
        let index = ClusterIndex {
            cluster: host,
            databases: names.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&index).map_err(|e| SchemaError::CacheWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;
        self.write(path, json, options).await
    }

    /// Save every loaded database of a cluster, and its database list when the
    /// cluster came from a full enumeration. Placeholder databases have no schema
    /// to save. Returns the number of database files written.
    pub async fn save_cluster(&self, cluster: &ClusterSymbol, options: &LoadOptions) -> Result<usize> {
        let mut saved = 0;
        for db in cluster.databases().filter(|db| !db.is_placeholder()) {
            if self.save_database(db, Some(cluster.name()), options).await? {
                saved += 1;
            }
        }
        if !cluster.is_open() {
            let names: Vec<String> = cluster.databases().map(|db| db.name().to_string()).collect();
            self.save_database_names(&names, Some(cluster.name()), options).await?;
        }
        Ok(saved)
    }

    pub async fn save_clusters<'a>(
        &self,
        clusters: impl IntoIterator<Item = &'a ClusterSymbol>,
        options: &LoadOptions,
    ) -> Result<usize> {
        let mut saved = 0;
        for cluster in clusters {
            saved += self.save_cluster(cluster, options).await?;
        }
        Ok(saved)
    }

    /// Delete the whole cache. Returns `false` if the directory could not be removed.
    pub async fn delete_cache(&self) -> bool {
        remove_dir(&self.root).await
    }

    /// Delete one cluster's cached databases
    pub async fn delete_cluster_cache(&self, cluster: Option<&str>) -> bool {
        match self.cluster_cache_path(cluster) {
            Some(path) => remove_dir(&path).await,
            None => true,
        }
    }
}

async fn remove_dir(path: &Path) -> bool {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            log::warn!("could not delete {}: {}", path.display(), e);
            false
        }
    }
}

#[async_trait]
impl SymbolLoader for FileSymbolLoader {
    fn default_cluster(&self) -> Option<&str> {
        self.default_cluster.as_deref()
    }

    fn default_domain(&self) -> &str {
        &self.default_domain
    }

    async fn database_names(
        &self,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<Vec<String>>> {
        let Some(path) = self.index_path(cluster) else {
            return Ok(None);
        };
        let Some(text) = self.read(&path, options).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<ClusterIndex>(&text) {
            Ok(index) => Ok(Some(index.databases)),
            Err(e) => self.corrupt(
                SchemaError::CacheRead {
                    path,
                    message: e.to_string(),
                },
                options,
            ),
        }
    }

    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>> {
        let Some(path) = self.database_cache_path(cluster, database) else {
            return Ok(None);
        };
        let text = match self.read(&path, options).await {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(None),
            Err(e) => return self.corrupt(e, options),
        };

        let parsed = serde_json::from_str::<DatabaseInfo>(&text)
            .map_err(|e| e.to_string())
            .and_then(|info| info.to_symbol().map_err(|e| e.to_string()));
        match parsed {
            Ok(db) => Ok(Some(db)),
            Err(message) => self.corrupt(SchemaError::CacheRead { path, message }, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_path_part() {
        assert_eq!(sanitize_path_part("Help.Kusto.Windows.Net"), "help.kusto.windows.net");
        assert_eq!(sanitize_path_part("../a\\B"), ".._a_b");
        assert_eq!(sanitize_path_part(".."), "__");
        assert_eq!(sanitize_path_part("."), "_");
        assert_eq!(sanitize_path_part(""), "_");
    }

    #[test]
    fn test_paths() {
        let loader = FileSymbolLoader::new("/cache", Some("help"));
        assert_eq!(
            loader.database_cache_path(None, "Samples"),
            Some(PathBuf::from("/cache/help.kusto.windows.net/samples.json"))
        );
        assert_eq!(
            loader.database_cache_path(Some("HELP.kusto.windows.net"), "samples"),
            loader.database_cache_path(None, "SAMPLES")
        );
        assert_eq!(
            loader.cluster_cache_path(Some("other")),
            Some(PathBuf::from("/cache/other.kusto.windows.net"))
        );
        assert_eq!(FileSymbolLoader::new("/cache", None).database_cache_path(None, "x"), None);
        assert_eq!(
            loader.cluster_cache_path(Some("..")),
            Some(PathBuf::from("/cache/__"))
        );
    }

    #[test]
    fn test_expand_path() {
        // SAFETY: test-only variable with a unique name
        unsafe { std::env::set_var("KQL_LINT_TEST_EXPAND", "/tmp/x") };
        assert_eq!(expand_path("$KQL_LINT_TEST_EXPAND/s"), PathBuf::from("/tmp/x/s"));
        assert_eq!(expand_path("${KQL_LINT_TEST_EXPAND}/s"), PathBuf::from("/tmp/x/s"));
        assert_eq!(expand_path("%KQL_LINT_TEST_EXPAND%/s"), PathBuf::from("/tmp/x/s"));
        assert_eq!(expand_path("%KQL_LINT_UNSET_VAR%/s"), PathBuf::from("%KQL_LINT_UNSET_VAR%/s"));
        assert_eq!(expand_path("100%"), PathBuf::from("100%"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/schemas"), PathBuf::from(format!("{}/schemas", home.display())));
        }
    }

    #[test]
    fn test_database_info_omits_empty_categories() {
        let db = DatabaseSymbol::new(
            "Samples",
            vec![Symbol::from(TableSymbol::from_schema("T", "(A: string)").unwrap())],
        );
        let json = serde_json::to_string(&DatabaseInfo::from_symbol(&db)).unwrap();
        assert_eq!(json, r#"{"Name":"Samples","Tables":[{"Name":"T","Schema":"(A: string)"}]}"#);
    }
}
