//! Loads schema directly from a cluster
//!
//! A database load issues the database schema command first; if that fails the
//! whole load fails and the database is remembered as bad for this loader's
//! lifetime. External tables, materialized views and functions are loaded after
//! it and only degrade to "none" when their commands fail.

use crate::admin::{
    AdminClient, HttpAdminClient, ShowDatabaseSchema, ShowDatabases, ShowExternalTableSchema,
    ShowExternalTables, ShowFunctions, ShowMaterializedViewSchema, ShowMaterializedViews,
};
use crate::loader::{cancellable, full_host_name, LoadOptions, SymbolLoader, DEFAULT_DOMAIN};
use crate::{ConnectionString, Result, SchemaError};
use async_trait::async_trait;
use indexmap::IndexMap;
use kql_lint_symbols::{
    ColumnSymbol, DatabaseSymbol, FunctionSymbol, ScalarType, Symbol, TableKind, TableSymbol,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct RemoteSymbolLoader {
    connection: ConnectionString,
    default_cluster: String,
    default_domain: String,
    client: Arc<dyn AdminClient>,
    /// cluster -> database names known not to load, both lowercased
    bad_databases: RwLock<HashMap<String, HashSet<String>>>,
}

impl RemoteSymbolLoader {
    /// Create a loader for the connection's cluster using the HTTP admin client
    pub fn connect(connection: &str) -> Result<Self> {
        let connection = ConnectionString::parse(connection)?;
        Self::new(connection, Arc::new(HttpAdminClient::new()?))
    }

    pub fn new(connection: ConnectionString, client: Arc<dyn AdminClient>) -> Result<Self> {
        let default_cluster = connection.host()?;
        Ok(Self {
            connection,
            default_cluster,
            default_domain: DEFAULT_DOMAIN.to_string(),
            client,
            bad_databases: RwLock::new(HashMap::new()),
        })
    }

    /// Use a different domain for short cluster names
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        if !domain.is_empty() {
            self.default_domain = domain;
        }
        self
    }

    /// Database named in the connection string
    pub fn default_database(&self) -> Option<&str> {
        self.connection.initial_catalog()
    }

    pub fn connection(&self) -> &ConnectionString {
        &self.connection
    }

    fn resolve_cluster(&self, cluster: Option<&str>) -> String {
        match cluster {
            Some(name) if !name.trim().is_empty() => full_host_name(name, &self.default_domain),
            _ => self.default_cluster.clone(),
        }
    }

    /// The configured connection for the default cluster, or one borrowing its
    /// security settings for any other cluster
    fn cluster_connection(&self, cluster: &str) -> ConnectionString {
        if cluster.eq_ignore_ascii_case(&self.default_cluster) {
            self.connection.clone()
        } else {
            self.connection.for_cluster(cluster)
        }
    }

    /// Whether a database is remembered as failing to load
    pub fn is_bad_database(&self, cluster: &str, database: &str) -> bool {
        let cluster = self.resolve_cluster(Some(cluster));
        self.bad_databases
            .read()
            .get(&cluster.to_lowercase())
            .is_some_and(|names| names.contains(&database.to_lowercase()))
    }

    fn remember_bad_database(&self, cluster: &str, database: &str) {
        self.bad_databases
            .write()
            .entry(cluster.to_lowercase())
            .or_default()
            .insert(database.to_lowercase());
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        connection: &ConnectionString,
        cluster: &str,
        database: &str,
        command: &str,
        options: &LoadOptions,
    ) -> Result<Vec<T>> {
        let table = cancellable(options, self.client.execute(connection, database, command)).await?;
        table
            .rows()
            .map_err(|e| SchemaError::remote(cluster, format!("unexpected result for '{}': {}", command, e)))
    }

    async fn load_tables(
        &self,
        connection: &ConnectionString,
        cluster: &str,
        database: &str,
        options: &LoadOptions,
    ) -> Result<Vec<Symbol>> {
        let command = format!(".show database {} schema", quote_entity(database));
        let rows: Vec<ShowDatabaseSchema> =
            self.execute(connection, cluster, database, &command, options).await?;

        let mut grouped: IndexMap<String, (Vec<ColumnSymbol>, Option<String>)> = IndexMap::new();
        for row in rows {
            let Some(table) = row.table_name.filter(|t| !t.is_empty()) else {
                continue;
            };
            let entry = grouped.entry(table).or_default();
            match row.column_name.filter(|c| !c.is_empty()) {
                Some(column) => {
                    let ty = ScalarType::from_clr_type_name(row.column_type.as_deref().unwrap_or_default())?;
                    entry.0.push(ColumnSymbol::new(column, ty).with_description(row.doc_string));
                }
                None => {
                    if entry.1.is_none() {
                        entry.1 = row.doc_string.filter(|d| !d.is_empty());
                    }
                }
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(name, (columns, doc))| Symbol::from(TableSymbol::new(name, columns).with_description(doc)))
            .collect())
    }

    async fn load_external_tables(
        &self,
        connection: &ConnectionString,
        cluster: &str,
        database: &str,
        options: &LoadOptions,
    ) -> Result<Vec<Symbol>> {
        let tables: Vec<ShowExternalTables> = self
            .execute(connection, cluster, database, ".show external tables", options)
            .await?;

        let mut symbols = Vec::new();
        for table in tables {
            let command = format!(".show external table {} cslschema", quote_entity(&table.table_name));
            let schema = self
                .execute::<ShowExternalTableSchema>(connection, cluster, database, &command, options)
                .await
                .map(|rows| rows.into_iter().next().map(|r| r.schema));
            let Some(schema) = secondary(schema, options, &command)?.flatten() else {
                continue;
            };
            let symbol = tabular_from_schema(&table.table_name, &schema, table.doc_string, TableKind::External);
            if let Some(symbol) = secondary(symbol.map(Some), options, &command)?.flatten() {
                symbols.push(Symbol::from(symbol));
            }
        }
        Ok(symbols)
    }

    async fn load_materialized_views(
        &self,
        connection: &ConnectionString,
        cluster: &str,
        database: &str,
        options: &LoadOptions,
    ) -> Result<Vec<Symbol>> {
        let views: Vec<ShowMaterializedViews> = self
            .execute(connection, cluster, database, ".show materialized-views", options)
            .await?;

        let mut symbols = Vec::new();
        for view in views {
            let command = format!(".show materialized-view {} cslschema", quote_entity(&view.name));
            let schema = self
                .execute::<ShowMaterializedViewSchema>(connection, cluster, database, &command, options)
                .await
                .map(|rows| rows.into_iter().next().map(|r| r.schema));
            let Some(schema) = secondary(schema, options, &command)?.flatten() else {
                continue;
            };
            let symbol = tabular_from_schema(&view.name, &schema, view.doc_string, TableKind::MaterializedView);
            if let Some(symbol) = secondary(symbol.map(Some), options, &command)?.flatten() {
                symbols.push(Symbol::from(symbol));
            }
        }
        Ok(symbols)
    }

    async fn load_functions(
        &self,
        connection: &ConnectionString,
        cluster: &str,
        database: &str,
        options: &LoadOptions,
    ) -> Result<Vec<Symbol>> {
        let functions: Vec<ShowFunctions> = self
            .execute(connection, cluster, database, ".show functions", options)
            .await?;
        Ok(functions
            .into_iter()
            .map(|f| {
                Symbol::from(FunctionSymbol::new(f.name, f.parameters, f.body).with_description(f.doc_string))
            })
            .collect())
    }
}

/// Failures of secondary commands become "nothing" unless strict or fatal
fn secondary<T>(result: Result<T>, options: &LoadOptions, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if options.strict || e.is_fatal() => Err(e),
        Err(e) => {
            log::debug!("ignoring failed '{}': {}", what, e);
            Ok(None)
        }
    }
}

fn tabular_from_schema(
    name: &str,
    schema: &str,
    doc: Option<String>,
    kind: TableKind,
) -> Result<TableSymbol> {
    let schema = format!("({})", schema.trim().trim_start_matches('(').trim_end_matches(')'));
    Ok(TableSymbol::from_schema(name, &schema)?
        .with_description(doc)
        .with_kind(kind))
}

/// Bracket-quote entity names that are not plain identifiers
fn quote_entity(name: &str) -> String {
    if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("['{}']", name.replace('\'', "\\'"))
    }
}

#[async_trait]
impl SymbolLoader for RemoteSymbolLoader {
    fn default_cluster(&self) -> Option<&str> {
        Some(&self.default_cluster)
    }

    fn default_domain(&self) -> &str {
        &self.default_domain
    }

    async fn database_names(
        &self,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<Vec<String>>> {
        let cluster = self.resolve_cluster(cluster);
        let connection = self.cluster_connection(&cluster);
        let result = self
            .execute::<ShowDatabases>(&connection, &cluster, "", ".show databases", options)
            .await
            .map(|rows| Some(rows.into_iter().map(|r| r.database_name).collect()));
        options.soften(result)
    }

    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>> {
        let cluster = self.resolve_cluster(cluster);

        if self.is_bad_database(&cluster, database) {
            log::debug!("skipping known bad database '{}' on '{}'", database, cluster);
            return Ok(None);
        }

        let connection = self.cluster_connection(&cluster);

        let mut members = match self.load_tables(&connection, &cluster, database, options).await {
            Ok(tables) => tables,
            Err(e) if options.strict || e.is_fatal() => return Err(e),
            Err(e) => {
                log::debug!("database '{}' on '{}' did not load: {}", database, cluster, e);
                self.remember_bad_database(&cluster, database);
                return Ok(None);
            }
        };

        let (external, views, functions) = futures::join!(
            self.load_external_tables(&connection, &cluster, database, options),
            self.load_materialized_views(&connection, &cluster, database, options),
            self.load_functions(&connection, &cluster, database, options),
        );
        for (what, result) in [
            ("external tables", external),
            ("materialized views", views),
            ("functions", functions),
        ] {
            if let Some(symbols) = secondary(result, options, what)? {
                members.extend(symbols);
            }
        }

        Ok(Some(DatabaseSymbol::new(database, members)))
    }
}
