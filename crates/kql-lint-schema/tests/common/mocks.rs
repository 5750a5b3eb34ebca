//! Mock implementations of the admin client and the symbol loader

use async_trait::async_trait;
use kql_lint_schema::{
    AdminClient, ConnectionString, LoadOptions, RemoteSymbolLoader, ResultTable, SchemaError,
    SymbolLoader,
};
use kql_lint_symbols::{DatabaseSymbol, Symbol, TableSymbol};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const HELP: &str = "help.kusto.windows.net";
pub const HELP_CONNECTION: &str = "https://help.kusto.windows.net;Fed=true;User Token=secret";

/// One recorded control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub host: String,
    pub catalog: Option<String>,
    pub database: String,
    pub command: String,
}

/// Admin client answering scripted commands per cluster host
#[derive(Default)]
pub struct MockAdminClient {
    responses: RwLock<HashMap<(String, String), Result<ResultTable, SchemaError>>>,
    calls: RwLock<Vec<Call>>,
}

impl MockAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, host: &str, command: &str, rows: Vec<Value>) {
        self.responses.write().insert(
            (host.to_lowercase(), command.to_string()),
            Ok(ResultTable::from_objects(rows)),
        );
    }

    pub fn fail(&self, host: &str, command: &str, error: SchemaError) {
        self.responses
            .write()
            .insert((host.to_lowercase(), command.to_string()), Err(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.read().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls.read().iter().filter(|c| c.command == command).count()
    }

    /// The `help` cluster with a populated `Samples` database and an empty `Other` database
    pub fn help_cluster() -> Self {
        let mock = Self::new();
        mock.respond(
            HELP,
            ".show databases",
            vec![json!({ "DatabaseName": "Samples" }), json!({ "DatabaseName": "Other" })],
        );
        mock.respond(
            HELP,
            ".show database Samples schema",
            vec![
                json!({ "DatabaseName": "Samples", "TableName": "StormEvents", "ColumnName": null, "ColumnType": null, "DocString": "US storm events" }),
                json!({ "DatabaseName": "Samples", "TableName": "StormEvents", "ColumnName": "StartTime", "ColumnType": "System.DateTime", "DocString": null }),
                json!({ "DatabaseName": "Samples", "TableName": "StormEvents", "ColumnName": "State", "ColumnType": "System.String", "DocString": null }),
                json!({ "DatabaseName": "Samples", "TableName": "StormEvents", "ColumnName": "DamageProperty", "ColumnType": "System.Int32", "DocString": null }),
                json!({ "DatabaseName": "Samples", "TableName": "PopulationData", "ColumnName": "State", "ColumnType": "System.String", "DocString": null }),
                json!({ "DatabaseName": "Samples", "TableName": "PopulationData", "ColumnName": "Population", "ColumnType": "System.Int64", "DocString": null }),
            ],
        );
        mock.respond(
            HELP,
            ".show external tables",
            vec![json!({ "TableName": "ExternalLogs", "DocString": "" })],
        );
        mock.respond(
            HELP,
            ".show external table ExternalLogs cslschema",
            vec![json!({ "TableName": "ExternalLogs", "Schema": "Timestamp:datetime,Message:string" })],
        );
        mock.respond(
            HELP,
            ".show materialized-views",
            vec![json!({ "Name": "DailyStorms", "DocString": "storms per day" })],
        );
        mock.respond(
            HELP,
            ".show materialized-view DailyStorms cslschema",
            vec![json!({ "Name": "DailyStorms", "Schema": "Day:datetime,Count:long" })],
        );
        mock.respond(
            HELP,
            ".show functions",
            vec![json!({ "Name": "TopStates", "Parameters": "(n:long)", "Body": "{ StormEvents | top n by DamageProperty }", "Folder": "", "DocString": "" })],
        );
        mock.respond(HELP, ".show database Other schema", vec![]);
        mock
    }
}

#[async_trait]
impl AdminClient for MockAdminClient {
    async fn execute(
        &self,
        connection: &ConnectionString,
        database: &str,
        command: &str,
    ) -> Result<ResultTable, SchemaError> {
        let host = connection.host()?;
        self.calls.write().push(Call {
            host: host.clone(),
            catalog: connection.initial_catalog().map(str::to_string),
            database: database.to_string(),
            command: command.to_string(),
        });
        self.responses
            .read()
            .get(&(host.to_lowercase(), command.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(SchemaError::remote(host, format!("no response for '{}'", command))))
    }
}

/// A remote loader for the `help` cluster backed by the given mock
pub fn help_loader(mock: &Arc<MockAdminClient>) -> RemoteSymbolLoader {
    let connection = ConnectionString::parse(HELP_CONNECTION).unwrap();
    RemoteSymbolLoader::new(connection, mock.clone()).unwrap()
}

/// Recorded calls of a `MemoryLoader`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    DatabaseNames(String),
    LoadDatabase(String, String),
}

/// An in-memory loader over fixed clusters
pub struct MemoryLoader {
    default_cluster: Option<String>,
    clusters: HashMap<String, Vec<DatabaseSymbol>>,
    calls: RwLock<Vec<LoaderCall>>,
}

impl MemoryLoader {
    pub fn new(default_cluster: Option<&str>) -> Self {
        Self {
            default_cluster: default_cluster.map(str::to_string),
            clusters: HashMap::new(),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn with_cluster(mut self, host: &str, databases: Vec<DatabaseSymbol>) -> Self {
        self.clusters.insert(host.to_lowercase(), databases);
        self
    }

    pub fn calls(&self) -> Vec<LoaderCall> {
        self.calls.read().clone()
    }

    pub fn load_count(&self) -> usize {
        self.calls
            .read()
            .iter()
            .filter(|c| matches!(c, LoaderCall::LoadDatabase(..)))
            .count()
    }

    pub fn names_count(&self) -> usize {
        self.calls
            .read()
            .iter()
            .filter(|c| matches!(c, LoaderCall::DatabaseNames(..)))
            .count()
    }
}

#[async_trait]
impl SymbolLoader for MemoryLoader {
    fn default_cluster(&self) -> Option<&str> {
        self.default_cluster.as_deref()
    }

    fn default_domain(&self) -> &str {
        kql_lint_schema::DEFAULT_DOMAIN
    }

    async fn database_names(
        &self,
        cluster: Option<&str>,
        _options: &LoadOptions,
    ) -> Result<Option<Vec<String>>, SchemaError> {
        let Some(host) = self.cluster_host(cluster) else {
            return Ok(None);
        };
        self.calls.write().push(LoaderCall::DatabaseNames(host.clone()));
        Ok(self
            .clusters
            .get(&host.to_lowercase())
            .map(|dbs| dbs.iter().map(|db| db.name().to_string()).collect()))
    }

    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        _options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>, SchemaError> {
        let Some(host) = self.cluster_host(cluster) else {
            return Ok(None);
        };
        self.calls
            .write()
            .push(LoaderCall::LoadDatabase(host.clone(), database.to_string()));
        Ok(self.clusters.get(&host.to_lowercase()).and_then(|dbs| {
            dbs.iter()
                .find(|db| db.name().eq_ignore_ascii_case(database))
                .cloned()
        }))
    }
}

/// `Samples` with a `StormEvents` table
pub fn samples_database() -> DatabaseSymbol {
    DatabaseSymbol::new(
        "Samples",
        vec![Symbol::from(
            TableSymbol::from_schema("StormEvents", "(StartTime: datetime, State: string)").unwrap(),
        )],
    )
}

pub fn database(name: &str, table: &str) -> DatabaseSymbol {
    DatabaseSymbol::new(
        name,
        vec![Symbol::from(TableSymbol::from_schema(table, "(A: string)").unwrap())],
    )
}
