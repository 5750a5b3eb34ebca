//! Control-command access to a cluster
//!
//! The remote loader only needs one capability: run an administrative command
//! against a database and read back the primary result table.

use crate::{ConnectionString, Result, SchemaError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Executes control commands such as `.show databases`
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn execute(
        &self,
        connection: &ConnectionString,
        database: &str,
        command: &str,
    ) -> Result<ResultTable>;
}

/// A tabular command result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from rows given as JSON objects; columns are taken from the first row
    pub fn from_objects(objects: Vec<Value>) -> Self {
        let columns: Vec<String> = objects
            .first()
            .and_then(Value::as_object)
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|c| object.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Map each row onto `T` by column name
    pub fn rows<T: DeserializeOwned>(&self) -> std::result::Result<Vec<T>, serde_json::Error> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                serde_json::from_value(Value::Object(object))
            })
            .collect()
    }
}

/// `.show databases`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowDatabases {
    pub database_name: String,
    pub pretty_name: Option<String>,
}

/// `.show database <db> schema`: one row per column, plus one row per table
/// without a column name that carries the table's doc string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowDatabaseSchema {
    pub database_name: Option<String>,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
    pub column_type: Option<String>,
    pub doc_string: Option<String>,
}

/// `.show external tables`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowExternalTables {
    pub table_name: String,
    pub doc_string: Option<String>,
}

/// `.show external table <t> cslschema`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowExternalTableSchema {
    pub table_name: String,
    pub schema: String,
}

/// `.show materialized-views`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowMaterializedViews {
    pub name: String,
    pub doc_string: Option<String>,
}

/// `.show materialized-view <v> cslschema`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowMaterializedViewSchema {
    pub name: String,
    pub schema: String,
}

/// `.show functions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShowFunctions {
    pub name: String,
    pub parameters: String,
    pub body: String,
    pub doc_string: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Response {
    tables: Vec<V1Table>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Table {
    columns: Vec<V1Column>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Column {
    column_name: String,
}

/// Admin client speaking the v1 REST management endpoint
#[derive(Debug, Clone)]
pub struct HttpAdminClient {
    client: reqwest::Client,
}

impl HttpAdminClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("kql-lint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SchemaError::InvalidConnection(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn execute(
        &self,
        connection: &ConnectionString,
        database: &str,
        command: &str,
    ) -> Result<ResultTable> {
        let mut url = connection.url()?;
        url.set_path("/v1/rest/mgmt");
        let host = connection.host()?;

        log::debug!("{}: {} {}", host, database, command);

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "db": database, "csl": command }));
        if let Some(token) = connection.token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SchemaError::remote(&host, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SchemaError::remote(&host, e))?;

        if !status.is_success() {
            if status.is_client_error() && body.to_ascii_lowercase().contains("not found") {
                let kind = if database.is_empty() { "cluster" } else { "database" };
                let name = if database.is_empty() { host.as_str() } else { database };
                return Err(SchemaError::not_found(kind, name));
            }
            return Err(SchemaError::remote(&host, format!("{}: {}", status, body.trim())));
        }

        parse_v1_response(&body).map_err(|message| SchemaError::remote(&host, message))
    }
}

/// The first table of a v1 response is the primary result
fn parse_v1_response(body: &str) -> std::result::Result<ResultTable, String> {
    let response: V1Response = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let table = response
        .tables
        .into_iter()
        .next()
        .ok_or_else(|| "response has no result tables".to_string())?;
    Ok(ResultTable::new(
        table.columns.into_iter().map(|c| c.column_name).collect(),
        table.rows,
    ))
}
