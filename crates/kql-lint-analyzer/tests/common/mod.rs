//! Shared test utilities for session analysis

#![allow(dead_code)]

use async_trait::async_trait;
use kql_lint_schema::{LoadOptions, SchemaError, SymbolLoader, DEFAULT_DOMAIN};
use kql_lint_symbols::{DatabaseSymbol, Symbol, TableSymbol};
use parking_lot::Mutex;

pub const HELP: &str = "help.kusto.windows.net";

/// In-memory loader for the `help` cluster that counts database loads
pub struct HelpLoader {
    databases: Vec<DatabaseSymbol>,
    loads: Mutex<Vec<String>>,
}

impl HelpLoader {
    pub fn new() -> Self {
        let table = |name: &str, schema: &str| Symbol::from(TableSymbol::from_schema(name, schema).unwrap());
        Self {
            databases: vec![
                DatabaseSymbol::new(
                    "Samples",
                    [table("StormEvents", "(StartTime: datetime, State: string, DamageProperty: int)")],
                ),
                DatabaseSymbol::new("Logs", [table("Traces", "(Timestamp: datetime, Level: string)")]),
            ],
            loads: Mutex::new(Vec::new()),
        }
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }
}

#[async_trait]
impl SymbolLoader for HelpLoader {
    fn default_cluster(&self) -> Option<&str> {
        Some(HELP)
    }

    fn default_domain(&self) -> &str {
        DEFAULT_DOMAIN
    }

    async fn database_names(
        &self,
        cluster: Option<&str>,
        _options: &LoadOptions,
    ) -> Result<Option<Vec<String>>, SchemaError> {
        if self.cluster_host(cluster).as_deref() != Some(HELP) {
            return Ok(None);
        }
        Ok(Some(self.databases.iter().map(|db| db.name().to_string()).collect()))
    }

    async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        _options: &LoadOptions,
    ) -> Result<Option<DatabaseSymbol>, SchemaError> {
        if self.cluster_host(cluster).as_deref() != Some(HELP) {
            return Ok(None);
        }
        self.loads.lock().push(database.to_string());
        Ok(self
            .databases
            .iter()
            .find(|db| db.name().eq_ignore_ascii_case(database))
            .cloned())
    }
}
