//! Schema symbols
//!
//! Symbols are immutable once built. Databases and clusters index their members
//! case-insensitively while keeping the original spelling and document order.

use crate::{format_schema, name_key, parse_schema, ScalarType, SymbolError};
use indexmap::IndexMap;
use std::sync::Arc;

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.is_empty())
}

/// A table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSymbol {
    name: String,
    scalar_type: ScalarType,
    description: Option<String>,
}

impl ColumnSymbol {
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = normalize_description(description);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// What kind of tabular entity a table symbol stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableKind {
    #[default]
    Table,
    External,
    MaterializedView,
}

/// A table, external table or materialized view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSymbol {
    name: String,
    columns: Vec<ColumnSymbol>,
    description: Option<String>,
    kind: TableKind,
}

impl TableSymbol {
    /// Create a table from its columns
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSymbol>) -> Self {
        Self {
            name: name.into(),
            columns,
            description: None,
            kind: TableKind::Table,
        }
    }

    /// Create a table from schema text such as `(A: string, B: long)`
    pub fn from_schema(name: impl Into<String>, schema: &str) -> Result<Self, SymbolError> {
        Ok(Self::new(name, parse_schema(schema)?))
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = normalize_description(description);
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSymbol] {
        &self.columns
    }

    /// Find a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnSymbol> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn is_external(&self) -> bool {
        self.kind == TableKind::External
    }

    pub fn is_materialized_view(&self) -> bool {
        self.kind == TableKind::MaterializedView
    }

    /// Canonical schema text of the columns
    pub fn schema_text(&self) -> String {
        format_schema(&self.columns)
    }
}

/// A stored function. The schema format carries one signature per function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    name: String,
    parameters: String,
    body: String,
    description: Option<String>,
}

impl FunctionSymbol {
    /// Create a function from its parameter list text (`(x: long)`) and body text (`{ ... }`)
    pub fn new(
        name: impl Into<String>,
        parameters: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
            body: body.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = normalize_description(description);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the function can be invoked without arguments
    pub fn is_parameterless(&self) -> bool {
        self.parameters
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim()
            .is_empty()
    }
}

/// A database member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Table(TableSymbol),
    Function(FunctionSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Table(t) => t.name(),
            Symbol::Function(f) => f.name(),
        }
    }

    pub fn as_table(&self) -> Option<&TableSymbol> {
        match self {
            Symbol::Table(t) => Some(t),
            Symbol::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match self {
            Symbol::Function(f) => Some(f),
            Symbol::Table(_) => None,
        }
    }
}

impl From<TableSymbol> for Symbol {
    fn from(table: TableSymbol) -> Self {
        Symbol::Table(table)
    }
}

impl From<FunctionSymbol> for Symbol {
    fn from(function: FunctionSymbol) -> Self {
        Symbol::Function(function)
    }
}

/// A database and its members.
///
/// A database is either an open placeholder (name known, schema not fetched) or
/// fully populated; it is never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSymbol {
    name: String,
    members: IndexMap<String, Symbol>,
    is_open: bool,
}

impl DatabaseSymbol {
    /// Create a populated database. Duplicate member names keep the first occurrence.
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = Symbol>) -> Self {
        let name = name.into();
        let mut map = IndexMap::new();
        for member in members {
            let key = name_key(member.name());
            if map.contains_key(&key) {
                log::debug!("database '{}': ignoring duplicate member '{}'", name, member.name());
                continue;
            }
            map.insert(key, member);
        }
        Self {
            name,
            members: map,
            is_open: false,
        }
    }

    /// Create a placeholder for a database known to exist whose schema has not been fetched
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
            is_open: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Open with no members: known to exist, schema not yet loaded
    pub fn is_placeholder(&self) -> bool {
        self.is_open && self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &Symbol> {
        self.members.values()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Find a member by case-insensitive name
    pub fn member(&self, name: &str) -> Option<&Symbol> {
        self.members.get(&name_key(name))
    }

    pub fn table(&self, name: &str) -> Option<&TableSymbol> {
        self.member(name).and_then(Symbol::as_table)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.member(name).and_then(Symbol::as_function)
    }

    fn tables_of(&self, kind: TableKind) -> impl Iterator<Item = &TableSymbol> {
        self.members
            .values()
            .filter_map(Symbol::as_table)
            .filter(move |t| t.kind() == kind)
    }

    /// Regular tables
    pub fn tables(&self) -> impl Iterator<Item = &TableSymbol> {
        self.tables_of(TableKind::Table)
    }

    pub fn external_tables(&self) -> impl Iterator<Item = &TableSymbol> {
        self.tables_of(TableKind::External)
    }

    pub fn materialized_views(&self) -> impl Iterator<Item = &TableSymbol> {
        self.tables_of(TableKind::MaterializedView)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSymbol> {
        self.members.values().filter_map(Symbol::as_function)
    }
}

/// A cluster and its databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSymbol {
    name: String,
    databases: IndexMap<String, Arc<DatabaseSymbol>>,
    is_open: bool,
}

impl ClusterSymbol {
    /// Create a cluster whose database list came from a full enumeration
    pub fn new(name: impl Into<String>, databases: impl IntoIterator<Item = DatabaseSymbol>) -> Self {
        Self::build(name.into(), databases, false)
    }

    /// Create a provisional cluster whose database list may be incomplete
    pub fn open(name: impl Into<String>, databases: impl IntoIterator<Item = DatabaseSymbol>) -> Self {
        Self::build(name.into(), databases, true)
    }

    fn build(name: String, databases: impl IntoIterator<Item = DatabaseSymbol>, is_open: bool) -> Self {
        let mut map = IndexMap::new();
        for db in databases {
            map.entry(name_key(db.name())).or_insert_with(|| Arc::new(db));
        }
        Self {
            name,
            databases: map,
            is_open,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn databases(&self) -> impl Iterator<Item = &DatabaseSymbol> {
        self.databases.values().map(|db| db.as_ref())
    }

    /// Find a database by case-insensitive name
    pub fn database(&self, name: &str) -> Option<&DatabaseSymbol> {
        self.databases.get(&name_key(name)).map(|db| db.as_ref())
    }

    /// A copy of this cluster with the database added, or replacing one of the same name
    pub fn with_database(&self, database: DatabaseSymbol) -> Self {
        let mut databases = self.databases.clone();
        databases.insert(name_key(database.name()), Arc::new(database));
        Self {
            name: self.name.clone(),
            databases,
            is_open: self.is_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storm_events() -> TableSymbol {
        TableSymbol::from_schema("StormEvents", "(StartTime: datetime, State: string)").unwrap()
    }

    #[test]
    fn test_database_member_lookup_is_case_insensitive() {
        let db = DatabaseSymbol::new(
            "Samples",
            vec![
                Symbol::from(storm_events()),
                Symbol::from(FunctionSymbol::new("MyFunc", "()", "{ StormEvents }")),
            ],
        );

        assert!(db.table("stormevents").is_some());
        assert!(db.function("MYFUNC").is_some());
        assert!(db.table("MyFunc").is_none());
        assert!(!db.is_open());
        assert!(!db.is_placeholder());
    }

    #[test]
    fn test_duplicate_members_keep_first() {
        let db = DatabaseSymbol::new(
            "Samples",
            vec![
                Symbol::from(storm_events()),
                Symbol::from(FunctionSymbol::new("stormevents", "()", "{ 1 }")),
            ],
        );
        assert_eq!(db.member_count(), 1);
        assert!(db.table("StormEvents").is_some());
    }

    #[test]
    fn test_placeholder_database() {
        let db = DatabaseSymbol::open("Samples");
        assert!(db.is_open());
        assert!(db.is_placeholder());
        assert_eq!(db.member_count(), 0);
    }

    #[test]
    fn test_typed_member_views() {
        let db = DatabaseSymbol::new(
            "Samples",
            vec![
                Symbol::from(storm_events()),
                Symbol::from(
                    TableSymbol::from_schema("Ext", "(A: string)")
                        .unwrap()
                        .with_kind(TableKind::External),
                ),
                Symbol::from(
                    TableSymbol::from_schema("View", "(B: long)")
                        .unwrap()
                        .with_kind(TableKind::MaterializedView),
                ),
                Symbol::from(FunctionSymbol::new("F", "(x: long)", "{ x }")),
            ],
        );

        assert_eq!(db.tables().count(), 1);
        assert!(db.external_tables().all(|t| t.is_external()));
        assert!(db.materialized_views().all(|t| t.is_materialized_view()));
        assert_eq!(db.functions().map(|f| f.name()).collect::<Vec<_>>(), vec!["F"]);
    }

    #[test]
    fn test_cluster_with_database_replaces_by_name() {
        let cluster = ClusterSymbol::new("help.kusto.windows.net", vec![DatabaseSymbol::open("Samples")]);
        let updated = cluster.with_database(DatabaseSymbol::new("samples", vec![Symbol::from(storm_events())]));

        assert!(cluster.database("Samples").unwrap().is_placeholder());
        assert_eq!(updated.databases().count(), 1);
        assert_eq!(updated.database("SAMPLES").unwrap().member_count(), 1);
    }

    #[test]
    fn test_empty_descriptions_normalize_to_none() {
        let table = storm_events().with_description(Some(String::new()));
        assert_eq!(table.description(), None);
        let function = FunctionSymbol::new("F", "()", "{ 1 }").with_description(Some("docs".into()));
        assert_eq!(function.description(), Some("docs"));
        assert!(function.is_parameterless());
        assert!(!FunctionSymbol::new("G", "(x: long)", "{ x }").is_parameterless());
    }
}
