//! Name binding over query documents
//!
//! The binder walks each statement's tokens as a pipeline: a source followed by
//! `|`-separated operators. It tracks the columns flowing through the pipeline
//! and reports names that resolve to nothing. Sources and operators whose
//! output cannot be known statically produce an open schema, after which no
//! column names are checked.

use crate::scope::{Binding, Columns, Scope};
use crate::tokens::{assignment, literal_call, matching_close, single_name, split_at_keyword, split_top_level};
use kql_lint_diagnostics::{Diagnostic, ErrorCode, Span, KQL0100, KQL0101, KQL0102};
use kql_lint_parser::{QueryDocument, Token, TokenKind};
use kql_lint_schema::{full_host_name, DEFAULT_DOMAIN};
use kql_lint_symbols::{ClusterSymbol, GlobalState, Symbol, TableSymbol};

/// Produces semantic diagnostics for a document against a schema snapshot
pub trait AnalysisEngine: Send + Sync {
    fn analyze(&self, globals: &GlobalState, document: &QueryDocument) -> Vec<Diagnostic>;
}

/// Identifiers that are operators or clauses inside expressions, never names
const EXPRESSION_KEYWORDS: &[&str] = &[
    "and", "or", "in", "between", "has", "has_cs", "hasprefix", "hasprefix_cs", "hassuffix",
    "hassuffix_cs", "has_any", "has_all", "contains", "contains_cs", "startswith",
    "startswith_cs", "endswith", "endswith_cs", "matches", "regex", "like", "true", "false",
    "null", "by", "asc", "desc", "nulls", "first", "last", "from", "to", "step", "with", "kind",
    "on", "of",
];

/// Calls whose arguments are literals in their own syntax
const LITERAL_CALLS: &[&str] = &["datetime", "timespan", "time", "guid", "dynamic", "typeof"];

/// Sources whose columns depend on data or on other tables
const OPEN_SOURCES: &[&str] = &[
    "union", "search", "find", "evaluate", "externaldata", "external_data", "materialize",
    "view", "invoke",
];

/// Default engine: resolves tables, columns, `let` names and explicit database references
#[derive(Debug, Clone)]
pub struct BasicAnalyzer {
    domain: String,
}

impl Default for BasicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicAnalyzer {
    pub fn new() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }

    /// Domain used to expand short names in `cluster('name')`
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        if !domain.is_empty() {
            self.domain = domain;
        }
        self
    }
}

impl AnalysisEngine for BasicAnalyzer {
    fn analyze(&self, globals: &GlobalState, document: &QueryDocument) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for block in document.blocks() {
            let mut binder = Binder {
                globals,
                domain: &self.domain,
                text: document.text(),
                scope: Scope::new(),
                diagnostics: Vec::new(),
            };
            for statement in &block.statements {
                binder.bind_statement(&statement.tokens);
            }
            diagnostics.extend(binder.diagnostics);
        }
        diagnostics
    }
}

/// What a bare name refers to outside of the current columns
enum Named<'g> {
    Let(Binding),
    Table(&'g TableSymbol),
    Function,
    /// The default database is known to exist but its schema is not loaded
    Unchecked,
    Unknown,
}

struct Binder<'a> {
    globals: &'a GlobalState,
    domain: &'a str,
    text: &'a str,
    scope: Scope,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Binder<'a> {
    fn report(&mut self, code: ErrorCode, message: String, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(code, message).with_span(span, self.text));
    }

    fn unresolved(&mut self, token: &Token) {
        self.report(
            KQL0100,
            format!(
                "The name '{}' does not refer to any known column, table, variable or function.",
                token.value
            ),
            token.span,
        );
    }

    fn bind_statement(&mut self, tokens: &[Token]) {
        let Some(first) = tokens.first() else {
            return;
        };
        if first.is_keyword("let") {
            self.bind_let(&tokens[1..]);
        } else if first.is_punct(".")
            || ["set", "declare", "alias", "restrict", "pattern"]
                .iter()
                .any(|k| first.is_keyword(k))
        {
            // control commands and query options are not bound
        } else if self.is_tabular(tokens) {
            self.bind_query(tokens);
        } else {
            self.check_expression(tokens, &Columns::empty());
        }
    }

    fn bind_let(&mut self, tokens: &[Token]) {
        let Some((name, value)) = assignment(tokens) else {
            return;
        };
        let binding = self.bind_value(value);
        self.scope.define(name.value.clone(), binding);
    }

    fn bind_value(&mut self, tokens: &[Token]) -> Binding {
        if tokens.first().is_some_and(|t| t.is_punct("(")) {
            if let Some(close) = matching_close(tokens, 0) {
                if tokens.get(close + 1).is_some_and(|t| t.is_punct("{")) {
                    self.bind_lambda(&tokens[1..close], &tokens[close + 1..]);
                    return Binding::Function;
                }
            }
        }

        if self.is_tabular(tokens) {
            Binding::Tabular(self.bind_query(tokens))
        } else {
            self.check_expression(tokens, &Columns::empty());
            Binding::Scalar
        }
    }

    /// Bind a function body with its parameters in scope
    fn bind_lambda(&mut self, parameters: &[Token], body: &[Token]) {
        let mut scope = self.scope.child();
        for parameter in split_top_level(parameters, ",") {
            let Some(name) = parameter.first().and_then(Token::name) else {
                continue;
            };
            // `T: (*)` and `T: (a: string)` are tabular parameters
            let tabular = parameter.get(2).is_some_and(|t| t.is_punct("("));
            let binding = if tabular {
                Binding::Tabular(Columns::open())
            } else {
                Binding::Scalar
            };
            scope.define(name, binding);
        }

        let Some(end) = matching_close(body, 0) else {
            return;
        };
        let inner = &body[1..end];
        let outer = std::mem::replace(&mut self.scope, scope);
        for statement in split_top_level(inner, ";") {
            self.bind_statement(statement);
        }
        self.scope = outer;
    }

    fn is_tabular(&self, tokens: &[Token]) -> bool {
        if split_top_level(tokens, "|").len() > 1 {
            return true;
        }
        let Some(first) = tokens.first() else {
            return false;
        };
        if first.is_punct("(") {
            return matching_close(tokens, 0).is_some_and(|close| self.is_tabular(&tokens[1..close]));
        }
        let Some(name) = first.name() else {
            return false;
        };
        if first.kind == TokenKind::Identifier
            && (OPEN_SOURCES.contains(&name)
                || ["print", "range", "datatable", "database", "cluster", "table"].contains(&name))
        {
            return true;
        }
        matches!(
            self.lookup(name),
            Named::Table(_) | Named::Let(Binding::Tabular(_))
        )
    }

    fn lookup(&self, name: &str) -> Named<'a> {
        if let Some(binding) = self.scope.lookup(name) {
            return Named::Let(binding.clone());
        }
        let Some(database) = self.globals.default_database() else {
            return Named::Unknown;
        };
        if database.is_placeholder() {
            return Named::Unchecked;
        }
        match database.member(name) {
            Some(Symbol::Table(table)) => Named::Table(table),
            Some(Symbol::Function(_)) => Named::Function,
            None => Named::Unknown,
        }
    }

    fn bind_query(&mut self, tokens: &[Token]) -> Columns {
        let mut segments = split_top_level(tokens, "|").into_iter();
        let Some(source) = segments.next() else {
            return Columns::open();
        };
        let mut columns = self.bind_source(source);
        for operator in segments {
            columns = self.bind_operator(operator, columns);
        }
        columns
    }

    fn bind_source(&mut self, tokens: &[Token]) -> Columns {
        let Some(first) = tokens.first() else {
            return Columns::open();
        };

        if first.is_punct("(") {
            return match matching_close(tokens, 0) {
                Some(close) => self.bind_query(&tokens[1..close]),
                None => Columns::open(),
            };
        }

        let args = &tokens[1..];
        let is_call = args.first().is_some_and(|t| t.is_punct("("));
        if first.kind == TokenKind::Identifier {
            match first.value.as_str() {
                "print" => return self.bind_print(args),
                "range" => return self.bind_range(args),
                "datatable" => return datatable_columns(args),
                "cluster" | "database" if is_call => return self.bind_qualified(tokens),
                "table" | "external_table" | "materialized_view" if is_call => {
                    return match literal_call(tokens, 0, &first.value) {
                        Some((literal, _)) => self.bind_table_name(literal),
                        None => Columns::open(),
                    };
                }
                name if OPEN_SOURCES.contains(&name) => return Columns::open(),
                _ => {}
            }
        }

        if first.name().is_none() {
            return Columns::open();
        }
        if is_call {
            // user or built-in tabular function
            if let Some(close) = matching_close(tokens, 1) {
                self.check_expression(&tokens[2..close], &Columns::empty());
            }
            return Columns::open();
        }
        self.bind_table_name(first)
    }

    fn bind_table_name(&mut self, token: &Token) -> Columns {
        match self.lookup(&token.value) {
            Named::Let(Binding::Tabular(columns)) => columns,
            Named::Table(table) => table_columns(table),
            Named::Let(_) | Named::Function | Named::Unchecked => Columns::open(),
            Named::Unknown => {
                self.unresolved(token);
                Columns::open()
            }
        }
    }

    fn find_cluster(&self, name: &str) -> Option<&'a ClusterSymbol> {
        self.globals
            .cluster(name)
            .or_else(|| self.globals.cluster(&full_host_name(name, self.domain)))
    }

    /// `database('d').T` or `cluster('c').database('d').T`
    fn bind_qualified(&mut self, tokens: &[Token]) -> Columns {
        let mut at = 0;
        let mut cluster = None;
        if let Some((literal, next)) = literal_call(tokens, 0, "cluster") {
            cluster = Some(literal);
            at = next + 1;
            if !tokens.get(next).is_some_and(|t| t.is_punct(".")) {
                return Columns::open();
            }
        }
        let Some((database, next)) = literal_call(tokens, at, "database") else {
            return Columns::open();
        };
        let member = match tokens.get(next..next + 2) {
            Some([dot, member]) if dot.is_punct(".") && member.name().is_some() => member,
            _ => return Columns::open(),
        };

        let cluster_symbol = match cluster {
            Some(literal) => self.find_cluster(&literal.value),
            None => self.globals.default_cluster(),
        };
        // an unknown cluster was never resolved, so nothing about it can be checked
        let Some(cluster_symbol) = cluster_symbol else {
            return Columns::open();
        };

        let Some(db) = cluster_symbol.database(&database.value) else {
            if !cluster_symbol.is_open() {
                self.report(
                    KQL0101,
                    format!(
                        "The database '{}' does not exist on cluster '{}'.",
                        database.value,
                        cluster_symbol.name()
                    ),
                    database.span,
                );
            }
            return Columns::open();
        };
        if db.is_placeholder() {
            return Columns::open();
        }

        match db.member(&member.value) {
            Some(Symbol::Table(table)) => table_columns(table),
            Some(Symbol::Function(_)) => Columns::open(),
            None => {
                self.report(
                    KQL0102,
                    format!(
                        "The name '{}' does not refer to any table or function in database '{}'.",
                        member.value,
                        db.name()
                    ),
                    member.span,
                );
                Columns::open()
            }
        }
    }

    fn bind_print(&mut self, args: &[Token]) -> Columns {
        let mut columns = Columns::empty();
        for (index, item) in split_top_level(args, ",").into_iter().enumerate() {
            if item.is_empty() {
                continue;
            }
            match assignment(item) {
                Some((name, value)) => {
                    self.check_expression(value, &Columns::empty());
                    columns.add(name.value.clone());
                }
                None => {
                    self.check_expression(item, &Columns::empty());
                    columns.add(format!("print_{}", index));
                }
            }
        }
        columns
    }

    /// `range x from 1 to 10 step 1`
    fn bind_range(&mut self, args: &[Token]) -> Columns {
        let Some(name) = args.first().filter(|t| t.name().is_some()) else {
            return Columns::open();
        };
        self.check_expression(&args[1..], &Columns::empty());
        Columns::known([name.value.clone()])
    }

    fn bind_operator(&mut self, tokens: &[Token], columns: Columns) -> Columns {
        let Some(operator) = tokens.first() else {
            return columns;
        };
        if operator.kind != TokenKind::Identifier {
            return Columns::open();
        }
        let args = &tokens[1..];

        match operator.value.as_str() {
            "where" | "filter" | "take" | "limit" | "sample" | "top" | "sort" | "order" => {
                self.check_expression(args, &columns);
                columns
            }
            "extend" | "serialize" => self.bind_extend(args, columns),
            "project" => self.bind_project(args, &columns),
            "project-away" => {
                let mut result = columns.clone();
                for item in split_top_level(args, ",") {
                    if let Some(name) = self.check_column_list_item(item, &columns) {
                        result.remove(&name.value);
                    }
                }
                result
            }
            "project-keep" | "project-reorder" => {
                for item in split_top_level(args, ",") {
                    self.check_column_list_item(item, &columns);
                }
                columns
            }
            "project-rename" => {
                let mut result = columns.clone();
                for item in split_top_level(args, ",") {
                    if let Some((name, value)) = assignment(item) {
                        self.check_expression(value, &columns);
                        if let Some(old) = single_name(value) {
                            result.rename(&old.value, name.value.clone());
                        }
                    }
                }
                result
            }
            "summarize" => self.bind_summarize(args, &columns),
            "count" => Columns::known(["Count"]),
            "distinct" => {
                if args.iter().any(|t| t.is_punct("*")) {
                    return columns;
                }
                let mut result = Columns::empty();
                for item in split_top_level(args, ",") {
                    self.check_expression(item, &columns);
                    if let Some(name) = single_name(item) {
                        result.add(name.value.clone());
                    }
                }
                result
            }
            "as" => {
                if let Some(name) = args.iter().rev().find(|t| t.name().is_some()) {
                    self.scope.define(name.value.clone(), Binding::Tabular(columns.clone()));
                }
                columns
            }
            "render" => columns,
            "getschema" => Columns::known(["ColumnName", "ColumnOrdinal", "DataType", "ColumnType"]),
            other => {
                log::trace!("operator '{}' produces an open schema", other);
                Columns::open()
            }
        }
    }

    /// Check a `project-away` style item; wildcards are skipped
    fn check_column_list_item<'t>(&mut self, item: &'t [Token], columns: &Columns) -> Option<&'t Token> {
        if item.iter().any(|t| t.is_punct("*")) {
            return None;
        }
        self.check_expression(item, columns);
        single_name(item)
    }

    fn bind_extend(&mut self, args: &[Token], mut columns: Columns) -> Columns {
        for (index, item) in split_top_level(args, ",").into_iter().enumerate() {
            if item.is_empty() {
                continue;
            }
            match assignment(item) {
                Some((name, value)) => {
                    self.check_expression(value, &columns);
                    columns.add(name.value.clone());
                }
                None => {
                    self.check_expression(item, &columns);
                    if single_name(item).is_none() {
                        columns.add(format!("Column{}", index + 1));
                    }
                }
            }
        }
        columns
    }

    fn bind_project(&mut self, args: &[Token], columns: &Columns) -> Columns {
        let mut result = Columns::empty();
        let mut wildcard = false;
        for (index, item) in split_top_level(args, ",").into_iter().enumerate() {
            if item.is_empty() {
                continue;
            }
            if item.last().is_some_and(|t| t.is_punct("*")) && item.len() <= 2 {
                wildcard = true;
                continue;
            }
            match assignment(item) {
                Some((name, value)) => {
                    self.check_expression(value, columns);
                    result.add(name.value.clone());
                }
                None => {
                    self.check_expression(item, columns);
                    match single_name(item) {
                        Some(name) => result.add(name.value.clone()),
                        None => result.add(format!("Column{}", index + 1)),
                    }
                }
            }
        }

        if wildcard {
            if columns.is_open() {
                return Columns::open();
            }
            for name in columns.names() {
                result.add(name.clone());
            }
        }
        result
    }

    fn bind_summarize(&mut self, args: &[Token], columns: &Columns) -> Columns {
        let (aggregates, groups) = split_at_keyword(args, "by");
        let mut result = Columns::empty();

        for (index, item) in groups
            .map(|g| split_top_level(g, ","))
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            if item.is_empty() {
                continue;
            }
            match assignment(item) {
                Some((name, value)) => {
                    self.check_expression(value, columns);
                    result.add(name.value.clone());
                }
                None => {
                    self.check_expression(item, columns);
                    // `bin(Timestamp, 1h)` keeps the column's name
                    let name = item
                        .iter()
                        .enumerate()
                        .find(|(i, t)| t.name().is_some() && !item.get(i + 1).is_some_and(|n| n.is_punct("(")))
                        .map(|(_, t)| t.value.clone())
                        .unwrap_or_else(|| format!("Column{}", index + 1));
                    result.add(name);
                }
            }
        }

        for item in split_top_level(aggregates, ",") {
            if item.is_empty() {
                continue;
            }
            match assignment(item) {
                Some((name, value)) => {
                    self.check_expression(value, columns);
                    result.add(name.value.clone());
                }
                None => {
                    self.check_expression(item, columns);
                    result.add(aggregate_name(item));
                }
            }
        }
        result
    }

    /// Report names in an expression that are not columns, variables or tables
    fn check_expression(&mut self, tokens: &[Token], columns: &Columns) {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            let next = tokens.get(i + 1);
            let is_call = next.is_some_and(|t| t.is_punct("("));

            if token.is_punct("(") {
                if let Some(close) = matching_close(tokens, i) {
                    // a nested query is bound on its own
                    if split_top_level(&tokens[i + 1..close], "|").len() > 1 {
                        self.bind_query(&tokens[i + 1..close]);
                        i = close + 1;
                        continue;
                    }
                }
            } else if token.name().is_some() {
                if is_call && token.kind == TokenKind::Identifier && LITERAL_CALLS.contains(&token.value.as_str()) {
                    i = matching_close(tokens, i + 1).map_or(tokens.len(), |close| close + 1);
                    continue;
                }

                let member_access = i > 0 && tokens[i - 1].is_punct(".");
                let named_argument = next.is_some_and(|t| t.is_punct("="));
                let type_name = i > 0 && tokens[i - 1].is_punct(":");
                let keyword = token.kind == TokenKind::Identifier
                    && EXPRESSION_KEYWORDS.contains(&token.value.as_str());

                if !(is_call || member_access || named_argument || type_name || keyword) {
                    self.check_name(token, columns);
                }
            }
            i += 1;
        }
    }

    fn check_name(&mut self, token: &Token, columns: &Columns) {
        if columns.contains(&token.value) {
            return;
        }
        if let Named::Unknown = self.lookup(&token.value) {
            self.unresolved(token);
        }
    }
}

fn table_columns(table: &TableSymbol) -> Columns {
    Columns::known(table.columns().iter().map(|c| c.name().to_string()))
}

/// `datatable (a: string, b: long) [ ... ]`
fn datatable_columns(args: &[Token]) -> Columns {
    if !args.first().is_some_and(|t| t.is_punct("(")) {
        return Columns::open();
    }
    let Some(close) = matching_close(args, 0) else {
        return Columns::open();
    };
    Columns::known(
        split_top_level(&args[1..close], ",")
            .into_iter()
            .filter_map(|column| column.first().and_then(Token::name))
            .map(str::to_string),
    )
}

/// Generated name of an unnamed aggregate: `count()` is `count_`, `sum(X)` is `sum_X`
fn aggregate_name(item: &[Token]) -> String {
    let Some(function) = item.first().and_then(Token::name) else {
        return "Column1".to_string();
    };
    let argument = match item {
        [_, open, argument, close] if open.is_punct("(") && close.is_punct(")") => argument.name(),
        _ => None,
    };
    format!("{}_{}", function, argument.unwrap_or_default())
}
