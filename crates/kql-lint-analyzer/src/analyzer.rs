//! Per-session analysis driver

use crate::engine::{AnalysisEngine, BasicAnalyzer};
use kql_lint_diagnostics::{Diagnostic, DiagnosticFilter};
use kql_lint_parser::QueryDocument;
use kql_lint_schema::{LoadOptions, SchemaError, SymbolResolver};
use kql_lint_symbols::GlobalState;

/// Outcome of analysing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// True when no diagnostics were reported
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            success: diagnostics.is_empty(),
            diagnostics,
        }
    }

    /// Rendered diagnostics, `(line, column): severity: message`
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(Diagnostic::render).collect()
    }
}

/// Analyses documents one after another against a schema snapshot that grows
/// as documents reference new clusters and databases
pub struct Analyzer {
    globals: GlobalState,
    resolver: Option<SymbolResolver>,
    engine: Box<dyn AnalysisEngine>,
    filter: DiagnosticFilter,
}

impl Analyzer {
    pub fn new(globals: GlobalState) -> Self {
        Self {
            globals,
            resolver: None,
            engine: Box::new(BasicAnalyzer::new()),
            filter: DiagnosticFilter::new(),
        }
    }

    /// Resolve explicit cluster and database references before analysis
    pub fn with_resolver(mut self, resolver: SymbolResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_engine(mut self, engine: impl AnalysisEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Drop diagnostics the filter ignores
    pub fn with_filter(mut self, filter: DiagnosticFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The current snapshot, including everything resolved so far
    pub fn globals(&self) -> &GlobalState {
        &self.globals
    }

    /// Parse, resolve and analyse a document.
    ///
    /// Only fatal loader errors (or any loader error under strict options) are
    /// returned as `Err`; everything else is a diagnostic in the result.
    pub async fn analyze(&mut self, text: &str, options: &LoadOptions) -> Result<AnalysisResult, SchemaError> {
        let document = QueryDocument::parse(text);

        if let Some(resolver) = &self.resolver {
            self.globals = resolver.resolve(&self.globals, &document, options).await?;
        }

        let mut diagnostics = document.diagnostics().to_vec();
        diagnostics.extend(self.engine.analyze(&self.globals, &document));
        diagnostics.sort_by_key(|d| d.location.as_ref().map_or(usize::MAX, |l| l.offset));

        let diagnostics = self.filter.apply(diagnostics);
        log::debug!("analysis produced {} diagnostic(s)", diagnostics.len());
        Ok(AnalysisResult::new(diagnostics))
    }
}
