//! Diagnostics reported against a query document

use crate::{Category, ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the query cannot run as written
    Error,
    /// Warning - the query runs but is likely wrong
    Warning,
    /// Suggestion - a possible improvement
    Suggestion,
    /// Information - informational message
    Info,
}

impl Severity {
    /// Parse a severity name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "suggestion" => Some(Self::Suggestion),
            "info" | "information" => Some(Self::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Suggestion => write!(f, "suggestion"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message with location and context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the span (converts to location using provided source)
    pub fn with_span(mut self, span: Span, source: &str) -> Self {
        self.location = Some(SourceLocation::from_span(span, source));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn category(&self) -> Category {
        self.code.category()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic as a single report line:
    /// `(line, column): severity: message`, or `severity: message` without a location.
    pub fn render(&self) -> String {
        match &self.location {
            Some(loc) => format!("{}: {}: {}", loc, self.severity, self.message),
            None => format!("{}: {}", self.severity, self.message),
        }
    }

    /// Render with the severity colored for terminal output
    #[cfg(feature = "colored")]
    pub fn render_colored(&self) -> String {
        use colored::Colorize;

        let severity = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Suggestion | Severity::Info => self.severity.to_string().cyan(),
        };
        match &self.location {
            Some(loc) => format!("{}: {}: {}", loc, severity, self.message),
            None => format!("{}: {}", severity, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Filter that drops diagnostics by code, severity or category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticFilter {
    codes: Vec<ErrorCode>,
    severities: Vec<Severity>,
    categories: Vec<Category>,
}

impl DiagnosticFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ignore entry: an error code (`KQL0100`), a severity (`warning`)
    /// or a category (`schema`). Returns `false` if the entry is not recognized.
    pub fn ignore(&mut self, entry: &str) -> bool {
        if let Ok(code) = entry.parse::<ErrorCode>() {
            self.codes.push(code);
        } else if let Some(severity) = Severity::parse(entry) {
            self.severities.push(severity);
        } else if let Some(category) = Category::parse(entry) {
            self.categories.push(category);
        } else {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.severities.is_empty() && self.categories.is_empty()
    }

    /// Whether the diagnostic should be reported
    pub fn allows(&self, diagnostic: &Diagnostic) -> bool {
        !(self.codes.contains(&diagnostic.code)
            || self.severities.contains(&diagnostic.severity)
            || self.categories.contains(&diagnostic.category()))
    }

    pub fn apply(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics.into_iter().filter(|d| self.allows(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KQL0001, KQL0100, KQL0302};

    #[test]
    fn test_render_with_location() {
        let diag = Diagnostic::error(KQL0100, "The name 'y' does not refer to any known column, table, variable or function.")
            .with_span(Span::new(19, 20), "print x=10 | where y > 0");

        assert_eq!(
            diag.render(),
            "(1, 20): error: The name 'y' does not refer to any known column, table, variable or function."
        );
    }

    #[test]
    fn test_render_without_location() {
        let diag = Diagnostic::warning(KQL0302, "could not write cache");
        assert_eq!(diag.render(), "warning: could not write cache");
        assert!(diag.to_string().contains("KQL0302"));
    }

    #[test]
    fn test_filter_by_code_severity_and_category() {
        let unresolved = Diagnostic::error(KQL0100, "unresolved");
        let syntax = Diagnostic::error(KQL0001, "syntax");
        let warning = Diagnostic::warning(KQL0302, "cache");

        let mut filter = DiagnosticFilter::new();
        assert!(filter.is_empty());
        assert!(filter.ignore("KQL0100"));
        assert!(!filter.allows(&unresolved));
        assert!(filter.allows(&syntax));

        assert!(filter.ignore("warning"));
        assert!(!filter.allows(&warning));

        assert!(filter.ignore("syntax"));
        assert!(!filter.allows(&syntax));

        assert!(!filter.ignore("nonsense"));
        assert!(filter.apply(vec![unresolved, syntax, warning]).is_empty());
    }
}
