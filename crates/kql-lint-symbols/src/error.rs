//! Symbol construction errors

use kql_lint_diagnostics::{Diagnostic, ErrorCode, KQL0304, KQL0306};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// A remote column type name with no scalar counterpart.
    /// This signals a protocol mismatch and is never treated as a soft failure.
    #[error("Unhandled clr type: {0}")]
    UnknownClrType(String),

    #[error("Invalid schema text '{text}': {message}")]
    InvalidSchema { text: String, message: String },
}

impl SymbolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownClrType(_) => KQL0304,
            Self::InvalidSchema { .. } => KQL0306,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
