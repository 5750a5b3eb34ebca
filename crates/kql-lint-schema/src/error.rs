//! Schema loading errors

use kql_lint_diagnostics::{
    Diagnostic, ErrorCode, KQL0300, KQL0301, KQL0302, KQL0303, KQL0305, KQL0400,
};
use kql_lint_symbols::SymbolError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The cluster or database does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A remote request failed: unreachable endpoint, authentication, or a bad response
    #[error("Request to '{cluster}' failed: {message}")]
    Remote { cluster: String, message: String },

    /// Symbols could not be built from what the source returned
    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("Could not read schema cache file {}: {message}", path.display())]
    CacheRead { path: PathBuf, message: String },

    #[error("Could not write schema cache file {}: {message}", path.display())]
    CacheWrite { path: PathBuf, message: String },

    #[error("Invalid connection string: {0}")]
    InvalidConnection(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SchemaError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn remote(cluster: impl Into<String>, message: impl ToString) -> Self {
        Self::Remote {
            cluster: cluster.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => KQL0300,
            Self::Remote { .. } => KQL0301,
            Self::Symbol(e) => e.code(),
            Self::CacheRead { .. } => KQL0303,
            Self::CacheWrite { .. } => KQL0302,
            Self::InvalidConnection(_) => KQL0305,
            Self::Cancelled => KQL0400,
        }
    }

    /// Errors that are raised even when the caller did not ask for strict loading.
    ///
    /// An unmappable column type means the remote protocol changed under us, and a
    /// cancelled load must never be mistaken for a missing database.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Symbol(SymbolError::UnknownClrType(_))
                | Self::InvalidConnection(_)
                | Self::Cancelled
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
