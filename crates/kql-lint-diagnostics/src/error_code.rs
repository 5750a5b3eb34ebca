//! Error codes following a structured numbering system
//!
//! Error code ranges:
//! - KQL0001-KQL0099: Syntax errors (lexing, statement structure)
//! - KQL0100-KQL0199: Semantic errors (name resolution)
//! - KQL0300-KQL0399: Schema errors (loaders, schema cache)
//! - KQL0400-KQL0499: System errors (I/O, cancellation)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// The category this code belongs to
    pub const fn category(&self) -> Category {
        match self.0 {
            1..=99 => Category::Syntax,
            100..=199 => Category::Semantic,
            300..=399 => Category::Schema,
            _ => Category::System,
        }
    }

    /// Check if this is a syntax error (0001-0099)
    pub const fn is_syntax_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a semantic error (0100-0199)
    pub const fn is_semantic_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a schema error (0300-0399)
    pub const fn is_schema_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KQL{:04}", self.0)
    }
}

/// Error returned when a string is not a `KQL####` code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrorCodeError(pub String);

impl fmt::Display for ParseErrorCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code '{}'", self.0)
    }
}

impl std::error::Error for ParseErrorCodeError {}

impl FromStr for ErrorCode {
    type Err = ParseErrorCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .get(..3)
            .filter(|prefix| prefix.eq_ignore_ascii_case("kql"))
            .map(|_| &trimmed[3..])
            .ok_or_else(|| ParseErrorCodeError(s.to_string()))?;

        digits
            .parse::<u16>()
            .map(ErrorCode::new)
            .map_err(|_| ParseErrorCodeError(s.to_string()))
    }
}

/// Broad grouping of error codes, usable in ignore lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Syntax,
    Semantic,
    Schema,
    System,
}

impl Category {
    /// Parse a category name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "syntax" => Some(Self::Syntax),
            "semantic" => Some(Self::Semantic),
            "schema" => Some(Self::Schema),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Syntax => write!(f, "syntax"),
            Category::Semantic => write!(f, "semantic"),
            Category::Schema => write!(f, "schema"),
            Category::System => write!(f, "system"),
        }
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Syntax errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected character"));
    map.insert(2, ErrorInfo::new("Unterminated string literal"));
    map.insert(3, ErrorInfo::new("Unterminated bracketed name"));
    map.insert(4, ErrorInfo::new("Expected expression"));

    // Semantic errors (0100-0199)
    map.insert(100, ErrorInfo::new("Unresolved name")
        .with_help("Check the spelling, or configure a connection or schema cache for the database"));
    map.insert(101, ErrorInfo::new("Unknown database"));
    map.insert(102, ErrorInfo::new("Unknown database member"));
    map.insert(103, ErrorInfo::new("Unknown cluster"));

    // Schema errors (0300-0399)
    map.insert(300, ErrorInfo::new("Schema not found"));
    map.insert(301, ErrorInfo::new("Remote schema request failed"));
    map.insert(302, ErrorInfo::new("Schema cache write failed"));
    map.insert(303, ErrorInfo::new("Schema cache entry unreadable"));
    map.insert(304, ErrorInfo::new("Unmappable column type")
        .with_help("The remote endpoint reported a type this tool does not understand"));
    map.insert(305, ErrorInfo::new("Invalid connection string"));
    map.insert(306, ErrorInfo::new("Invalid schema text"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Operation cancelled"));
    map.insert(401, ErrorInfo::new("I/O error"));

    map
});

// Syntax errors
pub const KQL0001: ErrorCode = ErrorCode::new(1);
pub const KQL0002: ErrorCode = ErrorCode::new(2);
pub const KQL0003: ErrorCode = ErrorCode::new(3);
pub const KQL0004: ErrorCode = ErrorCode::new(4);

// Semantic errors
pub const KQL0100: ErrorCode = ErrorCode::new(100);
pub const KQL0101: ErrorCode = ErrorCode::new(101);
pub const KQL0102: ErrorCode = ErrorCode::new(102);
pub const KQL0103: ErrorCode = ErrorCode::new(103);

// Schema errors
pub const KQL0300: ErrorCode = ErrorCode::new(300);
pub const KQL0301: ErrorCode = ErrorCode::new(301);
pub const KQL0302: ErrorCode = ErrorCode::new(302);
pub const KQL0303: ErrorCode = ErrorCode::new(303);
pub const KQL0304: ErrorCode = ErrorCode::new(304);
pub const KQL0305: ErrorCode = ErrorCode::new(305);
pub const KQL0306: ErrorCode = ErrorCode::new(306);

// System errors
pub const KQL0400: ErrorCode = ErrorCode::new(400);
pub const KQL0401: ErrorCode = ErrorCode::new(401);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_error_code_display() {
        assert_eq!(KQL0001.to_string(), "KQL0001");
        assert_eq!(KQL0100.to_string(), "KQL0100");
    }

    #[test]
    fn test_error_categories() {
        assert!(KQL0001.is_syntax_error());
        assert!(!KQL0001.is_semantic_error());

        assert!(KQL0100.is_semantic_error());
        assert!(KQL0300.is_schema_error());
        assert!(KQL0400.is_system_error());

        assert_eq!(KQL0102.category(), Category::Semantic);
        assert_eq!(KQL0304.category(), Category::Schema);
    }

    #[rstest]
    #[case("KQL0100", Some(KQL0100))]
    #[case("kql0002", Some(KQL0002))]
    #[case(" KQL0304 ", Some(KQL0304))]
    #[case("KS142", None)]
    #[case("KQLabc", None)]
    fn test_parse_error_code(#[case] text: &str, #[case] expected: Option<ErrorCode>) {
        assert_eq!(text.parse::<ErrorCode>().ok(), expected);
    }

    #[test]
    fn test_error_info() {
        assert_eq!(KQL0100.info().description, "Unresolved name");
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
