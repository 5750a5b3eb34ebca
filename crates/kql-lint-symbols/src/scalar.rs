//! Scalar column types

use crate::SymbolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of scalar types a column can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    Long,
    Real,
    Decimal,
    Guid,
    DateTime,
    TimeSpan,
    String,
    Bool,
    Dynamic,
    Type,
}

impl ScalarType {
    /// Map a runtime type name, as reported by the remote schema commands, to a scalar type.
    ///
    /// Unsigned 32-bit integers widen to `long`; unsigned 64-bit integers and
    /// `SqlDecimal` map to `decimal`. Unknown names are a configuration error.
    pub fn from_clr_type_name(name: &str) -> Result<Self, SymbolError> {
        let ty = match name {
            "System.Byte" | "Byte" | "byte" | "System.SByte" | "SByte" | "sbyte"
            | "System.Int16" | "Int16" | "short" | "System.UInt16" | "UInt16" | "ushort"
            | "System.Int32" | "Int32" | "int" => Self::Int,
            "System.UInt32" | "UInt32" | "uint" | "System.Int64" | "Int64" | "long" => Self::Long,
            "System.Double" | "Double" | "double" | "float" | "System.single"
            | "System.Single" => Self::Real,
            "System.UInt64" | "UInt64" | "ulong" | "System.Decimal" | "Decimal" | "decimal"
            | "System.Data.SqlTypes.SqlDecimal" | "SqlDecimal" => Self::Decimal,
            "System.Guid" | "Guid" => Self::Guid,
            "System.DateTime" | "DateTime" => Self::DateTime,
            "System.TimeSpan" | "TimeSpan" => Self::TimeSpan,
            "System.String" | "String" | "string" => Self::String,
            "System.Boolean" | "Boolean" | "bool" => Self::Bool,
            "System.Object" | "Object" | "object" => Self::Dynamic,
            "System.Type" | "Type" => Self::Type,
            _ => return Err(SymbolError::UnknownClrType(name.to_string())),
        };
        Ok(ty)
    }

    /// Look up a type by its query-language name or one of its aliases
    pub fn from_kql_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "int" | "int32" => Self::Int,
            "long" | "int64" => Self::Long,
            "real" | "double" => Self::Real,
            "decimal" => Self::Decimal,
            "guid" | "uniqueid" => Self::Guid,
            "datetime" | "date" => Self::DateTime,
            "timespan" | "time" => Self::TimeSpan,
            "string" => Self::String,
            "bool" | "boolean" => Self::Bool,
            "dynamic" => Self::Dynamic,
            "type" => Self::Type,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical query-language name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Real => "real",
            Self::Decimal => "decimal",
            Self::Guid => "guid",
            Self::DateTime => "datetime",
            Self::TimeSpan => "timespan",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Dynamic => "dynamic",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
