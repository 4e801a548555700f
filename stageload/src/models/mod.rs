//! Domain models for the stageload pipeline.
//!
//! This module contains the core data structures used throughout the
//! pipeline:
//!
//! - [`CellValue`] - a typed (or still-raw) field value
//! - [`SemanticType`] - the logical type a column is declared to hold
//! - [`RawRow`] / [`TypedRow`] - row representations before/after processing
//! - [`TableResult`] - the canonical typed output of the table processor

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// Row Types
// =============================================================================

/// A source record: column name to raw string value.
///
/// A column may be absent entirely; an empty string is treated the same as
/// absent throughout the pipeline.
pub type RawRow = HashMap<String, String>;

/// A processed record keyed by canonical column name.
pub type TypedRow = HashMap<String, CellValue>;

// =============================================================================
// Cell Values
// =============================================================================

/// A single field value flowing through a column pipeline.
///
/// Values start life as [`CellValue::Text`] (or [`CellValue::Null`] for
/// absent fields) and may become typed by parse steps or the terminal cast.
/// A value the lenient caster could not convert stays `Text` - the raw
/// input is never lost.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Absent or explicitly null.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Text(String),
}

impl CellValue {
    /// Build from a raw source field; empty strings count as absent.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => CellValue::Null,
            Some(s) if s.is_empty() => CellValue::Null,
            Some(s) => CellValue::Text(s.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Borrow the inner string if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render for delimited output. `Null` renders as the empty field.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(x) => x.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::TimestampTz(ts) => ts.format("%Y-%m-%d %H:%M:%S%z").to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_field())
    }
}

// =============================================================================
// Semantic Types
// =============================================================================

/// The logical value kind a column is declared to hold, independent of its
/// storage representation.
///
/// Drives the terminal cast of each column pipeline and the type token
/// embedded in canonical output headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    Boolean,
    Integer,
    Float,
    Date,
    Timestamp,
    #[serde(rename = "TimestampWithZone")]
    TimestampTz,
    String,
}

impl Default for SemanticType {
    fn default() -> Self {
        SemanticType::String
    }
}

impl SemanticType {
    /// The token embedded in canonical `name:type` headers.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            SemanticType::Boolean => "Boolean",
            SemanticType::Integer => "Integer",
            SemanticType::Float => "Float",
            SemanticType::Date => "Date",
            SemanticType::Timestamp => "Timestamp",
            SemanticType::TimestampTz => "TimestampWithZone",
            SemanticType::String => "String",
        }
    }

    /// Parse a header type token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "boolean" | "bool" => Some(SemanticType::Boolean),
            "integer" | "int" => Some(SemanticType::Integer),
            "float" => Some(SemanticType::Float),
            "date" => Some(SemanticType::Date),
            "timestamp" => Some(SemanticType::Timestamp),
            "timestampwithzone" | "timestamptz" => Some(SemanticType::TimestampTz),
            "string" | "str" | "text" => Some(SemanticType::String),
            _ => None,
        }
    }

    /// Rename a column header to the canonical `name:type` form.
    ///
    /// Idempotent: a header that already carries this type's suffix is
    /// returned unchanged, so repeated renaming never double-appends.
    pub fn canonical_column(&self, name: &str) -> String {
        let suffix = format!(":{}", self.canonical_name());
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        }
    }
}

/// Split a canonical `name:type` header back into its parts.
///
/// Headers without a recognized type suffix yield `(header, None)`.
pub fn split_canonical(header: &str) -> (&str, Option<SemanticType>) {
    match header.rsplit_once(':') {
        Some((name, token)) => match SemanticType::from_token(token) {
            Some(ty) => (name, Some(ty)),
            None => (header, None),
        },
        None => (header, None),
    }
}

// =============================================================================
// Table Result
// =============================================================================

/// The canonical typed output of processing one source file.
///
/// `columns` holds the canonical `name:type` headers in configuration
/// order; `rows` preserve source order among surviving rows and are keyed
/// by those canonical names. Produced once by the table processor and not
/// mutated afterward.
#[derive(Debug, Clone)]
pub struct TableResult {
    /// Table name derived from the source file's base name.
    pub table_name: String,
    /// Canonical `name:type` headers, in declared column order.
    pub columns: Vec<String>,
    /// Surviving rows, in source order.
    pub rows: Vec<TypedRow>,
}

impl TableResult {
    /// Summary line for progress output.
    pub fn summary(&self) -> String {
        format!(
            "table '{}': {} rows, {} columns",
            self.table_name,
            self.rows.len(),
            self.columns.len()
        )
    }
}

/// Derive a table name from a source file path: strip the directory and the
/// final extension.
pub fn table_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
