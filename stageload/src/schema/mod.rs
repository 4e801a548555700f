//! Schema description parser.
//!
//! Parses the compact table/column schema grammar into a [`SchemaModel`]:
//!
//! ```text
//! Table "users" {
//!   "id" int4 [pk, increment]
//!   "email" text [not null]
//!   "state" bpchar(2) [default: `XX`]
//! }
//! ```
//!
//! The grammar is line-oriented and deliberately permissive: unknown
//! constraint tokens are stored verbatim as boolean flags and non-column
//! lines inside a table are skipped. Only structural violations are fatal -
//! an unterminated table block, or a quoted column line whose type token
//! does not parse. This is a restricted parser for the subset in use, not
//! a general schema-language interpreter.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{SchemaError, SchemaResult};

static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^Table\s+"([^"]+)"\s*\{"#).unwrap());

static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"([^"]+)"\s+([\w\[\](),]+)(?:\s+\[(.+)\])?"#).unwrap());

// =============================================================================
// Schema Model
// =============================================================================

/// Constraints attached to one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnConstraints {
    /// Primary key.
    pub pk: bool,
    /// Not-null: absent values are a validation error.
    pub not_null: bool,
    /// Auto-increment.
    pub increment: bool,
    /// Default value, unwrapped from surrounding backticks/quotes.
    pub default: Option<String>,
    /// Any other bare token, stored verbatim.
    pub flags: BTreeSet<String>,
}

impl ColumnConstraints {
    /// Whether a constraint token is set, by its literal text.
    pub fn has(&self, token: &str) -> bool {
        match token {
            "pk" => self.pk,
            "not null" => self.not_null,
            "increment" => self.increment,
            other => self.flags.contains(other),
        }
    }
}

/// One column's declared storage type and constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    /// Raw schema-grammar type token, e.g. `"int4"`, `"bpchar(32)"`.
    pub type_token: String,
    pub constraints: ColumnConstraints,
}

/// Columns of one table, in declared order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSchema {
    columns: Vec<(String, ColumnSpec)>,
}

impl TableSchema {
    /// Declared columns, in order.
    pub fn columns(&self) -> &[(String, ColumnSpec)] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, spec)| spec)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The parsed schema description. Built once, read-only afterward.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaModel {
    tables: HashMap<String, TableSchema>,
}

impl SchemaModel {
    /// Parse schema text.
    pub fn parse(text: &str) -> SchemaResult<Self> {
        let mut tables: HashMap<String, TableSchema> = HashMap::new();
        let mut current: Option<String> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if let Some(caps) = TABLE_RE.captures(line) {
                let name = caps[1].to_string();
                tables.entry(name.clone()).or_default();
                current = Some(name);
            } else if line.starts_with('}') {
                current = None;
            } else if let Some(table) = &current {
                if !line.starts_with('"') {
                    // Indexes blocks, notes, blank lines: not ours to parse.
                    continue;
                }
                let caps = COLUMN_RE.captures(line).ok_or_else(|| {
                    SchemaError::MalformedColumn {
                        table: table.clone(),
                        line: line.to_string(),
                    }
                })?;

                let col_name = caps[1].to_string();
                let spec = ColumnSpec {
                    type_token: caps[2].to_string(),
                    constraints: parse_constraints(caps.get(3).map(|m| m.as_str())),
                };
                tables
                    .get_mut(table)
                    .expect("current table was inserted on open")
                    .columns
                    .push((col_name, spec));
            }
        }

        if let Some(open) = current {
            return Err(SchemaError::UnterminatedTable(open));
        }

        Ok(Self { tables })
    }

    /// Load and parse a schema description file.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn parse_constraints(raw: Option<&str>) -> ColumnConstraints {
    let mut constraints = ColumnConstraints::default();
    let Some(raw) = raw else {
        return constraints;
    };

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part == "pk" {
            constraints.pk = true;
        } else if part == "not null" {
            constraints.not_null = true;
        } else if part == "increment" {
            constraints.increment = true;
        } else if let Some(value) = part.strip_prefix("default:") {
            let value = value.trim().trim_matches(|c| c == '`' || c == '\'' || c == '"');
            constraints.default = Some(value.to_string());
        } else {
            // Unparseable fragments are stored verbatim, not rejected.
            constraints.flags.insert(part.to_string());
        }
    }

    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
Table "users" {
  "id" int4 [pk, increment]
  "email" text [not null]
  "state" bpchar(2) [default: `XX`]
  "tags" int4[]
  "bio" text
}

Table "trips" {
  "trip_id" int8 [pk]
  "price" numeric(8,2) [not null]
  "started_at" timestamptz [not null]
}
"#;

    #[test]
    fn test_parse_types_and_constraints() {
        let model = SchemaModel::parse(SCHEMA).unwrap();
        let users = model.table("users").unwrap();

        let id = users.get("id").unwrap();
        assert_eq!(id.type_token, "int4");
        assert!(id.constraints.pk);
        assert!(id.constraints.increment);
        assert!(!id.constraints.not_null);

        let email = users.get("email").unwrap();
        assert_eq!(email.type_token, "text");
        assert!(email.constraints.has("not null"));
    }

    #[test]
    fn test_default_value_unwrapped() {
        let model = SchemaModel::parse(SCHEMA).unwrap();
        let state = model.table("users").unwrap().get("state").unwrap();
        assert_eq!(state.type_token, "bpchar(2)");
        assert_eq!(state.constraints.default.as_deref(), Some("XX"));
    }

    #[test]
    fn test_array_and_parenthesized_type_tokens() {
        let model = SchemaModel::parse(SCHEMA).unwrap();
        assert_eq!(
            model.table("users").unwrap().get("tags").unwrap().type_token,
            "int4[]"
        );
        assert_eq!(
            model.table("trips").unwrap().get("price").unwrap().type_token,
            "numeric(8,2)"
        );
    }

    #[test]
    fn test_unknown_constraint_stored_verbatim() {
        let model =
            SchemaModel::parse("Table \"t\" {\n  \"c\" int4 [unique, note: x]\n}\n").unwrap();
        let spec = model.table("t").unwrap().get("c").unwrap();
        assert!(spec.constraints.has("unique"));
        assert!(spec.constraints.has("note: x"));
    }

    #[test]
    fn test_column_order_preserved() {
        let model = SchemaModel::parse(SCHEMA).unwrap();
        let names: Vec<&str> = model
            .table("trips")
            .unwrap()
            .columns()
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["trip_id", "price", "started_at"]);
    }

    #[test]
    fn test_unterminated_table_is_fatal() {
        let err = SchemaModel::parse("Table \"open\" {\n  \"id\" int4\n").unwrap_err();
        assert!(matches!(err, SchemaError::UnterminatedTable(name) if name == "open"));
    }

    #[test]
    fn test_malformed_column_line_is_fatal() {
        // A quoted column with no type token is structural, not permissive.
        let err = SchemaModel::parse("Table \"t\" {\n  \"id\"\n}\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedColumn { .. }));
    }

    #[test]
    fn test_non_column_lines_skipped() {
        let text = "Table \"t\" {\n  Note: 'staging table'\n  \"id\" int4\n}\n";
        let model = SchemaModel::parse(text).unwrap();
        assert_eq!(model.table("t").unwrap().len(), 1);
    }
}
