//! Staged-row validation against the parsed schema description.
//!
//! Checks re-exported rows column by column against a [`SchemaModel`],
//! partitioning each file's rows into valid and invalid. Invalid rows are
//! quarantined: written to the invalid-rows location under the same file
//! name, with a trailing `error` column carrying every failed check joined
//! by `"; "`.
//!
//! Staged files are expected to be named `temp_<table>.csv`; anything else
//! is skipped with a notice, as is a table missing from the schema. Schema
//! columns absent from a file's header are reported once per file, not per
//! row.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diag::Diagnostics;
use crate::error::ValidationResult;
use crate::models::RawRow;
use crate::schema::{ColumnSpec, SchemaModel, TableSchema};

static STAGED_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^temp_(.+)\.csv$").unwrap());

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(\.\d+)?([+-]\d{2}(:?\d{2})?)?$").unwrap()
});

static BPCHAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bpchar\((\d+)\)$").unwrap());

/// Integer-family schema type tokens.
const INT_TYPES: [&str; 6] = ["int4", "int2", "int8", "integer", "smallint", "bigint"];

/// Boolean literals accepted by the validator, lowercased.
const BOOL_LITERALS: [&str; 6] = ["true", "false", "1", "0", "t", "f"];

// =============================================================================
// Value Checks
// =============================================================================

/// Check one field value against its column spec.
///
/// `""` and the literal `NULL` sentinel count as absent: an error under
/// `not null`, valid otherwise (with no further type check). Unrecognized,
/// array, and text types are accepted unconditionally.
pub fn check_value(value: &str, spec: &ColumnSpec) -> Result<(), String> {
    let val = value.trim();
    let col_type = spec.type_token.to_lowercase();

    if val.is_empty() || val == "NULL" {
        if spec.constraints.not_null {
            return Err("Value is required (not null constraint)".to_string());
        }
        return Ok(());
    }

    if INT_TYPES.contains(&col_type.as_str()) {
        if val.parse::<i64>().is_err() {
            return Err("Invalid integer value".to_string());
        }
    } else if col_type.starts_with("numeric") || col_type.starts_with("decimal") {
        if val.parse::<f64>().is_err() {
            return Err("Invalid numeric value".to_string());
        }
    } else if col_type == "bool" {
        if !BOOL_LITERALS.contains(&val.to_lowercase().as_str()) {
            return Err("Invalid boolean value".to_string());
        }
    } else if col_type == "date" {
        // Shape plus calendar validity: "2024-13-40" has the right shape
        // but is not a date.
        if !DATE_RE.is_match(val)
            || chrono::NaiveDate::parse_from_str(val, "%Y-%m-%d").is_err()
        {
            return Err("Invalid date format (expected YYYY-MM-DD)".to_string());
        }
    } else if col_type == "timestamp" || col_type == "timestamptz" {
        if !TIMESTAMP_RE.is_match(val) {
            return Err("Invalid timestamp format".to_string());
        }
    } else if let Some(caps) = BPCHAR_RE.captures(&col_type) {
        let max_len: usize = caps[1].parse().unwrap_or(usize::MAX);
        if val.chars().count() > max_len {
            return Err(format!("String too long for bpchar({})", max_len));
        }
    }

    Ok(())
}

// =============================================================================
// Row Partition
// =============================================================================

/// Result of validating one file's rows.
#[derive(Debug, Default)]
pub struct RowPartition {
    /// Rows with zero errors, in source order.
    pub valid: Vec<RawRow>,
    /// Rows with at least one error, each annotated with its messages
    /// joined by `"; "`.
    pub invalid: Vec<(RawRow, String)>,
}

impl RowPartition {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

/// Validate rows against one table's schema.
///
/// Every declared column is checked in order; a row accumulates one
/// message per failing column. Schema columns missing from `header` are
/// reported once as a file-level warning against `table_name`.
pub fn validate_rows(
    rows: Vec<RawRow>,
    header: &[String],
    table: &TableSchema,
    table_name: &str,
    diags: &mut Diagnostics,
) -> RowPartition {
    let present: HashSet<&str> = header.iter().map(|h| h.as_str()).collect();
    let missing: Vec<&str> = table
        .columns()
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| !present.contains(name))
        .collect();
    if !missing.is_empty() {
        diags.warn(
            table_name,
            format!("columns missing from staged file: {}", missing.join(", ")),
        );
    }

    let mut partition = RowPartition::default();

    for row in rows {
        let mut errors = Vec::new();
        for (col_name, spec) in table.columns() {
            let value = row.get(col_name).map(|s| s.as_str()).unwrap_or("");
            if let Err(message) = check_value(value, spec) {
                errors.push(format!("{}: {}", col_name, message));
            }
        }

        if errors.is_empty() {
            partition.valid.push(row);
        } else {
            partition.invalid.push((row, errors.join("; ")));
        }
    }

    partition
}

// =============================================================================
// File Validation & Quarantine
// =============================================================================

/// Outcome of validating one staged file.
#[derive(Debug)]
pub struct FileReport {
    /// Staged file name.
    pub file: String,
    /// Table the file stages.
    pub table: String,
    /// Count of valid rows.
    pub valid_rows: usize,
    /// Count of quarantined rows.
    pub invalid_rows: usize,
    /// Where invalid rows were written, if any.
    pub quarantine: Option<PathBuf>,
}

/// Validate one staged CSV file, quarantining invalid rows.
///
/// Returns `Ok(None)` when the file is skipped: its name does not match
/// `temp_<table>.csv`, or the table is not present in the schema. Both are
/// recorded as notices, not errors.
pub fn validate_file(
    csv_path: &Path,
    schema: &SchemaModel,
    invalid_dir: &Path,
    diags: &mut Diagnostics,
) -> ValidationResult<Option<FileReport>> {
    let file_name = csv_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let Some(caps) = STAGED_NAME_RE.captures(&file_name) else {
        diags.notice(
            &file_name,
            "file name does not match pattern 'temp_<table>.csv', skipping",
        );
        return Ok(None);
    };
    let table_name = caps[1].to_string();

    let Some(table) = schema.table(&table_name) else {
        diags.notice(
            &file_name,
            format!("table '{}' not found in schema, skipping", table_name),
        );
        return Ok(None);
    };

    let mut reader = csv::Reader::from_path(csv_path)?;
    let header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = header
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    let partition = validate_rows(rows, &header, table, &table_name, diags);

    let quarantine = if partition.invalid.is_empty() {
        None
    } else {
        let path = write_quarantine(invalid_dir, &file_name, &header, &partition.invalid)?;
        diags.warn(
            &file_name,
            format!(
                "{} invalid rows written to {}",
                partition.invalid.len(),
                path.display()
            ),
        );
        Some(path)
    };

    Ok(Some(FileReport {
        file: file_name,
        table: table_name,
        valid_rows: partition.valid.len(),
        invalid_rows: partition.invalid.len(),
        quarantine,
    }))
}

/// Validate every `temp_*.csv` in a staged directory.
pub fn validate_dir(
    staged_dir: &Path,
    schema: &SchemaModel,
    invalid_dir: &Path,
    diags: &mut Diagnostics,
) -> ValidationResult<Vec<FileReport>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(staged_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    paths.sort();

    let mut reports = Vec::new();
    for path in paths {
        if let Some(report) = validate_file(&path, schema, invalid_dir, diags)? {
            reports.push(report);
        }
    }
    Ok(reports)
}

fn write_quarantine(
    invalid_dir: &Path,
    file_name: &str,
    header: &[String],
    invalid: &[(RawRow, String)],
) -> ValidationResult<PathBuf> {
    std::fs::create_dir_all(invalid_dir)?;
    let path = invalid_dir.join(file_name);

    let mut writer = csv::Writer::from_path(&path)?;

    let mut out_header: Vec<&str> = header.iter().map(|h| h.as_str()).collect();
    if !out_header.contains(&"error") {
        out_header.push("error");
    }
    writer.write_record(&out_header)?;

    for (row, error) in invalid {
        let mut record: Vec<&str> = header
            .iter()
            .map(|col| row.get(col).map(|s| s.as_str()).unwrap_or(""))
            .collect();
        record.push(error);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(path)
}
