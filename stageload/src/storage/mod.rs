//! Storage seam.
//!
//! The pipeline core performs no storage I/O itself. Loading canonical
//! tables, re-exporting staged rows, and running maintenance scripts all
//! go through the narrow [`TableStore`] trait; concrete backends live
//! behind it. [`MemoryStore`] is the in-process implementation used by
//! tests and the round-trip property.

use std::collections::HashMap;

use crate::error::{StoreResult, StoreError};
use crate::models::{split_canonical, RawRow, SemanticType, TableResult};

// =============================================================================
// Storage Type Mapping
// =============================================================================

/// Map a semantic type to the storage column type a loader should create.
///
/// `Timestamp` and `TimestampWithZone` intentionally stay distinct
/// (`TIMESTAMP` vs `TIMESTAMPTZ`).
pub fn storage_type(ty: SemanticType) -> &'static str {
    match ty {
        SemanticType::Boolean => "BOOLEAN",
        SemanticType::Integer => "INTEGER",
        SemanticType::Float => "DOUBLE PRECISION",
        SemanticType::Date => "DATE",
        SemanticType::Timestamp => "TIMESTAMP",
        SemanticType::TimestampTz => "TIMESTAMPTZ",
        SemanticType::String => "TEXT",
    }
}

/// Derive `(bare name, storage type)` pairs from canonical headers.
///
/// Headers without a recognized `:type` suffix keep their full text and
/// default to `TEXT`.
pub fn column_definitions(columns: &[String]) -> Vec<(String, &'static str)> {
    columns
        .iter()
        .map(|header| match split_canonical(header) {
            (name, Some(ty)) => (name.to_string(), storage_type(ty)),
            (name, None) => (name.to_string(), "TEXT"),
        })
        .collect()
}

// =============================================================================
// Table Store Trait
// =============================================================================

/// Narrow interface to external storage.
pub trait TableStore {
    /// Create-or-replace a table from a canonical typed result.
    fn load_table(&mut self, table: &TableResult) -> StoreResult<()>;

    /// Re-export a table's rows keyed by bare column name, values rendered
    /// as strings the way a CSV export would.
    fn export_table(&self, name: &str) -> StoreResult<Vec<RawRow>>;

    /// Run a maintenance script against the store.
    fn run_script(&mut self, script: &str) -> StoreResult<()>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

#[derive(Debug, Clone)]
struct StoredTable {
    /// Bare column names with their storage types, in load order.
    columns: Vec<(String, &'static str)>,
    /// Rendered field values, aligned with `columns`.
    rows: Vec<Vec<String>>,
}

/// In-process [`TableStore`] backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, StoredTable>,
    scripts: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage column definitions of a loaded table, in load order.
    pub fn table_columns(&self, name: &str) -> Option<&[(String, &'static str)]> {
        self.tables.get(name).map(|t| t.columns.as_slice())
    }

    /// Scripts run so far, in order.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}

impl TableStore for MemoryStore {
    fn load_table(&mut self, table: &TableResult) -> StoreResult<()> {
        let columns = column_definitions(&table.columns);

        let rows = table
            .rows
            .iter()
            .map(|typed| {
                table
                    .columns
                    .iter()
                    .map(|col| typed.get(col).map(|v| v.to_field()).unwrap_or_default())
                    .collect()
            })
            .collect();

        // Load replaces: same drop-and-recreate semantics as a staging
        // loader.
        self.tables
            .insert(table.table_name.clone(), StoredTable { columns, rows });
        Ok(())
    }

    fn export_table(&self, name: &str) -> StoreResult<Vec<RawRow>> {
        let stored = self
            .tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;

        Ok(stored
            .rows
            .iter()
            .map(|fields| {
                stored
                    .columns
                    .iter()
                    .zip(fields)
                    .map(|((col, _), value)| (col.clone(), value.clone()))
                    .collect()
            })
            .collect())
    }

    fn run_script(&mut self, script: &str) -> StoreResult<()> {
        if script.trim().is_empty() {
            return Err(StoreError::ScriptFailed("empty script".to_string()));
        }
        self.scripts.push(script.to_string());
        Ok(())
    }
}
