//! Error types for the stageload pipeline.
//!
//! One error enum per stage, plus a top-level [`PipelineError`] that wraps
//! them all:
//!
//! - [`ConfigError`] - pipeline configuration loading and step resolution
//! - [`StepError`] - a strict parse step rejecting a row value
//! - [`ProcessError`] - table processing errors
//! - [`SchemaError`] - schema description parsing errors
//! - [`ValidationError`] - staged-file validation errors
//! - [`StoreError`] - storage seam errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration or building column pipelines.
///
/// All of these are fatal for the table whose configuration raised them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parse step name not present in the registry.
    #[error("Unknown parse step '{step}' for column '{column}' of table '{table}'")]
    UnknownStep {
        table: String,
        column: String,
        step: String,
    },

    /// A step argument literal that the registry cannot interpret.
    #[error("Invalid arguments for step '{step}': {message}")]
    BadStepArgs { step: String, message: String },

    /// A regex pattern that fails to compile at build time.
    #[error("Invalid pattern for step '{step}': {message}")]
    BadPattern { step: String, message: String },

    /// Failed to read the configuration file.
    #[error("Failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed configuration document.
    #[error("Malformed configuration: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Step Errors
// =============================================================================

/// A strict parse step rejecting its input.
///
/// Raised mid-chain by the numeric and datetime steps on unparseable
/// non-empty input; the processor responds by dropping the whole row.
/// The terminal type cast never raises this - it degrades to the original
/// value instead (see `transform::cast`).
#[derive(Debug, Error)]
pub enum StepError {
    /// Numeric step on non-numeric input.
    #[error("{step}: cannot parse '{value}' as a number")]
    NotNumeric { step: &'static str, value: String },

    /// Datetime step input not matching the configured format.
    #[error("{step}: '{value}' does not match format '{format}'")]
    BadDatetime {
        step: &'static str,
        format: String,
        value: String,
    },
}

// =============================================================================
// Processing Errors
// =============================================================================

/// Errors during table processing.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No configuration entry for the table derived from the file name.
    #[error("No configuration found for table '{0}'")]
    NoTableConfig(String),

    /// The source path yields no usable table name.
    #[error("Cannot derive a table name from '{0}'")]
    BadTableName(String),
}

// =============================================================================
// Schema Description Errors
// =============================================================================

/// Structural errors in the schema description text.
///
/// The grammar is deliberately permissive; only structural violations are
/// fatal, and they abort the whole validation run.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A `Table "…" {` block with no closing brace.
    #[error("Unterminated table block: '{0}'")]
    UnterminatedTable(String),

    /// A quoted column line inside a table that does not match the grammar.
    #[error("Malformed column line in table '{table}': {line}")]
    MalformedColumn { table: String, line: String },

    /// Failed to read the schema file.
    #[error("Failed to read schema description: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// I/O-level errors while validating staged files.
///
/// Per-row schema violations are not errors - they partition rows into the
/// quarantine output instead.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Failed to read a staged file or write a quarantine file.
    #[error("Validation IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed staged CSV.
    #[error("Staged CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the storage seam.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested table does not exist in the store.
    #[error("Table not found in store: {0}")]
    TableNotFound(String),

    /// Script execution rejected by the store.
    #[error("Script execution failed: {0}")]
    ScriptFailed(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`]
/// entry points. It wraps all lower-level errors and adds pipeline-specific
/// variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] crate::parser::CsvError),

    /// Table processing error.
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    /// Schema description error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Staged-file validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage seam error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Canonical CSV output error.
    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    /// IO error outside any specific stage.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for individual step application.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for table processing.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Result type for schema parsing.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for staged-file validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ProcessError -> PipelineError
        let process_err = ProcessError::NoTableConfig("trips".into());
        let pipeline_err: PipelineError = process_err.into();
        assert!(pipeline_err.to_string().contains("trips"));

        // SchemaError -> PipelineError
        let schema_err = SchemaError::UnterminatedTable("users".into());
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("users"));
    }

    #[test]
    fn test_unknown_step_scoped_to_table() {
        let err = ConfigError::UnknownStep {
            table: "trips".into(),
            column: "price".into(),
            step: "Frobnicate".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Frobnicate"));
        assert!(msg.contains("trips"));
        assert!(msg.contains("price"));
    }

    #[test]
    fn test_step_error_format() {
        let err = StepError::NotNumeric {
            step: "ToInt",
            value: "abc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ToInt"));
        assert!(msg.contains("abc"));
    }
}
