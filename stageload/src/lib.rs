//! # Stageload - declarative CSV staging and schema validation
//!
//! Stageload ingests delimited text files, runs each column through a
//! configuration-declared chain of parse steps and a lenient type cast,
//! and validates re-exported staged rows against a separately authored
//! schema description.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Raw file   │────▶│   Parser    │────▶│  Transform   │────▶│  Canonical  │
//! │ (auto-enc)  │     │ (raw rows)  │     │ (steps+cast) │     │  name:type  │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//!                                                                     │
//!                                                              [storage seam]
//!                                                                     │
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐            ▼
//! │ Quarantine  │◀────│  Validator  │◀────│    Schema    │◀──── staged file
//! │ (+error col)│     │ (partition) │     │  description │     temp_<t>.csv
//! └─────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stageload::{process_file, Diagnostics, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::load("config.json")?;
//! let mut diags = Diagnostics::new();
//! let output = process_file(Path::new("raw/trips.csv"), &config, &mut diags)?;
//! println!("{}", output.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`diag`] - Explicit diagnostics sink (no ambient logging)
//! - [`models`] - Value model, semantic types, table results
//! - [`config`] - Declarative pipeline configuration
//! - [`parser`] - Source file reading with auto-detection
//! - [`transform`] - Parse steps, casting, processing, pipeline
//! - [`schema`] - Schema description parser
//! - [`validation`] - Staged-row validation and quarantine
//! - [`storage`] - Narrow storage seam

// Core modules
pub mod diag;
pub mod error;
pub mod models;

// Configuration
pub mod config;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Schema description
pub mod schema;

// Validation
pub mod validation;

// Storage seam
pub mod storage;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    PipelineError,
    ProcessError,
    SchemaError,
    StepError,
    StoreError,
    ValidationError,
};

// =============================================================================
// Re-exports - Diagnostics
// =============================================================================

pub use diag::{DiagLevel, Diagnostic, Diagnostics};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    split_canonical,
    table_name_from_path,
    CellValue,
    RawRow,
    SemanticType,
    TableResult,
    TypedRow,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ColumnRule, PipelineConfig, StepInvocation, TableConfig};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file_auto,
    parse_rows,
    CsvError,
    ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    build_pipeline,
    cast,
    process,
    process_dir,
    process_file,
    steps_description,
    write_table_csv,
    CompiledColumn,
    DirOutcome,
    DroppedRow,
    ParseStep,
    ProcessOutput,
};

// =============================================================================
// Re-exports - Schema & Validation
// =============================================================================

pub use schema::{ColumnConstraints, ColumnSpec, SchemaModel, TableSchema};

pub use validation::{check_value, validate_dir, validate_file, validate_rows, FileReport, RowPartition};

// =============================================================================
// Re-exports - Storage
// =============================================================================

pub use storage::{column_definitions, storage_type, MemoryStore, TableStore};
