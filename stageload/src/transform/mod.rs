//! Transformation module.
//!
//! This module turns raw rows into canonical typed tables:
//! - Steps: the parse-step registry and column pipeline builder
//! - Cast: the lenient terminal type caster
//! - Processor: per-table row processing
//! - Pipeline: per-file and per-directory orchestration

pub mod cast;
pub mod pipeline;
pub mod processor;
pub mod steps;

pub use cast::cast;
pub use pipeline::{process_dir, process_file, write_table_csv, DirOutcome};
pub use processor::{process, DroppedRow, ProcessOutput};
pub use steps::{
    build_column, build_pipeline, resolve, steps_description, CompiledColumn, ParseStep,
};
