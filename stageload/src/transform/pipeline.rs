//! High-level pipeline API: one source file in, one canonical table out.
//!
//! Combines parsing, configuration lookup, column processing, and
//! canonical CSV output. The table name is derived from the source file's
//! base name; a file whose table has no configuration fails fatally, but
//! only for that file - a directory sweep carries on with the rest.
//!
//! # Example
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

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::diag::Diagnostics;
use crate::error::{PipelineError, PipelineResult, ProcessError};
use crate::models::{table_name_from_path, TableResult};
use crate::parser::parse_file_auto;

use super::processor::{process, ProcessOutput};

/// Process one source file into a canonical typed table.
///
/// Fails fatally (for this file only) when the derived table name has no
/// configuration entry.
pub fn process_file(
    path: &Path,
    config: &PipelineConfig,
    diags: &mut Diagnostics,
) -> PipelineResult<ProcessOutput> {
    let table_name = table_name_from_path(path)
        .ok_or_else(|| ProcessError::BadTableName(path.display().to_string()))?;

    let table_config = config
        .table(&table_name)
        .ok_or_else(|| ProcessError::NoTableConfig(table_name.clone()))?;

    let parsed = parse_file_auto(path)?;
    diags.notice(
        &table_name,
        format!(
            "read {} rows ({}, delimiter '{}')",
            parsed.records.len(),
            parsed.encoding,
            if parsed.delimiter == '\t' {
                "\\t".to_string()
            } else {
                parsed.delimiter.to_string()
            }
        ),
    );

    let output = process(&table_name, &parsed.records, table_config, diags)?;
    diags.notice(&table_name, output.summary());
    Ok(output)
}

/// Write a canonical typed table as delimited text.
///
/// The header row carries the `name:type` columns the storage loader
/// depends on.
pub fn write_table_csv(table: &TableResult, path: &Path) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;

    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|col| row.get(col).map(|v| v.to_field()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Outcome of sweeping a directory of source files.
#[derive(Debug)]
pub struct DirOutcome {
    /// Successfully processed tables, in file-name order.
    pub processed: Vec<ProcessOutput>,
    /// Files that failed, with the error that stopped them.
    pub failures: Vec<(String, PipelineError)>,
}

/// Process every `*.csv` in a directory.
///
/// Each file is its own failure unit: a missing configuration or a parse
/// error is recorded and the sweep continues. With `out_dir` set, each
/// processed table is also written there as `<table>.csv`.
pub fn process_dir(
    dir: &Path,
    config: &PipelineConfig,
    out_dir: Option<&Path>,
    diags: &mut Diagnostics,
) -> PipelineResult<DirOutcome> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    paths.sort();

    if let Some(out_dir) = out_dir {
        std::fs::create_dir_all(out_dir)?;
    }

    let mut outcome = DirOutcome {
        processed: Vec::new(),
        failures: Vec::new(),
    };

    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let result = process_file(&path, config, diags).and_then(|output| {
            if let Some(out_dir) = out_dir {
                let target = out_dir.join(format!("{}.csv", output.table.table_name));
                write_table_csv(&output.table, &target)?;
            }
            Ok(output)
        });

        match result {
            Ok(output) => outcome.processed.push(output),
            Err(err) => {
                diags.warn(&file_name, format!("file skipped: {}", err));
                outcome.failures.push((file_name, err));
            }
        }
    }

    Ok(outcome)
}
