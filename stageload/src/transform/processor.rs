//! Table processor: applies built column pipelines to raw rows.
//!
//! One call processes one table's worth of raw rows into a
//! [`TableResult`] with canonical `name:type` headers. Rows survive only
//! if every configured column passes: a missing required value or a
//! failing strict step drops the whole row, never a single field.

use crate::config::TableConfig;
use crate::diag::Diagnostics;
use crate::error::ConfigResult;
use crate::models::{CellValue, RawRow, TableResult, TypedRow};

use super::cast::cast;
use super::steps::{build_pipeline, CompiledColumn};

/// A row excluded from the output, with the column that caused it.
#[derive(Debug, Clone)]
pub struct DroppedRow {
    /// Zero-based index into the source records.
    pub row: usize,
    /// Column whose check or step failed.
    pub column: String,
    /// What happened.
    pub reason: String,
}

/// Result of processing one table.
#[derive(Debug)]
pub struct ProcessOutput {
    /// The canonical typed table.
    pub table: TableResult,
    /// Rows excluded from the output, in source order.
    pub dropped: Vec<DroppedRow>,
}

impl ProcessOutput {
    /// Summary line for progress output.
    pub fn summary(&self) -> String {
        format!(
            "{} ({} rows dropped)",
            self.table.summary(),
            self.dropped.len()
        )
    }
}

/// Process raw rows through the table's column pipelines.
///
/// Per configured column, in declared order:
/// 1. absent-or-empty required values drop the row before any chain runs;
/// 2. the step chain runs in order, a failing step drops the row with a
///    warning;
/// 3. the terminal lenient cast produces the typed value (never fails);
/// 4. the output header is the canonical `name:type` rename.
///
/// Output preserves source order among surviving rows. Columns absent from
/// the source entirely yield absent values for every row.
pub fn process(
    table_name: &str,
    records: &[RawRow],
    config: &TableConfig,
    diags: &mut Diagnostics,
) -> ConfigResult<ProcessOutput> {
    let pipeline = build_pipeline(table_name, config)?;

    let columns: Vec<String> = pipeline.iter().map(|col| col.canonical_name()).collect();

    let mut rows = Vec::new();
    let mut dropped = Vec::new();

    'rows: for (idx, record) in records.iter().enumerate() {
        // Required scan first: no chain runs for a row that is going to be
        // excluded anyway, so a partial chain never observes it.
        for col in pipeline.iter().filter(|c| c.required) {
            if is_absent(record, col) {
                dropped.push(DroppedRow {
                    row: idx,
                    column: col.name.clone(),
                    reason: "required value missing".to_string(),
                });
                continue 'rows;
            }
        }

        let mut typed = TypedRow::new();
        for col in &pipeline {
            let raw = record.get(&col.name).map(|s| s.as_str());
            let scope = format!("{}.{}", table_name, col.name);

            let value = match col.run_chain(CellValue::from_raw(raw)) {
                Ok(value) => value,
                Err(err) => {
                    diags.warn(&scope, format!("row {}: {}; row dropped", idx, err));
                    dropped.push(DroppedRow {
                        row: idx,
                        column: col.name.clone(),
                        reason: err.to_string(),
                    });
                    continue 'rows;
                }
            };

            let value = cast(col.target_type, value, &scope, diags);
            typed.insert(col.canonical_name(), value);
        }

        rows.push(typed);
    }

    Ok(ProcessOutput {
        table: TableResult {
            table_name: table_name.to_string(),
            columns,
            rows,
        },
        dropped,
    })
}

fn is_absent(record: &RawRow, col: &CompiledColumn) -> bool {
    match record.get(&col.name) {
        None => true,
        Some(s) => s.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::SemanticType;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn trips_config() -> PipelineConfig {
        PipelineConfig::from_json(
            r#"{
                "trips": {
                    "trip_id": { "required": true, "type": "Integer" },
                    "price":   { "type": "Float", "parse": [ { "Replace": ["$", ""] }, { "ToFloat": 2 } ] },
                    "city":    { "type": "String", "parse": [ { "ToUpper": null } ] }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_headers_in_declared_order() {
        let config = trips_config();
        let mut diags = Diagnostics::new();
        let out = process("trips", &[], config.table("trips").unwrap(), &mut diags).unwrap();

        assert_eq!(
            out.table.columns,
            vec!["trip_id:Integer", "price:Float", "city:String"]
        );
    }

    #[test]
    fn test_required_column_drops_row() {
        let config = trips_config();
        let records = vec![
            row(&[("trip_id", "1"), ("price", "$10.00"), ("city", "lyon")]),
            row(&[("trip_id", ""), ("price", "$3.00"), ("city", "nice")]),
            row(&[("price", "$4.00"), ("city", "metz")]),
            row(&[("trip_id", "4"), ("price", "$2.50"), ("city", "pau")]),
        ];

        let mut diags = Diagnostics::new();
        let out = process("trips", &records, config.table("trips").unwrap(), &mut diags).unwrap();

        // Empty and absent both count as missing; survivors keep source order.
        assert_eq!(out.table.rows.len(), 2);
        assert_eq!(out.dropped.len(), 2);
        assert_eq!(
            out.table.rows[0].get("trip_id:Integer"),
            Some(&CellValue::Int(1))
        );
        assert_eq!(
            out.table.rows[1].get("trip_id:Integer"),
            Some(&CellValue::Int(4))
        );
    }

    #[test]
    fn test_chain_then_cast() {
        let config = trips_config();
        let records = vec![row(&[
            ("trip_id", "7"),
            ("price", "$12.345"),
            ("city", "brest"),
        ])];

        let mut diags = Diagnostics::new();
        let out = process("trips", &records, config.table("trips").unwrap(), &mut diags).unwrap();

        let typed = &out.table.rows[0];
        assert_eq!(typed.get("price:Float"), Some(&CellValue::Float(12.35)));
        assert_eq!(
            typed.get("city:String"),
            Some(&CellValue::Text("BREST".to_string()))
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_strict_step_drops_row_lenient_cast_keeps_it() {
        // Same unparseable value, opposite policies: ToInt as a chain step
        // drops the row; Integer as the terminal cast passes it through.
        let config = PipelineConfig::from_json(
            r#"{
                "strict":  { "n": { "parse": [ { "ToInt": null } ], "type": "Integer" } },
                "lenient": { "n": { "type": "Integer" } }
            }"#,
        )
        .unwrap();
        let records = vec![row(&[("n", "abc")])];

        let mut diags = Diagnostics::new();
        let strict = process("strict", &records, config.table("strict").unwrap(), &mut diags)
            .unwrap();
        assert!(strict.table.rows.is_empty());
        assert_eq!(strict.dropped.len(), 1);
        assert_eq!(strict.dropped[0].column, "n");
        assert_eq!(diags.warnings().count(), 1);

        let mut diags = Diagnostics::new();
        let lenient = process(
            "lenient",
            &records,
            config.table("lenient").unwrap(),
            &mut diags,
        )
        .unwrap();
        assert_eq!(lenient.table.rows.len(), 1);
        assert_eq!(
            lenient.table.rows[0].get("n:Integer"),
            Some(&CellValue::Text("abc".to_string()))
        );
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_one_failing_column_drops_whole_row() {
        let config = PipelineConfig::from_json(
            r#"{
                "t": {
                    "good": { "type": "String" },
                    "bad":  { "parse": [ { "ToFloat": null } ], "type": "Float" }
                }
            }"#,
        )
        .unwrap();
        let records = vec![row(&[("good", "fine"), ("bad", "not-a-number")])];

        let mut diags = Diagnostics::new();
        let out = process("t", &records, config.table("t").unwrap(), &mut diags).unwrap();

        // No partial-column writes within a row.
        assert!(out.table.rows.is_empty());
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].column, "bad");
    }

    #[test]
    fn test_column_absent_from_source_is_absent_everywhere() {
        let config = PipelineConfig::from_json(
            r#"{ "t": { "present": {}, "missing": { "type": "Integer" } } }"#,
        )
        .unwrap();
        let records = vec![row(&[("present", "a")]), row(&[("present", "b")])];

        let mut diags = Diagnostics::new();
        let out = process("t", &records, config.table("t").unwrap(), &mut diags).unwrap();

        assert_eq!(out.table.rows.len(), 2);
        for typed in &out.table.rows {
            assert_eq!(typed.get("missing:Integer"), Some(&CellValue::Null));
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_rename_is_one_way_and_idempotent() {
        let ty = SemanticType::Integer;
        assert_eq!(ty.canonical_column("trip_id"), "trip_id:Integer");
        assert_eq!(ty.canonical_column("trip_id:Integer"), "trip_id:Integer");
    }
}
