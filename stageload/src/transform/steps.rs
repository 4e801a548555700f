//! Parse-step registry and column pipeline builder.
//!
//! Each step is a named, parametrized, pure transformation of a single
//! field value. Configuration references steps declaratively (see
//! [`StepInvocation`]); [`resolve`] turns an invocation into a
//! [`ParseStep`], failing fast on unknown names, malformed arguments, or
//! patterns that do not compile.
//!
//! String-oriented steps tolerate absent input by returning it unchanged.
//! The numeric and datetime steps treat absent input as a no-op but reject
//! unparseable non-empty input with a [`StepError`], which drops the whole
//! row. That strictness is deliberate and distinct from the terminal type
//! cast in [`super::cast`], which never fails; the two call sites implement
//! opposite failure policies and must not be unified.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::config::{ColumnRule, StepInvocation, TableConfig};
use crate::error::{ConfigError, ConfigResult, StepError, StepResult};
use crate::models::{CellValue, SemanticType};

// =============================================================================
// Parse Steps
// =============================================================================

/// A resolved, ready-to-run parse step.
#[derive(Debug, Clone)]
pub enum ParseStep {
    /// Literal substring replacement.
    Replace { old: String, new: String },

    /// Regex substitution over every non-overlapping match.
    RegexReplace { pattern: Regex, replacement: String },

    /// Uppercase transform of string values.
    ToUpper,

    /// Parse as float, truncate to integer. Rejects non-numeric input.
    ToInt,

    /// Parse as float, round to `precision` decimal places. Rejects
    /// non-numeric input.
    ToFloat { precision: u32 },

    /// Parse with the given format, attach UTC, emit an ISO-8601 string.
    ToDatetime { format: String },

    /// As `ToDatetime`, date-only.
    ToDate { format: String },

    /// Map a sentinel string to null, pass everything else through.
    ToNull { sentinel: String },

    /// Strip any leading characters contained in `chars`.
    LeftTrim { chars: String },

    /// Map null to the empty string.
    NullToEmpty,
}

impl ParseStep {
    /// Registry name of this step.
    pub fn name(&self) -> &'static str {
        match self {
            ParseStep::Replace { .. } => "Replace",
            ParseStep::RegexReplace { .. } => "RegexReplace",
            ParseStep::ToUpper => "ToUpper",
            ParseStep::ToInt => "ToInt",
            ParseStep::ToFloat { .. } => "ToFloat",
            ParseStep::ToDatetime { .. } => "ToDatetime",
            ParseStep::ToDate { .. } => "ToDate",
            ParseStep::ToNull { .. } => "ToNull",
            ParseStep::LeftTrim { .. } => "LeftTrim",
            ParseStep::NullToEmpty => "NullToEmpty",
        }
    }

    /// Apply this step to a value.
    ///
    /// Total over `{absent, non-empty string}` inputs; already-typed values
    /// produced by earlier steps pass through the string-oriented steps
    /// unchanged.
    pub fn apply(&self, value: CellValue) -> StepResult<CellValue> {
        match self {
            ParseStep::Replace { old, new } => Ok(map_text(value, |s| s.replace(old, new))),

            ParseStep::RegexReplace {
                pattern,
                replacement,
            } => Ok(map_text(value, |s| {
                pattern.replace_all(&s, replacement.as_str()).to_string()
            })),

            ParseStep::ToUpper => Ok(map_text(value, |s| s.to_uppercase())),

            ParseStep::ToInt => self.apply_to_int(value),

            ParseStep::ToFloat { precision } => self.apply_to_float(value, *precision),

            ParseStep::ToDatetime { format } => self.apply_to_datetime(value, format),

            ParseStep::ToDate { format } => self.apply_to_date(value, format),

            ParseStep::ToNull { sentinel } => Ok(match value {
                CellValue::Text(s) if s == *sentinel => CellValue::Null,
                other => other,
            }),

            ParseStep::LeftTrim { chars } => Ok(map_text(value, |s| {
                s.trim_start_matches(|c| chars.contains(c)).to_string()
            })),

            ParseStep::NullToEmpty => Ok(match value {
                CellValue::Null => CellValue::Text(String::new()),
                other => other,
            }),
        }
    }

    fn apply_to_int(&self, value: CellValue) -> StepResult<CellValue> {
        match value {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Int(i) => Ok(CellValue::Int(i)),
            CellValue::Float(x) => Ok(CellValue::Int(x.trunc() as i64)),
            CellValue::Text(s) => {
                // Parsed as float first so "3.0" and "1e2" style inputs
                // truncate instead of failing.
                let parsed: f64 = s.trim().parse().map_err(|_| StepError::NotNumeric {
                    step: "ToInt",
                    value: s.clone(),
                })?;
                Ok(CellValue::Int(parsed.trunc() as i64))
            }
            other => Ok(other),
        }
    }

    fn apply_to_float(&self, value: CellValue, precision: u32) -> StepResult<CellValue> {
        let round = |x: f64| {
            let factor = 10f64.powi(precision as i32);
            (x * factor).round() / factor
        };
        match value {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Int(i) => Ok(CellValue::Float(round(i as f64))),
            CellValue::Float(x) => Ok(CellValue::Float(round(x))),
            CellValue::Text(s) => {
                let parsed: f64 = s.trim().parse().map_err(|_| StepError::NotNumeric {
                    step: "ToFloat",
                    value: s.clone(),
                })?;
                Ok(CellValue::Float(round(parsed)))
            }
            other => Ok(other),
        }
    }

    fn apply_to_datetime(&self, value: CellValue, format: &str) -> StepResult<CellValue> {
        match value {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Text(s) => {
                let naive = NaiveDateTime::parse_from_str(&s, format).map_err(|_| {
                    StepError::BadDatetime {
                        step: "ToDatetime",
                        format: format.to_string(),
                        value: s.clone(),
                    }
                })?;
                Ok(CellValue::Text(naive.and_utc().to_rfc3339()))
            }
            other => Ok(other),
        }
    }

    fn apply_to_date(&self, value: CellValue, format: &str) -> StepResult<CellValue> {
        match value {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Text(s) => {
                let date = NaiveDate::parse_from_str(&s, format).map_err(|_| {
                    StepError::BadDatetime {
                        step: "ToDate",
                        format: format.to_string(),
                        value: s.clone(),
                    }
                })?;
                Ok(CellValue::Text(date.format("%Y-%m-%d").to_string()))
            }
            other => Ok(other),
        }
    }
}

fn map_text(value: CellValue, f: impl FnOnce(String) -> String) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(f(s)),
        other => other,
    }
}

// =============================================================================
// Registry Resolution
// =============================================================================

/// Resolve a declarative step invocation against the registry.
///
/// Unknown names, wrong arity, non-string literals where strings are
/// expected, and patterns that fail to compile are all fatal for the
/// table's configuration, reported with the offending table/column.
pub fn resolve(table: &str, column: &str, inv: &StepInvocation) -> ConfigResult<ParseStep> {
    match inv.name.as_str() {
        "Replace" => {
            let [old, new] = two_str_args("Replace", &inv.args)?;
            Ok(ParseStep::Replace { old, new })
        }
        "RegexReplace" => {
            let [raw, replacement] = two_str_args("RegexReplace", &inv.args)?;
            let pattern = Regex::new(&raw).map_err(|e| ConfigError::BadPattern {
                step: "RegexReplace".to_string(),
                message: e.to_string(),
            })?;
            Ok(ParseStep::RegexReplace {
                pattern,
                replacement,
            })
        }
        "ToUpper" => {
            no_args("ToUpper", &inv.args)?;
            Ok(ParseStep::ToUpper)
        }
        "ToInt" => {
            no_args("ToInt", &inv.args)?;
            Ok(ParseStep::ToInt)
        }
        "ToFloat" => {
            let precision = match inv.args.as_slice() {
                [] => 2,
                [Value::Number(n)] => {
                    n.as_u64()
                        .ok_or_else(|| ConfigError::BadStepArgs {
                            step: "ToFloat".to_string(),
                            message: format!("precision must be a non-negative integer, got {}", n),
                        })? as u32
                }
                other => {
                    return Err(ConfigError::BadStepArgs {
                        step: "ToFloat".to_string(),
                        message: format!("expected at most one integer argument, got {:?}", other),
                    })
                }
            };
            Ok(ParseStep::ToFloat { precision })
        }
        "ToDatetime" => {
            let format = one_str_arg("ToDatetime", &inv.args)?;
            Ok(ParseStep::ToDatetime { format })
        }
        "ToDate" => {
            let format = one_str_arg("ToDate", &inv.args)?;
            Ok(ParseStep::ToDate { format })
        }
        "ToNull" => {
            let sentinel = one_str_arg("ToNull", &inv.args)?;
            Ok(ParseStep::ToNull { sentinel })
        }
        "LeftTrim" => {
            let chars = one_str_arg("LeftTrim", &inv.args)?;
            Ok(ParseStep::LeftTrim { chars })
        }
        "NullToEmpty" => {
            no_args("NullToEmpty", &inv.args)?;
            Ok(ParseStep::NullToEmpty)
        }
        other => Err(ConfigError::UnknownStep {
            table: table.to_string(),
            column: column.to_string(),
            step: other.to_string(),
        }),
    }
}

fn no_args(step: &str, args: &[Value]) -> ConfigResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::BadStepArgs {
            step: step.to_string(),
            message: format!("expected no arguments, got {}", args.len()),
        })
    }
}

fn str_arg(step: &str, arg: &Value) -> ConfigResult<String> {
    arg.as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::BadStepArgs {
            step: step.to_string(),
            message: format!("expected a string argument, got {}", arg),
        })
}

fn one_str_arg(step: &str, args: &[Value]) -> ConfigResult<String> {
    match args {
        [arg] => str_arg(step, arg),
        _ => Err(ConfigError::BadStepArgs {
            step: step.to_string(),
            message: format!("expected 1 argument, got {}", args.len()),
        }),
    }
}

fn two_str_args(step: &str, args: &[Value]) -> ConfigResult<[String; 2]> {
    match args {
        [a, b] => Ok([str_arg(step, a)?, str_arg(step, b)?]),
        _ => Err(ConfigError::BadStepArgs {
            step: step.to_string(),
            message: format!("expected 2 arguments, got {}", args.len()),
        }),
    }
}

// =============================================================================
// Column Pipeline Builder
// =============================================================================

/// A column rule with its step chain resolved and ready to run.
///
/// The chain runs in declared order; the terminal cast to `target_type` is
/// applied by the processor afterward (it has a different failure policy
/// and lives in [`super::cast`]).
#[derive(Debug, Clone)]
pub struct CompiledColumn {
    /// Source column name.
    pub name: String,
    /// Rows missing this column are dropped before any chain runs.
    pub required: bool,
    /// Resolved steps, in declared order.
    pub steps: Vec<ParseStep>,
    /// Target type for the terminal cast and the canonical header.
    pub target_type: SemanticType,
}

impl CompiledColumn {
    /// The canonical `name:type` header for this column.
    pub fn canonical_name(&self) -> String {
        self.target_type.canonical_column(&self.name)
    }

    /// Run the step chain over one value. The first failing step aborts
    /// the chain.
    pub fn run_chain(&self, mut value: CellValue) -> StepResult<CellValue> {
        for step in &self.steps {
            value = step.apply(value)?;
        }
        Ok(value)
    }
}

/// Build one compiled column from its declarative rule.
///
/// Pure: building the same rule twice yields functionally equivalent
/// chains. Nothing is executed here.
pub fn build_column(table: &str, name: &str, rule: &ColumnRule) -> ConfigResult<CompiledColumn> {
    let steps = rule
        .parse
        .iter()
        .map(|inv| resolve(table, name, inv))
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(CompiledColumn {
        name: name.to_string(),
        required: rule.required,
        steps,
        target_type: rule.target_type,
    })
}

/// Build the full ordered pipeline for a table.
pub fn build_pipeline(table: &str, config: &TableConfig) -> ConfigResult<Vec<CompiledColumn>> {
    config
        .columns()
        .iter()
        .map(|(name, rule)| build_column(table, name, rule))
        .collect()
}

/// Human-readable description of every registry step, for CLI help.
pub fn steps_description() -> String {
    r#"Available parse steps:

| Step | Arguments | Behavior |
|------|-----------|----------|
| Replace | old, new | literal substring replacement |
| RegexReplace | pattern, replacement | regex substitution over every match |
| ToUpper | - | uppercase string values |
| ToInt | - | parse as float, truncate to integer; rejects non-numeric input (drops the row) |
| ToFloat | precision (default 2) | parse as float, round; rejects non-numeric input (drops the row) |
| ToDatetime | format | parse with chrono format, attach UTC, emit ISO-8601 string |
| ToDate | format | as ToDatetime, date only |
| ToNull | sentinel | map one sentinel string to null |
| LeftTrim | chars | strip any leading characters contained in chars |
| NullToEmpty | - | map null to the empty string |

Example parse chain in JSON:
[
  { "Replace": ["$", ""] },
  { "LeftTrim": ["0"] },
  { "ToFloat": 2 }
]"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(name: &str, args: Vec<Value>) -> StepInvocation {
        StepInvocation::new(name, args)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_chain_order_is_significant() {
        let replace = resolve("t", "c", &inv("Replace", vec!["-".into(), "/".into()])).unwrap();
        let upper = resolve("t", "c", &inv("ToUpper", vec![])).unwrap();

        let column = CompiledColumn {
            name: "c".into(),
            required: false,
            steps: vec![replace.clone(), upper.clone()],
            target_type: SemanticType::String,
        };
        assert_eq!(column.run_chain(text("a-b")).unwrap(), text("A/B"));

        // Swapped order on a case-sensitive replacement changes the result.
        let lower_replace =
            resolve("t", "c", &inv("Replace", vec!["a".into(), "x".into()])).unwrap();
        let forward = CompiledColumn {
            name: "c".into(),
            required: false,
            steps: vec![lower_replace.clone(), upper.clone()],
            target_type: SemanticType::String,
        };
        let reversed = CompiledColumn {
            name: "c".into(),
            required: false,
            steps: vec![upper, lower_replace],
            target_type: SemanticType::String,
        };
        assert_eq!(forward.run_chain(text("ab")).unwrap(), text("XB"));
        assert_eq!(reversed.run_chain(text("ab")).unwrap(), text("AB"));
    }

    #[test]
    fn test_to_int_truncates_via_float() {
        let step = ParseStep::ToInt;
        assert_eq!(step.apply(text("3.9")).unwrap(), CellValue::Int(3));
        assert_eq!(step.apply(text("42")).unwrap(), CellValue::Int(42));
        assert_eq!(step.apply(CellValue::Null).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_to_int_rejects_non_numeric() {
        let err = ParseStep::ToInt.apply(text("abc")).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_to_float_rounds_to_precision() {
        let step = ParseStep::ToFloat { precision: 2 };
        assert_eq!(step.apply(text("3.14159")).unwrap(), CellValue::Float(3.14));

        let step = ParseStep::ToFloat { precision: 0 };
        assert_eq!(step.apply(text("3.6")).unwrap(), CellValue::Float(4.0));

        assert!(step.apply(text("n/a")).is_err());
    }

    #[test]
    fn test_to_float_default_precision() {
        let step = resolve("t", "c", &inv("ToFloat", vec![])).unwrap();
        assert_eq!(step.apply(text("1.005")).unwrap(), CellValue::Float(1.0));
    }

    #[test]
    fn test_to_datetime_emits_iso_8601_utc() {
        let step = ParseStep::ToDatetime {
            format: "%d/%m/%Y %H:%M:%S".into(),
        };
        assert_eq!(
            step.apply(text("15/01/2024 10:30:00")).unwrap(),
            text("2024-01-15T10:30:00+00:00")
        );
        // Empty-or-absent passes through as a no-op.
        assert_eq!(step.apply(CellValue::Null).unwrap(), CellValue::Null);
        assert!(step.apply(text("not a date")).is_err());
    }

    #[test]
    fn test_to_date() {
        let step = ParseStep::ToDate {
            format: "%d/%m/%Y".into(),
        };
        assert_eq!(step.apply(text("15/01/2024")).unwrap(), text("2024-01-15"));
    }

    #[test]
    fn test_to_null_sentinel() {
        let step = ParseStep::ToNull {
            sentinel: "N/A".into(),
        };
        assert_eq!(step.apply(text("N/A")).unwrap(), CellValue::Null);
        assert_eq!(step.apply(text("ok")).unwrap(), text("ok"));
    }

    #[test]
    fn test_left_trim() {
        let step = ParseStep::LeftTrim {
            chars: "0 ".into(),
        };
        assert_eq!(step.apply(text("00042")).unwrap(), text("42"));
        assert_eq!(step.apply(CellValue::Null).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_regex_replace_all_matches() {
        let step = resolve(
            "t",
            "c",
            &inv("RegexReplace", vec!["[-. ]".into(), "".into()]),
        )
        .unwrap();
        assert_eq!(step.apply(text("1-2.3 4")).unwrap(), text("1234"));
    }

    #[test]
    fn test_string_steps_tolerate_absent_input() {
        let replace = ParseStep::Replace {
            old: "a".into(),
            new: "b".into(),
        };
        assert_eq!(replace.apply(CellValue::Null).unwrap(), CellValue::Null);
        assert_eq!(ParseStep::ToUpper.apply(CellValue::Null).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_unknown_step_is_config_error() {
        let err = resolve("trips", "price", &inv("Frobnicate", vec![])).unwrap_err();
        match err {
            ConfigError::UnknownStep { table, column, step } => {
                assert_eq!(table, "trips");
                assert_eq!(column, "price");
                assert_eq!(step, "Frobnicate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let err = resolve(
            "t",
            "c",
            &inv("RegexReplace", vec!["[unclosed".into(), "".into()]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BadPattern { .. }));
    }

    #[test]
    fn test_wrong_arity_is_config_error() {
        let err = resolve("t", "c", &inv("Replace", vec!["only-one".into()])).unwrap_err();
        assert!(matches!(err, ConfigError::BadStepArgs { .. }));
    }

    #[test]
    fn test_building_twice_is_equivalent() {
        let rule = ColumnRule {
            required: false,
            parse: vec![
                inv("Replace", vec!["-".into(), "/".into()]),
                inv("ToUpper", vec![]),
            ],
            target_type: SemanticType::String,
        };

        let first = build_column("t", "c", &rule).unwrap();
        let second = build_column("t", "c", &rule).unwrap();
        assert_eq!(
            first.run_chain(text("x-y")).unwrap(),
            second.run_chain(text("x-y")).unwrap()
        );
    }
}
