//! Lenient semantic type caster.
//!
//! The terminal step of every column pipeline. Unlike the strict numeric
//! and datetime parse steps, [`cast`] never fails: a value that cannot be
//! converted to the target type is returned unchanged and a warning is
//! recorded, so a single malformed field degrades to a pass-through instead
//! of aborting the file. Keep this lenient contract separate from the
//! strict steps in [`super::steps`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::diag::Diagnostics;
use crate::models::{CellValue, SemanticType};

/// True values accepted by the boolean cast, lowercased.
const TRUE_VALUES: [&str; 6] = ["y", "yes", "t", "true", "on", "1"];
/// False values accepted by the boolean cast, lowercased.
const FALSE_VALUES: [&str; 6] = ["n", "no", "f", "false", "off", "0"];

/// Cast a value to the target semantic type.
///
/// Absent input stays absent for every target type. On failure the
/// original value is returned unchanged and a warning is recorded against
/// `scope` (conventionally `table.column`).
pub fn cast(
    target: SemanticType,
    value: CellValue,
    scope: &str,
    diags: &mut Diagnostics,
) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }
    match target {
        SemanticType::Boolean => cast_boolean(value, scope, diags),
        SemanticType::Integer => cast_integer(value, scope, diags),
        SemanticType::Float => cast_float(value, scope, diags),
        SemanticType::Date => cast_date(value, scope, diags),
        SemanticType::Timestamp => cast_timestamp(value, scope, diags),
        SemanticType::TimestampTz => cast_timestamptz(value, scope, diags),
        SemanticType::String => cast_string(value),
    }
}

fn cast_boolean(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        CellValue::Bool(b) => CellValue::Bool(b),
        CellValue::Text(s) => {
            let lower = s.to_lowercase();
            if TRUE_VALUES.contains(&lower.as_str()) {
                CellValue::Bool(true)
            } else if FALSE_VALUES.contains(&lower.as_str()) {
                CellValue::Bool(false)
            } else {
                // Ambiguous booleans pass through for downstream inspection.
                diags.warn(scope, format!("could not cast value to boolean: '{}'", s));
                CellValue::Text(s)
            }
        }
        other => {
            diags.warn(
                scope,
                format!("could not cast value to boolean: '{}'", other),
            );
            other
        }
    }
}

fn cast_integer(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        CellValue::Int(i) => CellValue::Int(i),
        CellValue::Float(x) => CellValue::Int(x.trunc() as i64),
        CellValue::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => CellValue::Int(i),
            Err(_) => {
                diags.warn(scope, format!("could not cast value to integer: '{}'", s));
                CellValue::Text(s)
            }
        },
        other => {
            diags.warn(
                scope,
                format!("could not cast value to integer: '{}'", other),
            );
            other
        }
    }
}

fn cast_float(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        CellValue::Float(x) => CellValue::Float(x),
        CellValue::Int(i) => CellValue::Float(i as f64),
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(x) => CellValue::Float(x),
            Err(_) => {
                diags.warn(scope, format!("could not cast value to float: '{}'", s));
                CellValue::Text(s)
            }
        },
        other => {
            diags.warn(scope, format!("could not cast value to float: '{}'", other));
            other
        }
    }
}

fn cast_date(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        CellValue::Date(d) => CellValue::Date(d),
        CellValue::Text(s) => {
            for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
                if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
                    return CellValue::Date(d);
                }
            }
            diags.warn(scope, format!("could not cast value to date: '{}'", s));
            CellValue::Text(s)
        }
        other => {
            diags.warn(scope, format!("could not cast value to date: '{}'", other));
            other
        }
    }
}

fn cast_timestamp(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        CellValue::Timestamp(ts) => CellValue::Timestamp(ts),
        CellValue::TimestampTz(ts) => CellValue::TimestampTz(ts),
        CellValue::Text(s) => {
            for fmt in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
                if let Ok(ts) = NaiveDateTime::parse_from_str(&s, fmt) {
                    return CellValue::Timestamp(ts);
                }
            }
            diags.warn(scope, format!("could not cast value to timestamp: '{}'", s));
            CellValue::Text(s)
        }
        other => {
            diags.warn(
                scope,
                format!("could not cast value to timestamp: '{}'", other),
            );
            other
        }
    }
}

fn cast_timestamptz(value: CellValue, scope: &str, diags: &mut Diagnostics) -> CellValue {
    match value {
        // Zone-aware input is kept as-is; zone-naive input gets UTC.
        CellValue::TimestampTz(ts) => CellValue::TimestampTz(ts),
        CellValue::Timestamp(naive) => CellValue::TimestampTz(naive.and_utc().fixed_offset()),
        CellValue::Text(s) => match parse_timestamptz(&s) {
            Some(ts) => CellValue::TimestampTz(ts),
            None => {
                diags.warn(
                    scope,
                    format!("could not cast value to timestamptz: '{}'", s),
                );
                CellValue::Text(s)
            }
        },
        other => {
            diags.warn(
                scope,
                format!("could not cast value to timestamptz: '{}'", other),
            );
            other
        }
    }
}

fn parse_timestamptz(input: &str) -> Option<DateTime<FixedOffset>> {
    // Exports commonly abbreviate the UTC offset to a bare "+00", which
    // chrono's %z does not accept.
    let normalized = if input.ends_with("+00") {
        format!("{}00", input)
    } else {
        input.to_string()
    };

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(ts) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    None
}

fn cast_string(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(s),
        other => CellValue::Text(other.to_field()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn cast_quiet(target: SemanticType, value: CellValue) -> (CellValue, usize) {
        let mut diags = Diagnostics::new();
        let out = cast(target, value, "t.c", &mut diags);
        (out, diags.warnings().count())
    }

    #[test]
    fn test_boolean_truthy_and_falsy_sets() {
        for s in ["y", "YES", "t", "True", "ON", "1"] {
            let (out, warns) = cast_quiet(SemanticType::Boolean, text(s));
            assert_eq!(out, CellValue::Bool(true), "{s}");
            assert_eq!(warns, 0);
        }
        for s in ["n", "NO", "f", "False", "OFF", "0"] {
            let (out, warns) = cast_quiet(SemanticType::Boolean, text(s));
            assert_eq!(out, CellValue::Bool(false), "{s}");
            assert_eq!(warns, 0);
        }
    }

    #[test]
    fn test_boolean_ambiguous_passes_through_with_warning() {
        let (out, warns) = cast_quiet(SemanticType::Boolean, text("maybe"));
        assert_eq!(out, text("maybe"));
        assert_eq!(warns, 1);
    }

    #[test]
    fn test_integer_lenient_fallback() {
        let (out, warns) = cast_quiet(SemanticType::Integer, text("abc"));
        assert_eq!(out, text("abc"));
        assert_eq!(warns, 1);

        let (out, warns) = cast_quiet(SemanticType::Integer, text("42"));
        assert_eq!(out, CellValue::Int(42));
        assert_eq!(warns, 0);
    }

    #[test]
    fn test_absent_stays_absent_for_every_type() {
        for target in [
            SemanticType::Boolean,
            SemanticType::Integer,
            SemanticType::Float,
            SemanticType::Date,
            SemanticType::Timestamp,
            SemanticType::TimestampTz,
            SemanticType::String,
        ] {
            let (out, warns) = cast_quiet(target, CellValue::Null);
            assert_eq!(out, CellValue::Null);
            assert_eq!(warns, 0);
        }
    }

    #[test]
    fn test_date_tries_both_formats() {
        let expected = CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(cast_quiet(SemanticType::Date, text("2024-01-15")).0, expected);
        assert_eq!(cast_quiet(SemanticType::Date, text("2024/01/15")).0, expected);

        let (out, warns) = cast_quiet(SemanticType::Date, text("15.01.2024"));
        assert_eq!(out, text("15.01.2024"));
        assert_eq!(warns, 1);
    }

    #[test]
    fn test_date_accepts_typed_input_unchanged() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let (out, warns) = cast_quiet(SemanticType::Date, CellValue::Date(d));
        assert_eq!(out, CellValue::Date(d));
        assert_eq!(warns, 0);
    }

    #[test]
    fn test_timestamp_formats() {
        let out = cast_quiet(SemanticType::Timestamp, text("2024-01-15 10:30:00")).0;
        assert!(matches!(out, CellValue::Timestamp(_)));
        let out = cast_quiet(SemanticType::Timestamp, text("2024/01/15 10:30:00")).0;
        assert!(matches!(out, CellValue::Timestamp(_)));
    }

    #[test]
    fn test_timestamptz_normalizes_bare_utc_suffix() {
        let out = cast_quiet(SemanticType::TimestampTz, text("2024-01-15 10:30:00+00")).0;
        match out {
            CellValue::TimestampTz(ts) => {
                assert_eq!(ts.offset().local_minus_utc(), 0);
                assert_eq!(ts.hour(), 10);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_timestamptz_attaches_utc_to_naive_input() {
        let out = cast_quiet(SemanticType::TimestampTz, text("2024-01-15 10:30:00.250")).0;
        match out {
            CellValue::TimestampTz(ts) => assert_eq!(ts.offset().local_minus_utc(), 0),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_timestamptz_keeps_existing_zone() {
        let out = cast_quiet(SemanticType::TimestampTz, text("2024-01-15 10:30:00+0200")).0;
        match out {
            CellValue::TimestampTz(ts) => assert_eq!(ts.offset().local_minus_utc(), 7200),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_string_stringifies_typed_values() {
        assert_eq!(cast_quiet(SemanticType::String, CellValue::Int(7)).0, text("7"));
        assert_eq!(
            cast_quiet(SemanticType::String, CellValue::Bool(true)).0,
            text("true")
        );
    }

    #[test]
    fn test_never_raises_only_warns() {
        let mut diags = Diagnostics::new();
        // Every failure mode degrades to pass-through.
        cast(SemanticType::Integer, text("x"), "t.a", &mut diags);
        cast(SemanticType::Float, text("x"), "t.b", &mut diags);
        cast(SemanticType::Date, text("x"), "t.c", &mut diags);
        cast(SemanticType::Timestamp, text("x"), "t.d", &mut diags);
        cast(SemanticType::TimestampTz, text("x"), "t.e", &mut diags);
        assert_eq!(diags.warnings().count(), 5);
    }
}
