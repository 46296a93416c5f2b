//! Integer, float, and time comparators.
//!
//! Scalar comparison is primary but must honour the text DSL: an expected
//! string like `/[0..100]/` against an integer actual still performs a range
//! check, so conversion failures and DSL-prefixed strings fall through to
//! the text matcher.

use anyhow::Result;

use crate::compare::text::assert_text;
use crate::failure::{Failure, Violation};
use crate::path::DataPath;
use crate::validation::Validation;
use crate::value::Value;

pub(crate) fn assert_int(
    expected: &Value,
    actual: &Value,
    path: &DataPath,
    validation: &mut Validation,
) -> Result<()> {
    let expected_int = match expected.to_int() {
        Ok(value) => value,
        Err(_) => return assert_text(&expected.as_text(), &actual.as_text(), path, validation),
    };
    if matches!(actual.to_int(), Ok(value) if value == expected_int) {
        validation.passed();
        return Ok(());
    }
    if dsl_escape(expected) {
        return assert_text(&expected.as_text(), &actual.as_text(), path, validation);
    }
    validation.add_failure(Failure::new(
        path.source(),
        path.path(),
        Violation::Equal,
        expected.clone(),
        actual.clone(),
    ));
    Ok(())
}

pub(crate) fn assert_float(
    expected: &Value,
    actual: &Value,
    path: &DataPath,
    validation: &mut Validation,
) -> Result<()> {
    let expected_float = match expected.to_float() {
        Ok(value) => value,
        Err(_) => return assert_text(&expected.as_text(), &actual.as_text(), path, validation),
    };
    if matches!(actual.to_float(), Ok(value) if value == expected_float) {
        validation.passed();
        return Ok(());
    }
    if dsl_escape(expected) {
        return assert_text(&expected.as_text(), &actual.as_text(), path, validation);
    }
    validation.add_failure(Failure::new(
        path.source(),
        path.path(),
        Violation::Equal,
        expected.clone(),
        actual.clone(),
    ));
    Ok(())
}

/// A text expected opening with `/` or `!` escapes numeric equality into the
/// DSL matcher.
fn dsl_escape(expected: &Value) -> bool {
    matches!(expected, Value::Text(text) if text.starts_with('/') || text.starts_with('!'))
}

/// Compare by instant: both sides parse with the active layout and must name
/// the same moment, regardless of wall-clock rendering.
pub(crate) fn assert_time(
    expected: &Value,
    actual: &Value,
    layout: &str,
    path: &DataPath,
    validation: &mut Validation,
) {
    if let (Some(expected_time), Some(actual_time)) =
        (expected.to_time(layout), actual.to_time(layout))
    {
        if expected_time == actual_time {
            validation.passed();
            return;
        }
    }
    validation.add_failure(Failure::new(
        path.source(),
        path.path(),
        Violation::Equal,
        expected.clone(),
        actual.clone(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_int_equal() {
        let mut validation = Validation::new();
        assert_int(
            &Value::Int(42),
            &Value::Int(42),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.passed_count, 1);
    }

    #[test]
    fn test_int_coerces_text_actual() {
        let mut validation = Validation::new();
        assert_int(
            &Value::Int(42),
            &Value::Text("42".to_string()),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.passed_count, 1);
    }

    #[test]
    fn test_int_mismatch() {
        let mut validation = Validation::new();
        assert_int(
            &Value::Int(1),
            &Value::Int(2),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.failures[0].violation, Violation::Equal);
    }

    #[test]
    fn test_int_dsl_escape() {
        let mut validation = Validation::new();
        assert_int(
            &Value::Text("/[1..10]/".to_string()),
            &Value::Int(5),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.passed_count, 1);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_float_equal_and_mismatch() {
        let mut validation = Validation::new();
        assert_float(
            &Value::Float(1.5),
            &Value::Text("1.5".to_string()),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.passed_count, 1);

        assert_float(
            &Value::Float(1.5),
            &Value::Float(2.5),
            &DataPath::root(),
            &mut validation,
        )
        .unwrap();
        assert_eq!(validation.failures[0].violation, Violation::Equal);
    }

    #[test]
    fn test_time_equal_by_instant() {
        let mut validation = Validation::new();
        let instant = Utc.with_ymd_and_hms(2026, 8, 2, 10, 0, 0).unwrap();
        assert_time(
            &Value::Time(instant),
            &Value::Text("2026-08-02 10:00:00".to_string()),
            "%Y-%m-%d %H:%M:%S",
            &DataPath::root(),
            &mut validation,
        );
        assert_eq!(validation.passed_count, 1);
    }

    #[test]
    fn test_time_mismatch() {
        let mut validation = Validation::new();
        let instant = Utc.with_ymd_and_hms(2026, 8, 2, 10, 0, 0).unwrap();
        assert_time(
            &Value::Time(instant),
            &Value::Text("2026-08-02 11:00:00".to_string()),
            "%Y-%m-%d %H:%M:%S",
            &DataPath::root(),
            &mut validation,
        );
        assert_eq!(validation.failures[0].violation, Violation::Equal);
    }
}
