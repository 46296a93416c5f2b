//! Text matcher for the directive DSL embedded in expected strings.
//!
//! An expected string ending in `/` enters the DSL: `~/regexp/` matches a
//! regular expression, `/[min..max]/` and `/[v1,v2]/` check ranges and
//! membership, `/fragment/` checks containment. A leading `!` negates any
//! form. Anything else compares as plain text.

use anyhow::{bail, Context as _, Result};
use regex::Regex;

use crate::failure::{Failure, Violation};
use crate::path::DataPath;
use crate::validation::Validation;

/// Compare two strings, honouring the expected-side DSL.
pub(crate) fn assert_text(
    expected: &str,
    actual: &str,
    path: &DataPath,
    validation: &mut Validation,
) -> Result<()> {
    let expected = expected.trim();
    if expected.ends_with('/') {
        let (body, negated) = peel_negation(expected);
        if body.starts_with("~/") {
            return assert_reg_expr(negated, body, actual, path, validation);
        }
        if body.starts_with("/[") && body.ends_with("]/") {
            return assert_range(negated, body, actual, path, validation);
        }
        if body.starts_with('/') {
            assert_contains(negated, body, actual, path, validation);
            return Ok(());
        }
    }

    let (body, negated) = peel_negation(expected);
    let is_equal = body == actual;
    if !is_equal && !negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::Equal,
            body.into(),
            actual.into(),
        ));
    } else if is_equal && negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::NotEqual,
            body.into(),
            actual.into(),
        ));
    } else {
        validation.passed();
    }
    Ok(())
}

fn peel_negation(candidate: &str) -> (&str, bool) {
    match candidate.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (candidate, false),
    }
}

fn assert_reg_expr(
    negated: bool,
    expected: &str,
    actual: &str,
    path: &DataPath,
    validation: &mut Validation,
) -> Result<()> {
    let body = expected.get(2..expected.len() - 1).unwrap_or_default();
    let mut pattern = String::new();
    if actual.contains('\n') {
        pattern.push_str("(?m)");
    }
    pattern.push_str(body);
    let compiled = Regex::new(&pattern)
        .with_context(|| format!("failed to compile {body:?}, path: {}", path.path()))?;

    let matches = compiled.is_match(actual);
    if !matches && !negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::RegExprMatches,
            body.into(),
            actual.into(),
        ));
    } else if matches && negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::RegExprDoesNotMatch,
            body.into(),
            actual.into(),
        ));
    } else {
        validation.passed();
    }
    Ok(())
}

fn assert_range(
    negated: bool,
    expected: &str,
    actual: &str,
    path: &DataPath,
    validation: &mut Validation,
) -> Result<()> {
    if !expected.contains("..") && !expected.contains(',') {
        bail!(
            "invalid range format, expected /[min..max]/ or /[val1,val2,valN]/, but had: {expected}, path: {}",
            path.path()
        );
    }
    let actual = actual.trim();
    let body = expected.get(2..expected.len() - 2).unwrap_or_default();

    let within_range = if let Some((low, high)) = body.split_once("..") {
        let low: f64 = low.trim().parse().unwrap_or(0.0);
        let high: f64 = high.trim().parse().unwrap_or(0.0);
        let value: f64 = actual.parse().unwrap_or(0.0);
        value >= low && value <= high
    } else {
        body.split(',').any(|candidate| candidate.trim() == actual)
    };

    if !within_range && !negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::Range,
            body.into(),
            actual.into(),
        ));
    } else if within_range && negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::RangeNot,
            body.into(),
            actual.into(),
        ));
    } else {
        validation.passed();
    }
    Ok(())
}

fn assert_contains(
    negated: bool,
    expected: &str,
    actual: &str,
    path: &DataPath,
    validation: &mut Validation,
) {
    let body = expected.get(1..expected.len() - 1).unwrap_or_default();
    let contains = actual.contains(body);

    if !contains && !negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::Contains,
            body.into(),
            actual.into(),
        ));
    } else if contains && negated {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::DoesNotContain,
            body.into(),
            actual.into(),
        ));
    } else {
        validation.passed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(expected: &str, actual: &str) -> Validation {
        let mut validation = Validation::new();
        assert_text(expected, actual, &DataPath::root(), &mut validation).unwrap();
        validation
    }

    fn first_violation(validation: &Validation) -> Violation {
        validation.failures[0].violation
    }

    #[test]
    fn test_plain_equality() {
        assert!(!run("abc", "abc").has_failure());
        let failed = run("abc", "abx");
        assert_eq!(first_violation(&failed), Violation::Equal);
    }

    #[test]
    fn test_negated_equality() {
        assert!(!run("!abc", "abx").has_failure());
        let failed = run("!abc", "abc");
        assert_eq!(first_violation(&failed), Violation::NotEqual);
    }

    #[test]
    fn test_regexp_match() {
        assert!(!run("~/^[0-9]+$/", "123").has_failure());
        let failed = run("~/^[0-9]+$/", "abc");
        assert_eq!(first_violation(&failed), Violation::RegExprMatches);
    }

    #[test]
    fn test_regexp_negated() {
        assert!(!run("!~/^[0-9]+$/", "abc").has_failure());
        let failed = run("!~/^[0-9]+$/", "123");
        assert_eq!(first_violation(&failed), Violation::RegExprDoesNotMatch);
    }

    #[test]
    fn test_regexp_multiline() {
        // ^end$ only matches the second line with (?m) prepended.
        assert!(!run("~/^end$/", "start\nend").has_failure());
    }

    #[test]
    fn test_regexp_compile_error_is_structural() {
        let mut validation = Validation::new();
        let result = assert_text("~/([/", "x", &DataPath::root(), &mut validation);
        assert!(result.is_err());
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_numeric_range() {
        assert!(!run("/[1..10]/", "5").has_failure());
        let failed = run("/[1..10]/", "42");
        assert_eq!(first_violation(&failed), Violation::Range);
    }

    #[test]
    fn test_negated_range() {
        assert!(!run("!/[1..10]/", "42").has_failure());
        let failed = run("!/[1..10]/", "5");
        assert_eq!(first_violation(&failed), Violation::RangeNot);
    }

    #[test]
    fn test_enumerated_range() {
        assert!(!run("/[a,b,c]/", "b").has_failure());
        assert!(!run("/[a, b ,c]/", "b").has_failure());
        let failed = run("/[a,b,c]/", "x");
        assert_eq!(first_violation(&failed), Violation::Range);
    }

    #[test]
    fn test_range_without_separator_is_structural() {
        let mut validation = Validation::new();
        let result = assert_text("/[abc]/", "abc", &DataPath::root(), &mut validation);
        assert!(result.is_err());
    }

    #[test]
    fn test_contains() {
        assert!(!run("/foo/", "xfooy").has_failure());
        let failed = run("/foo/", "bar");
        assert_eq!(first_violation(&failed), Violation::Contains);
    }

    #[test]
    fn test_negated_contains() {
        assert!(!run("!/foo/", "bar").has_failure());
        let failed = run("!/foo/", "xfooy");
        assert_eq!(first_violation(&failed), Violation::DoesNotContain);
    }

    #[test]
    fn test_expected_is_trimmed() {
        assert!(!run("  abc  ", "abc").has_failure());
    }
}
