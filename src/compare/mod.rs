//! The recursive structural comparator.
//!
//! [`assert`] and [`assert_with_context`] walk the expected and actual trees
//! in parallel, recording one outcome per visited pair in a
//! [`Validation`]: a pass or a structured failure with a precise path.
//! Structural errors — a malformed regular expression, a switch/case whose
//! case is not a map, a macro that fails to expand — abort the walk and are
//! returned as the call's error.

mod map;
mod scalar;
mod slice;
mod text;

use std::collections::HashMap;

use anyhow::{Context as _, Result};

use crate::context::Context;
use crate::failure::{Failure, Violation};
use crate::path::DataPath;
use crate::validation::Validation;
use crate::value::{self, Value};

/// Validate `actual` against `expected` using a default context.
///
/// # Example
///
/// ```rust
/// use attest::DataPath;
/// use serde_json::json;
///
/// let validation = attest::assert(
///     json!({"status": "/ok/", "count": "/[1..10]/"}),
///     json!({"status": "ok: 2 rows", "count": 5, "elapsed": 0.2}),
///     &DataPath::root(),
/// ).unwrap();
///
/// assert!(!validation.has_failure());
/// assert_eq!(validation.passed_count, 2);
/// ```
pub fn assert<E, A>(expected: E, actual: A, path: &DataPath) -> Result<Validation>
where
    E: Into<Value>,
    A: Into<Value>,
{
    assert_with_context(expected, actual, path, &Context::new())
}

/// Validate `actual` against `expected` with an explicit context.
pub fn assert_with_context<E, A>(
    expected: E,
    actual: A,
    path: &DataPath,
    ctx: &Context,
) -> Result<Validation>
where
    E: Into<Value>,
    A: Into<Value>,
{
    let mut validation = Validation::new();
    assert_value(&expected.into(), &actual.into(), path, ctx, &mut validation)?;
    Ok(validation)
}

/// One comparison step. Recursion extends the path; every step either bumps
/// the pass count or appends exactly one failure.
pub(crate) fn assert_value(
    expected: &Value,
    actual: &Value,
    path: &DataPath,
    ctx: &Context,
    validation: &mut Validation,
) -> Result<()> {
    if expected.is_null() {
        if actual.is_null() {
            validation.passed();
        } else {
            validation.add_failure(Failure::new(
                path.source(),
                path.path(),
                Violation::NotEqual,
                expected.clone(),
                actual.clone(),
            ));
        }
        return Ok(());
    }

    match expected {
        Value::Int(_) => return scalar::assert_int(expected, actual, path, validation),
        Value::Float(_) => return scalar::assert_float(expected, actual, path, validation),
        _ => {}
    }

    let mut expected_owned: Option<Value> = None;
    if let Value::Text(text) = expected {
        if let Some(expanded) = expand_expected_text(text, path, ctx)? {
            if !expanded.is_text() {
                return assert_value(&expanded, actual, path, ctx, validation);
            }
            expected_owned = Some(expanded);
        }
    }
    let expected = expected_owned.as_ref().unwrap_or(expected);

    let mut actual_owned: Option<Value> = None;
    match actual {
        Value::Text(text) => {
            if let Some(parsed) = value::parse_json(text) {
                actual_owned = Some(parsed);
            }
        }
        Value::Int(_) => return scalar::assert_int(expected, actual, path, validation),
        Value::Float(_) => return scalar::assert_float(expected, actual, path, validation),
        _ => {}
    }
    let actual = actual_owned.as_ref().unwrap_or(actual);

    if let Value::Predicate(predicate) = expected {
        if predicate.test(actual) {
            validation.passed();
        } else {
            validation.add_failure(Failure::new(
                path.source(),
                path.path(),
                Violation::Predicate,
                Value::Text(predicate.describe()),
                actual.clone(),
            ));
        }
        return Ok(());
    }

    let directive = path.directive(ctx);
    let layout = directive
        .time_layout
        .clone()
        .unwrap_or_else(|| ctx.default_time_layout.clone());

    if expected.is_time() || actual.is_time() {
        scalar::assert_time(expected, actual, &layout, path, validation);
        return Ok(());
    }

    match expected {
        Value::Map(expected_map) => {
            return map::assert_map(expected_map, actual, path, ctx, validation)
        }
        Value::List(expected_items) => {
            return slice::assert_slice(expected_items, actual, path, ctx, validation)
        }
        _ => {}
    }

    if expected == actual {
        validation.passed();
        return Ok(());
    }

    let strict = directive
        .strict_data_type_check
        .unwrap_or(ctx.strict_data_type_check);
    if !strict {
        let expected_text = expected.as_text();
        let expected_time = value::parse_time(&expected_text, &layout);
        let actual_time = actual.to_time(&layout);
        match (expected_time, actual_time) {
            (Some(expected_time), Some(actual_time)) if expected_time == actual_time => {
                validation.passed();
                return Ok(());
            }
            (None, Some(actual_time))
                if Value::Time(actual_time)
                    .as_text()
                    .starts_with(expected_text.trim()) =>
            {
                validation.passed();
                return Ok(());
            }
            _ => {}
        }
    }

    text::assert_text(&expected.as_text(), &actual.as_text(), path, validation)
}

/// Expand an expected string before comparison.
///
/// Complete JSON parses into a tree; otherwise the context's evaluator may
/// substitute a macro expansion. `None` means the text stands as-is.
fn expand_expected_text(text: &str, path: &DataPath, ctx: &Context) -> Result<Option<Value>> {
    if let Some(parsed) = value::parse_json(text) {
        return Ok(Some(parsed));
    }
    if ctx.evaluator().has_macro(text) {
        let expanded = ctx
            .evaluator()
            .expand(text)
            .with_context(|| format!("failed to expand macro {text:?}, path: {}", path.path()))?;
        return Ok(Some(expanded));
    }
    Ok(None)
}

/// Concatenate the rendered values of `keys` looked up in `map`. Used both
/// to select switch cases and to index slices of maps.
pub(crate) fn keys_value(map: &HashMap<String, Value>, keys: &[String]) -> String {
    keys.iter()
        .map(|key| map.get(key).map(Value::as_text).unwrap_or_default())
        .collect()
}

/// Render `key:value` pairs for an indexed entry, used as the display key in
/// failure paths.
pub(crate) fn keys_pair_value(map: &HashMap<String, Value>, keys: &[String]) -> String {
    keys.iter()
        .map(|key| {
            format!(
                "{key}:{}",
                map.get(key).map(Value::as_text).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Project a slice of maps into a map keyed by the concatenated index tuple.
/// Non-map items are dropped.
pub(crate) fn index_slice_by(items: &[Value], keys: &[String]) -> HashMap<String, Value> {
    let mut indexed = HashMap::new();
    for item in items {
        if let Value::Map(map) = item {
            indexed.insert(keys_value(map, keys), item.clone());
        }
    }
    indexed
}
