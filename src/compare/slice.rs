//! Slice comparator.
//!
//! Ordered sequences compare element by element. A leading map element made
//! only of directive keys configures the comparison: `@indexBy` promotes
//! both sides to maps keyed by the index tuple, `@sortText` compares sorted
//! bags of rendered strings. Extra trailing actual elements are allowed;
//! missing ones are a single length failure.

use anyhow::Result;
use tracing::warn;

use crate::compare::{assert_value, index_slice_by, map::assert_map};
use crate::context::Context;
use crate::failure::{Failure, Violation};
use crate::path::DataPath;
use crate::validation::Validation;
use crate::value::Value;

pub(crate) fn assert_slice(
    expected: &[Value],
    actual_value: &Value,
    path: &DataPath,
    ctx: &Context,
    validation: &mut Validation,
) -> Result<()> {
    let Value::List(actual_items) = actual_value else {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::IncompatibleDataType,
            Value::List(expected.to_vec()),
            actual_value.clone(),
        ));
        return Ok(());
    };

    if expected.is_empty() {
        if actual_items.is_empty() {
            validation.passed();
        } else {
            validation.add_failure(Failure::new(
                path.source(),
                path.path(),
                Violation::Length,
                Value::Int(0),
                Value::Int(actual_items.len() as i64),
            ));
        }
        return Ok(());
    }

    let mut expected = expected.to_vec();
    let mut actual = actual_items.clone();
    let mut directive = path.directive(ctx);

    if expected[0].is_map() {
        let had_directives = match &mut expected[0] {
            Value::Map(first) => directive.extract_from(first),
            _ => false,
        };
        if had_directives {
            expected.remove(0);
        }

        if directive.sort_text.unwrap_or(false) {
            // Each side sorts its own rendered elements, giving
            // order-insensitive equality of bags of strings.
            let mut expected_texts: Vec<String> = expected.iter().map(Value::as_text).collect();
            let mut actual_texts: Vec<String> = actual.iter().map(Value::as_text).collect();
            expected_texts.sort_unstable();
            actual_texts.sort_unstable();
            expected = expected_texts.into_iter().map(Value::Text).collect();
            actual = actual_texts.into_iter().map(Value::Text).collect();
        } else {
            if !directive.case_sensitive.unwrap_or(false) {
                expected = fold_keys_upper(&expected);
                actual = fold_keys_upper(&actual);
                directive.apply_case_insensitive();
            }

            for item in &actual {
                if let Value::Map(map) = item {
                    directive.learn_data_types(map);
                }
            }

            let layout = directive
                .time_layout
                .clone()
                .unwrap_or_else(|| ctx.default_time_layout.clone());
            for i in 0..expected.len() {
                if let Value::Map(map) = &mut expected[i] {
                    directive.add_to(map);
                    if let Err(err) = directive.apply(map, &layout) {
                        warn!(
                            "failed to apply directive to expected[{i}] at {}: {err:#}",
                            path.path()
                        );
                    }
                }
                if let Some(Value::Map(map)) = actual.get_mut(i) {
                    if let Err(err) = directive.apply(map, &layout) {
                        warn!(
                            "failed to apply directive to actual[{i}] at {}: {err:#}",
                            path.path()
                        );
                    }
                }
            }

            if !directive.index_by.is_empty() {
                let expected_map = index_slice_by(&expected, &directive.index_by);
                let actual_map = index_slice_by(&actual, &directive.index_by);
                return assert_map(&expected_map, &Value::Map(actual_map), path, ctx, validation);
            }
        }
    }

    for (i, expected_item) in expected.iter().enumerate() {
        if i >= actual.len() {
            validation.add_failure(Failure::new(
                path.source(),
                path.path(),
                Violation::Length,
                Value::Int(expected.len() as i64),
                Value::Int(actual.len() as i64),
            ));
            return Ok(());
        }
        assert_value(expected_item, &actual[i], &path.index(i), ctx, validation)?;
    }
    Ok(())
}

/// Shallow upper-case fold of map keys, used for case-insensitive slice
/// comparison. Non-map items pass through unchanged.
fn fold_keys_upper(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .map(|item| match item {
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| (key.to_uppercase(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}
