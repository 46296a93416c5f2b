//! Map comparator.
//!
//! Expected is a specification, not an exhaustive template: every expected
//! entry must be satisfied by actual, while extra actual keys are ignored.

use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::warn;

use crate::compare::{assert_value, index_slice_by, keys_pair_value, keys_value};
use crate::context::Context;
use crate::directive::SHARED_CASE_KEY;
use crate::failure::{Failure, Violation};
use crate::path::DataPath;
use crate::validation::Validation;
use crate::value::Value;

pub(crate) fn assert_map(
    expected: &HashMap<String, Value>,
    actual_value: &Value,
    path: &DataPath,
    ctx: &Context,
    validation: &mut Validation,
) -> Result<()> {
    if actual_value.is_null() {
        validation.add_failure(Failure::new(
            path.source(),
            path.path(),
            Violation::NilValue,
            Value::Map(expected.clone()),
            Value::Null,
        ));
        return Ok(());
    }

    let mut expected = expected.clone();
    let mut directive = path.directive(ctx);
    if directive.extract_from(&mut expected) {
        // Newly declared policies apply to this subtree: register them so
        // descendant paths resolve the merged directive.
        ctx.register_rendered(path.path(), directive.clone());
    }
    let mut path = path.clone();
    path.set_source(directive.source.clone());

    let mut actual = match actual_value {
        Value::Map(map) => map.clone(),
        Value::List(items) if !directive.index_by.is_empty() => {
            index_slice_by(items, &directive.index_by)
        }
        _ => {
            validation.add_failure(Failure::new(
                path.source(),
                path.path(),
                Violation::IncompatibleDataType,
                Value::Map(expected.clone()),
                actual_value.clone(),
            ));
            return Ok(());
        }
    };

    directive.learn_data_types(&actual);
    let layout = directive
        .time_layout
        .clone()
        .unwrap_or_else(|| ctx.default_time_layout.clone());
    if let Err(err) = directive.apply(&mut actual, &layout) {
        warn!("failed to apply directive to actual value at {}: {err:#}", path.path());
    }

    if !directive.switch_by.is_empty() {
        let switch_value = keys_value(&actual, &directive.switch_by);
        let Some(case_value) = expected.get(&switch_value).cloned() else {
            validation.add_failure(
                Failure::new(
                    path.source(),
                    path.path(),
                    Violation::MissingCase,
                    Value::Map(expected.clone()),
                    Value::Map(actual.clone()),
                )
                .with_extras(vec![
                    format!("switchBy: {}", directive.switch_by.join(",")),
                    format!("value: {switch_value}"),
                ]),
            );
            return Ok(());
        };
        let Value::Map(mut case_map) = case_value else {
            bail!(
                "switch/case value for {switch_value:?} should be a map, path: {}",
                path.path()
            );
        };
        // Shared fields overlay into the selected case; shared wins on
        // key collision.
        if let Some(Value::Map(shared)) = expected.get(SHARED_CASE_KEY) {
            for (key, value) in shared {
                case_map.insert(key.clone(), value.clone());
            }
        }
        expected = case_map;
    }

    if let Err(err) = directive.apply(&mut expected, &layout) {
        warn!("failed to apply directive to expected value at {}: {err:#}", path.path());
    }

    let indexable = !directive.index_by.is_empty() && expected.values().any(Value::is_map);

    for (expected_key, expected_value) in &expected {
        if expected_value.is_null() || expected_value.as_text().is_empty() {
            continue;
        }
        if directive.is_directive_key(expected_key) {
            continue;
        }

        let key_path = match expected_value {
            Value::Map(entry) if indexable => {
                path.key(&keys_pair_value(entry, &directive.index_by))
            }
            _ => path.key(expected_key),
        };

        let has_key = actual.contains_key(expected_key);
        if directive.key_does_not_exist.contains(expected_key) {
            if has_key {
                validation.add_failure(Failure::new(
                    key_path.source(),
                    key_path.path(),
                    Violation::KeyDoesNotExist,
                    Value::Text(expected_key.clone()),
                    Value::Text(expected_key.clone()),
                ));
            } else {
                validation.passed();
            }
            continue;
        }
        if directive.key_exists.contains(expected_key) {
            if has_key {
                validation.passed();
            } else {
                validation.add_failure(Failure::new(
                    key_path.source(),
                    key_path.path(),
                    Violation::KeyExists,
                    Value::Text(expected_key.clone()),
                    Value::Text(available_keys(&actual)),
                ));
            }
            continue;
        }

        match actual.get(expected_key) {
            None => {
                validation.add_failure(
                    Failure::new(
                        key_path.source(),
                        key_path.path(),
                        Violation::MissingEntry,
                        expected_value.clone(),
                        Value::Text(available_keys(&actual)),
                    )
                    .with_extras(vec![format!("key: {expected_key}")]),
                );
            }
            Some(actual_entry) => {
                assert_value(expected_value, actual_entry, &key_path, ctx, validation)?;
            }
        }
    }
    Ok(())
}

fn available_keys(map: &HashMap<String, Value>) -> String {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::assert;
    use serde_json::json;

    fn check(expected: serde_json::Value, actual: serde_json::Value) -> Validation {
        assert(expected, actual, &DataPath::root()).unwrap()
    }

    #[test]
    fn test_extra_actual_keys_are_not_failures() {
        let validation = check(json!({"a": 1}), json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(validation.passed_count, 1);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_missing_entry_lists_available_keys() {
        let validation = check(json!({"a": 1}), json!({"x": 1, "y": 2}));
        let failure = &validation.failures[0];
        assert_eq!(failure.violation, Violation::MissingEntry);
        assert_eq!(failure.path, "/a");
        assert_eq!(failure.actual.as_text(), "x,y");
        assert_eq!(failure.extras, vec!["key: a".to_string()]);
    }

    #[test]
    fn test_nil_actual() {
        let validation = check(json!({"a": 1}), json!(null));
        assert_eq!(validation.failures[0].violation, Violation::NilValue);
    }

    #[test]
    fn test_incompatible_actual() {
        let validation = check(json!({"a": 1}), json!("scalar"));
        assert_eq!(
            validation.failures[0].violation,
            Violation::IncompatibleDataType
        );
    }

    #[test]
    fn test_key_exists() {
        let validation = check(json!({"@keyExists": ["id"]}), json!({"id": null}));
        assert_eq!(validation.passed_count, 1);

        let validation = check(json!({"@keyExists": ["id"]}), json!({"other": 1}));
        let failure = &validation.failures[0];
        assert_eq!(failure.violation, Violation::KeyExists);
        assert_eq!(failure.actual.as_text(), "other");
    }

    #[test]
    fn test_key_does_not_exist() {
        let validation = check(json!({"@keyDoesNotExist": ["secret"]}), json!({"a": 1}));
        assert_eq!(validation.passed_count, 1);

        let validation = check(
            json!({"@keyDoesNotExist": ["secret"]}),
            json!({"secret": 1}),
        );
        assert_eq!(validation.failures[0].violation, Violation::KeyDoesNotExist);
    }

    #[test]
    fn test_key_existence_does_not_recurse() {
        // The value under an asserted key is not compared.
        let validation = check(
            json!({"@keyExists": ["id"], "id": {"nested": "ignored"}}),
            json!({"id": 42}),
        );
        assert_eq!(validation.passed_count, 1);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_switch_by_selects_case() {
        let expected = json!({"@switchBy": ["kind"], "A": {"x": 1}, "B": {"x": 2}});
        let validation = check(expected.clone(), json!({"kind": "A", "x": 1}));
        assert!(!validation.has_failure());

        let validation = check(expected, json!({"kind": "C", "x": 1}));
        assert_eq!(validation.failures[0].violation, Violation::MissingCase);
    }

    #[test]
    fn test_switch_by_shared_overlay_wins() {
        let expected = json!({
            "@switchBy": ["kind"],
            "shared": {"x": 9, "common": true},
            "A": {"x": 1},
        });
        let validation = check(expected, json!({"kind": "A", "x": 9, "common": true}));
        assert_eq!(validation.passed_count, 2);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_switch_case_must_be_map() {
        let expected = json!({"@switchBy": ["kind"], "A": "not a map"});
        let result = assert(expected, json!({"kind": "A"}), &DataPath::root());
        assert!(result.is_err());
    }

    #[test]
    fn test_actual_slice_indexed_by_directive() {
        let expected = json!({
            "@indexBy": ["id"],
            "1": {"id": 1, "v": "x"},
            "2": {"id": 2, "v": "y"},
        });
        let actual = json!([{"id": 2, "v": "y"}, {"id": 1, "v": "x"}]);
        let validation = check(expected, actual);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_actual_slice_without_index_by_is_incompatible() {
        let validation = check(json!({"a": 1}), json!([1, 2]));
        assert_eq!(
            validation.failures[0].violation,
            Violation::IncompatibleDataType
        );
    }

    #[test]
    fn test_empty_expected_entry_is_skipped() {
        let validation = check(json!({"a": ""}), json!({"b": 1}));
        assert_eq!(validation.passed_count, 0);
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_source_directive_propagates_to_failures() {
        let validation = check(
            json!({"@source": "users.json", "a": 1}),
            json!({"a": 2}),
        );
        assert_eq!(validation.failures[0].source, "users.json");
    }

    #[test]
    fn test_directive_applies_to_descendants() {
        // @timeLayout declared on the root subtree governs the nested map.
        let validation = check(
            json!({"@timeLayout": "%d/%m/%Y %H:%M", "job": {"started": "02/08/2026 10:00"}}),
            json!({"job": {"started": "2026-08-02T10:00:00Z"}}),
        );
        assert!(!validation.has_failure());
    }

    #[test]
    fn test_declared_data_type_coerces_actual() {
        let validation = check(
            json!({"@dataType/count": "int", "count": 3}),
            json!({"count": "3"}),
        );
        assert!(!validation.has_failure());
    }
}
