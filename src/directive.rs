//! Per-subtree comparison policies.
//!
//! A [`Directive`] is a bag of policies extracted from reserved `@`-prefixed
//! keys inside an expected map. Directives compose along a path: fields set
//! deeper in the tree override, unset fields inherit.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use anyhow::{anyhow, bail, Error, Result};
use tracing::warn;

use crate::value::Value;

pub const SOURCE_KEY: &str = "@source";
pub const INDEX_BY_KEY: &str = "@indexBy";
pub const SWITCH_BY_KEY: &str = "@switchBy";
pub const KEY_EXISTS_KEY: &str = "@keyExists";
pub const KEY_DOES_NOT_EXIST_KEY: &str = "@keyDoesNotExist";
pub const CASE_SENSITIVE_KEY: &str = "@caseSensitive";
pub const SORT_TEXT_KEY: &str = "@sortText";
pub const TIME_LAYOUT_KEY: &str = "@timeLayout";
pub const DATA_TYPE_PREFIX: &str = "@dataType/";
pub const STRICT_DATA_TYPE_CHECK_KEY: &str = "@strictDataTypeCheck";

/// Reserved key selecting the overlay map inside a switch/case expected map.
pub const SHARED_CASE_KEY: &str = "shared";

/// Declared type used to coerce a field before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    Time,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Time => "time",
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(DataType::Int),
            "float" | "double" => Ok(DataType::Float),
            "bool" | "boolean" => Ok(DataType::Bool),
            "time" | "date" | "datetime" | "timestamp" => Ok(DataType::Time),
            other => Err(anyhow!("unknown data type {other:?}")),
        }
    }
}

/// Comparison policies for a subtree.
///
/// `None` / empty means "unset, inherit from the enclosing directive".
#[derive(Debug, Clone, Default)]
pub struct Directive {
    /// Free-form label propagated onto failures and child paths.
    pub source: Option<String>,
    /// Actual-map keys whose concatenated values select a case in expected.
    pub switch_by: Vec<String>,
    /// Map keys used to index a slice of maps by the tuple of those fields.
    pub index_by: Vec<String>,
    /// Keys whose presence in actual is the assertion.
    pub key_exists: HashSet<String>,
    /// Keys whose absence from actual is the assertion.
    pub key_does_not_exist: HashSet<String>,
    /// When false, map keys in slice comparison fold to upper case.
    pub case_sensitive: Option<bool>,
    /// When true, slices compare as sorted bags of rendered strings.
    pub sort_text: Option<bool>,
    /// Declared or learned field types used to coerce scalars.
    pub data_types: HashMap<String, DataType>,
    /// Time parse layout for this subtree.
    pub time_layout: Option<String>,
    /// When false, text may leniently match a time instant.
    pub strict_data_type_check: Option<bool>,
}

impl Directive {
    /// Check whether a map key is reserved for directives.
    pub fn is_directive_key(&self, key: &str) -> bool {
        is_directive_key(key)
    }

    /// Remove recognised directive keys from `map` and record their
    /// policies. Returns whether any were present.
    ///
    /// Key-existence directives leave a placeholder entry in the residual
    /// map for each listed key, so the map comparator visits it. A second
    /// extraction is a no-op: no directive keys survive the first.
    pub fn extract_from(&mut self, map: &mut HashMap<String, Value>) -> bool {
        let keys: Vec<String> = map
            .keys()
            .filter(|key| is_directive_key(key))
            .cloned()
            .collect();
        for key in &keys {
            let Some(value) = map.remove(key) else { continue };
            match key.as_str() {
                SOURCE_KEY => self.source = Some(value.as_text()),
                INDEX_BY_KEY => self.index_by = string_list(&value),
                SWITCH_BY_KEY => self.switch_by = string_list(&value),
                KEY_EXISTS_KEY => {
                    for name in string_list(&value) {
                        map.entry(name.clone()).or_insert(Value::Bool(true));
                        self.key_exists.insert(name);
                    }
                }
                KEY_DOES_NOT_EXIST_KEY => {
                    for name in string_list(&value) {
                        map.entry(name.clone()).or_insert(Value::Bool(true));
                        self.key_does_not_exist.insert(name);
                    }
                }
                CASE_SENSITIVE_KEY => self.case_sensitive = Some(as_bool(&value)),
                SORT_TEXT_KEY => self.sort_text = Some(as_bool(&value)),
                TIME_LAYOUT_KEY => self.time_layout = Some(value.as_text()),
                STRICT_DATA_TYPE_CHECK_KEY => {
                    self.strict_data_type_check = Some(as_bool(&value))
                }
                other if other.starts_with(DATA_TYPE_PREFIX) => {
                    let field = &other[DATA_TYPE_PREFIX.len()..];
                    match value.as_text().parse::<DataType>() {
                        Ok(data_type) => {
                            self.data_types.insert(field.to_string(), data_type);
                        }
                        Err(err) => warn!("ignoring {other}: {err}"),
                    }
                }
                _ => {}
            }
        }
        !keys.is_empty()
    }

    /// Inherit unset fields from a parent directive.
    pub fn merge_from(&mut self, parent: &Directive) {
        if self.source.is_none() {
            self.source = parent.source.clone();
        }
        if self.switch_by.is_empty() {
            self.switch_by = parent.switch_by.clone();
        }
        if self.index_by.is_empty() {
            self.index_by = parent.index_by.clone();
        }
        if self.key_exists.is_empty() {
            self.key_exists = parent.key_exists.clone();
        }
        if self.key_does_not_exist.is_empty() {
            self.key_does_not_exist = parent.key_does_not_exist.clone();
        }
        if self.case_sensitive.is_none() {
            self.case_sensitive = parent.case_sensitive;
        }
        if self.sort_text.is_none() {
            self.sort_text = parent.sort_text;
        }
        for (field, data_type) in &parent.data_types {
            self.data_types.entry(field.clone()).or_insert(*data_type);
        }
        if self.time_layout.is_none() {
            self.time_layout = parent.time_layout.clone();
        }
        if self.strict_data_type_check.is_none() {
            self.strict_data_type_check = parent.strict_data_type_check;
        }
    }

    /// Record type hints from an actual map for fields without a declared
    /// type, so expected scalars rendered as text can be coerced to match.
    pub fn learn_data_types(&mut self, map: &HashMap<String, Value>) {
        for (field, value) in map {
            if self.data_types.contains_key(field) {
                continue;
            }
            let data_type = match value {
                Value::Int(_) => DataType::Int,
                Value::Float(_) => DataType::Float,
                Value::Bool(_) => DataType::Bool,
                Value::Time(_) => DataType::Time,
                _ => continue,
            };
            self.data_types.insert(field.clone(), data_type);
        }
    }

    /// Coerce map entries per the recorded field types.
    ///
    /// Coercion continues past individual failures; the first failure is
    /// returned so the caller can log it and carry on with the uncoerced
    /// entries.
    pub fn apply(&self, map: &mut HashMap<String, Value>, layout: &str) -> Result<()> {
        let mut first_error: Option<Error> = None;
        for (field, data_type) in &self.data_types {
            let Some(value) = map.get(field) else { continue };
            match coerce(value, *data_type, layout) {
                Ok(coerced) => {
                    map.insert(field.clone(), coerced);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("field {field:?}")));
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Re-inject this directive's policies as reserved keys into an expected
    /// element map, so nested map comparison picks them up.
    pub fn add_to(&self, map: &mut HashMap<String, Value>) {
        if !self.index_by.is_empty() {
            map.entry(INDEX_BY_KEY.to_string())
                .or_insert_with(|| text_list(&self.index_by));
        }
        if !self.switch_by.is_empty() {
            map.entry(SWITCH_BY_KEY.to_string())
                .or_insert_with(|| text_list(&self.switch_by));
        }
        if !self.key_exists.is_empty() {
            let names: Vec<String> = self.key_exists.iter().cloned().collect();
            map.entry(KEY_EXISTS_KEY.to_string())
                .or_insert_with(|| text_list(&names));
        }
        if !self.key_does_not_exist.is_empty() {
            let names: Vec<String> = self.key_does_not_exist.iter().cloned().collect();
            map.entry(KEY_DOES_NOT_EXIST_KEY.to_string())
                .or_insert_with(|| text_list(&names));
        }
        if let Some(case_sensitive) = self.case_sensitive {
            map.entry(CASE_SENSITIVE_KEY.to_string())
                .or_insert(Value::Bool(case_sensitive));
        }
        if let Some(sort_text) = self.sort_text {
            map.entry(SORT_TEXT_KEY.to_string())
                .or_insert(Value::Bool(sort_text));
        }
        if let Some(layout) = &self.time_layout {
            map.entry(TIME_LAYOUT_KEY.to_string())
                .or_insert_with(|| Value::Text(layout.clone()));
        }
        if let Some(strict) = self.strict_data_type_check {
            map.entry(STRICT_DATA_TYPE_CHECK_KEY.to_string())
                .or_insert(Value::Bool(strict));
        }
        if let Some(source) = &self.source {
            map.entry(SOURCE_KEY.to_string())
                .or_insert_with(|| Value::Text(source.clone()));
        }
        for (field, data_type) in &self.data_types {
            map.entry(format!("{DATA_TYPE_PREFIX}{field}"))
                .or_insert_with(|| Value::Text(data_type.as_str().to_string()));
        }
    }

    /// Fold the key lists and sets to upper case, matching maps whose keys
    /// were folded for case-insensitive comparison.
    pub fn apply_case_insensitive(&mut self) {
        self.index_by = self.index_by.iter().map(|k| k.to_uppercase()).collect();
        self.switch_by = self.switch_by.iter().map(|k| k.to_uppercase()).collect();
        self.key_exists = self.key_exists.iter().map(|k| k.to_uppercase()).collect();
        self.key_does_not_exist = self
            .key_does_not_exist
            .iter()
            .map(|k| k.to_uppercase())
            .collect();
        self.data_types = self
            .data_types
            .iter()
            .map(|(field, data_type)| (field.to_uppercase(), *data_type))
            .collect();
    }
}

fn coerce(value: &Value, data_type: DataType, layout: &str) -> Result<Value> {
    match data_type {
        DataType::Int => Ok(Value::Int(value.to_int()?)),
        DataType::Float => Ok(Value::Float(value.to_float()?)),
        DataType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Text(t) if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::Text(t) if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => bail!("cannot convert {other:?} to bool"),
        },
        DataType::Time => value
            .to_time(layout)
            .map(Value::Time)
            .ok_or_else(|| anyhow!("cannot convert {value:?} to time with layout {layout:?}")),
    }
}

/// Check whether a map key is reserved for directives.
pub fn is_directive_key(key: &str) -> bool {
    matches!(
        key,
        SOURCE_KEY
            | INDEX_BY_KEY
            | SWITCH_BY_KEY
            | KEY_EXISTS_KEY
            | KEY_DOES_NOT_EXIST_KEY
            | CASE_SENSITIVE_KEY
            | SORT_TEXT_KEY
            | TIME_LAYOUT_KEY
            | STRICT_DATA_TYPE_CHECK_KEY
    ) || key.starts_with(DATA_TYPE_PREFIX)
}

/// Read a directive value as a list of names: either a JSON list or a
/// comma-separated string.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .iter()
            .map(Value::as_text)
            .filter(|name| !name.is_empty())
            .collect(),
        other => other
            .as_text()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn text_list(names: &[String]) -> Value {
    Value::List(names.iter().cloned().map(Value::Text).collect())
}

fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Text(t) => t.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn map_of(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_extract_removes_directive_keys() {
        let mut map = map_of(&[
            (INDEX_BY_KEY, Value::Text("id,name".to_string())),
            (CASE_SENSITIVE_KEY, Value::Bool(true)),
            ("payload", Value::Int(1)),
        ]);
        let mut directive = Directive::default();
        assert!(directive.extract_from(&mut map));

        assert_eq!(directive.index_by, vec!["id", "name"]);
        assert_eq!(directive.case_sensitive, Some(true));
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("payload"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let mut map = map_of(&[
            (SORT_TEXT_KEY, Value::Bool(true)),
            (KEY_EXISTS_KEY, Value::Text("id".to_string())),
            ("a", Value::Int(1)),
        ]);
        let mut directive = Directive::default();
        directive.extract_from(&mut map);

        let snapshot = map.clone();
        let mut second = Directive::default();
        assert!(!second.extract_from(&mut map));
        assert_eq!(map, snapshot);
    }

    #[test]
    fn test_extract_key_exists_leaves_placeholder() {
        let mut map = map_of(&[(KEY_EXISTS_KEY, Value::Text("id".to_string()))]);
        let mut directive = Directive::default();
        directive.extract_from(&mut map);

        assert!(directive.key_exists.contains("id"));
        assert_eq!(map.get("id"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_extract_data_type_key() {
        let mut map = map_of(&[("@dataType/count", Value::Text("int".to_string()))]);
        let mut directive = Directive::default();
        directive.extract_from(&mut map);
        assert_eq!(directive.data_types.get("count"), Some(&DataType::Int));
    }

    #[test]
    fn test_merge_inherits_unset_fields() {
        let mut parent = Directive::default();
        parent.index_by = vec!["id".to_string()];
        parent.time_layout = Some("%Y-%m-%d".to_string());

        let mut child = Directive::default();
        child.time_layout = Some("%H:%M:%S".to_string());
        child.merge_from(&parent);

        assert_eq!(child.index_by, vec!["id"]);
        assert_eq!(child.time_layout.as_deref(), Some("%H:%M:%S"));
    }

    #[test]
    fn test_learn_data_types_from_actual() {
        let actual = map_of(&[("n", Value::Int(3)), ("label", Value::Text("x".to_string()))]);
        let mut directive = Directive::default();
        directive.learn_data_types(&actual);

        assert_eq!(directive.data_types.get("n"), Some(&DataType::Int));
        assert!(!directive.data_types.contains_key("label"));
    }

    #[test]
    fn test_apply_coerces_text_to_int() {
        let mut directive = Directive::default();
        directive.data_types.insert("n".to_string(), DataType::Int);

        let mut map = map_of(&[("n", Value::Text("42".to_string()))]);
        directive.apply(&mut map, "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(map.get("n"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_apply_reports_failure_but_continues() {
        let mut directive = Directive::default();
        directive.data_types.insert("a".to_string(), DataType::Int);
        directive.data_types.insert("b".to_string(), DataType::Int);

        let mut map = map_of(&[
            ("a", Value::Text("not a number".to_string())),
            ("b", Value::Text("7".to_string())),
        ]);
        assert!(directive.apply(&mut map, "%Y-%m-%d %H:%M:%S").is_err());
        assert_eq!(map.get("b"), Some(&Value::Int(7)));
        assert_eq!(map.get("a"), Some(&Value::Text("not a number".to_string())));
    }

    #[test]
    fn test_add_to_round_trips_through_extraction() {
        let mut directive = Directive::default();
        directive.index_by = vec!["id".to_string()];
        directive.case_sensitive = Some(true);

        let mut map = HashMap::new();
        directive.add_to(&mut map);

        let mut extracted = Directive::default();
        extracted.extract_from(&mut map);
        assert_eq!(extracted.index_by, vec!["id"]);
        assert_eq!(extracted.case_sensitive, Some(true));
        assert!(map.is_empty());
    }

    #[test]
    fn test_apply_case_insensitive_folds_key_lists() {
        let mut directive = Directive::default();
        directive.index_by = vec!["id".to_string()];
        directive.data_types.insert("count".to_string(), DataType::Int);
        directive.apply_case_insensitive();

        assert_eq!(directive.index_by, vec!["ID"]);
        assert_eq!(directive.data_types.get("COUNT"), Some(&DataType::Int));
    }
}
