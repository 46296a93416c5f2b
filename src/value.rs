//! Operand model for the assertion engine.
//!
//! Expected and actual sides of an assertion are both [`Value`] trees: a
//! tagged sum over the scalar, collection, and capability kinds the engine
//! compares. Host-language records enter the tree through
//! [`Value::from_serialize`], JSON text through [`parse_json`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Rendering layout used when a time instant is turned back into text.
pub(crate) const TIME_RENDER_LAYOUT: &str = "%Y-%m-%d %H:%M:%S %z";

/// A user-supplied predicate standing in for a literal expected value.
///
/// When the expected side of a comparison is a predicate, the engine invokes
/// it on the actual value instead of comparing structurally.
///
/// # Example
///
/// ```rust
/// use attest::{Predicate, Value};
///
/// struct GreaterThan(i64);
///
/// impl Predicate for GreaterThan {
///     fn test(&self, actual: &Value) -> bool {
///         actual.to_int().map(|v| v > self.0).unwrap_or(false)
///     }
///     fn describe(&self) -> String {
///         format!("greater than {}", self.0)
///     }
/// }
/// ```
pub trait Predicate: Send + Sync {
    /// Evaluate the predicate against an actual value.
    fn test(&self, actual: &Value) -> bool;

    /// Human-readable description used in failure reports.
    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

/// A heterogeneous data tree node.
///
/// Both sides of an assertion are `Value` trees. Maps and lists nest
/// arbitrarily; predicates only make sense on the expected side.
#[derive(Clone)]
pub enum Value {
    /// Absent / JSON null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Text, possibly carrying an embedded match directive.
    Text(String),
    /// Time instant.
    Time(DateTime<Utc>),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Associative map.
    Map(HashMap<String, Value>),
    /// User-supplied predicate capability.
    Predicate(Arc<dyn Predicate>),
}

impl Value {
    /// Convert any serializable record into a `Value` tree.
    ///
    /// Structs become maps, collections become lists. This is the ingress
    /// point for host-language records; the comparators themselves only ever
    /// see `Value` trees.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Value> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Wrap a predicate as an expected value.
    pub fn predicate(predicate: impl Predicate + 'static) -> Value {
        Value::Predicate(Arc::new(predicate))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Value::Time(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Borrow the map entries, if this value is a map.
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the list items, if this value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render this value as text.
    ///
    /// Scalars render to their canonical form, whole floats render without a
    /// fraction, and collections render as compact JSON. `Null` renders
    /// empty, which is what makes an empty expected entry a "don't care".
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => render_float(*value),
            Value::Text(value) => value.clone(),
            Value::Time(value) => value.format(TIME_RENDER_LAYOUT).to_string(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
            Value::Predicate(predicate) => predicate.describe(),
        }
    }

    /// Convert to an integer.
    pub fn to_int(&self) -> Result<i64> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Float(value) if value.is_finite() => Ok(*value as i64),
            Value::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| anyhow!("cannot convert {text:?} to int")),
            other => bail!("cannot convert {other:?} to int"),
        }
    }

    /// Convert to a float.
    pub fn to_float(&self) -> Result<f64> {
        match self {
            Value::Int(value) => Ok(*value as f64),
            Value::Float(value) => Ok(*value),
            Value::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("cannot convert {text:?} to float")),
            other => bail!("cannot convert {other:?} to float"),
        }
    }

    /// Convert to a time instant using the supplied parse layout.
    ///
    /// Text falls back to RFC 3339 and a bare date when the layout does not
    /// match; integers are treated as Unix seconds.
    pub fn to_time(&self, layout: &str) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(value) => Some(*value),
            Value::Text(text) => parse_time(text, layout),
            Value::Int(value) => Utc.timestamp_opt(*value, 0).single(),
            _ => None,
        }
    }

    /// Convert back into a `serde_json` value for rendering.
    ///
    /// Times render with the canonical layout, predicates by description.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(value) => serde_json::Value::String(value.clone()),
            Value::Time(value) => {
                serde_json::Value::String(value.format(TIME_RENDER_LAYOUT).to_string())
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Predicate(predicate) => serde_json::Value::String(predicate.describe()),
        }
    }
}

fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// Parse text into a time instant.
///
/// Tries the supplied layout as a date-time, then as a bare date, then
/// RFC 3339, then `%Y-%m-%d`.
pub(crate) fn parse_time(text: &str, layout: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, layout) {
        return Some(Utc.from_utc_datetime(&datetime));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Check whether a string is a complete JSON object or array.
///
/// Scalar JSON (`"1"`, `"true"`) does not count: only structured payloads
/// are promoted to trees during comparison.
pub fn is_complete_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// Parse a complete JSON object or array into a `Value` tree.
///
/// Returns `None` when the text is not complete JSON.
pub fn parse_json(text: &str) -> Option<Value> {
    if !is_complete_json(text) {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(text.trim())
        .ok()
        .map(Value::from)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Value::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Value::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Value::Text(value) => f.debug_tuple("Text").field(value).finish(),
            Value::Time(value) => f.debug_tuple("Time").field(value).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Predicate(predicate) => {
                f.debug_tuple("Predicate").field(&predicate.describe()).finish()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Predicates compare by identity, never by behavior.
            (Value::Predicate(a), Value::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(value: HashMap<String, Value>) -> Self {
        Value::Map(value)
    }
}
