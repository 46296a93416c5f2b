//! Structured assertion failures.

use std::fmt;

use crate::value::Value;

/// The kind of mismatch a failure reports.
///
/// The rendered strings are stable and safe to match in golden tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    MissingEntry,
    IncompatibleDataType,
    KeyExists,
    KeyDoesNotExist,
    Equal,
    NotEqual,
    Length,
    MissingCase,
    RegExprMatches,
    RegExprDoesNotMatch,
    Range,
    RangeNot,
    Contains,
    DoesNotContain,
    Predicate,
    NilValue,
}

impl Violation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Violation::MissingEntry => "entry was missing",
            Violation::IncompatibleDataType => "data type was incompatible",
            Violation::KeyExists => "key should exist",
            Violation::KeyDoesNotExist => "key should not exist",
            Violation::Equal => "value should be equal",
            Violation::NotEqual => "value should not be equal",
            Violation::Length => "should have the same length",
            Violation::MissingCase => "missing switch/case value",
            Violation::RegExprMatches => "should match regrexp",
            Violation::RegExprDoesNotMatch => "should not match regrexp",
            Violation::Range => "should be in range",
            Violation::RangeNot => "should not be in range",
            Violation::Contains => "should contain fragment",
            Violation::DoesNotContain => "should not contain fragment",
            Violation::Predicate => "should pass predicate",
            Violation::NilValue => "should have not nil",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single point of disagreement between expected and actual.
#[derive(Debug, Clone)]
pub struct Failure {
    /// Source tag inherited from the path (for example a fixture filename).
    pub source: String,
    /// Rendered path of the disagreeing node.
    pub path: String,
    /// What kind of mismatch this is.
    pub violation: Violation,
    /// The expected side at the point of disagreement.
    pub expected: Value,
    /// The actual side at the point of disagreement.
    pub actual: Value,
    /// Additional context, such as the missing key name.
    pub extras: Vec<String>,
}

impl Failure {
    pub fn new(
        source: String,
        path: String,
        violation: Violation,
        expected: Value,
        actual: Value,
    ) -> Self {
        Self {
            source,
            path,
            violation,
            expected,
            actual,
            extras: Vec::new(),
        }
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source.is_empty() {
            write!(f, "[{}] ", self.source)?;
        }
        write!(
            f,
            "{}: {}, expected: {}, actual: {}",
            self.path,
            self.violation,
            self.expected.as_text(),
            self.actual.as_text()
        )?;
        if !self.extras.is_empty() {
            write!(f, " ({})", self.extras.join(", "))?;
        }
        Ok(())
    }
}
