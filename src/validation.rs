//! Running tally of assertion outcomes.

use std::fmt;

use crate::failure::Failure;

/// Accumulates passes and failures over one assertion invocation.
///
/// A passive container: not safe for concurrent mutation. Callers that
/// parallelise distinct assertions should use one accumulator per call and
/// [`merge`](Validation::merge) the results.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// Number of comparison steps that passed.
    pub passed_count: usize,
    /// Structured failures, in depth-first visitation order.
    pub failures: Vec<Failure>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one passed comparison step.
    pub fn passed(&mut self) {
        self.passed_count += 1;
    }

    /// Append one failure.
    pub fn add_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn has_failure(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: Validation) {
        self.passed_count += other.passed_count;
        self.failures.extend(other.failures);
    }

    /// Render a human-readable summary.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "passed: {}", self.passed_count);
        }
        writeln!(
            f,
            "passed: {}, failed: {}",
            self.passed_count,
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(f, "  {failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Violation;
    use crate::value::Value;

    fn sample_failure() -> Failure {
        Failure::new(
            String::new(),
            "/a".to_string(),
            Violation::Equal,
            Value::Int(1),
            Value::Int(2),
        )
    }

    #[test]
    fn test_counts() {
        let mut validation = Validation::new();
        assert!(!validation.has_failure());

        validation.passed();
        validation.passed();
        validation.add_failure(sample_failure());

        assert_eq!(validation.passed_count, 2);
        assert_eq!(validation.failed_count(), 1);
        assert!(validation.has_failure());
    }

    #[test]
    fn test_merge() {
        let mut first = Validation::new();
        first.passed();

        let mut second = Validation::new();
        second.passed();
        second.add_failure(sample_failure());

        first.merge(second);
        assert_eq!(first.passed_count, 2);
        assert_eq!(first.failed_count(), 1);
    }

    #[test]
    fn test_report_without_failures() {
        let mut validation = Validation::new();
        validation.passed();
        assert_eq!(validation.report(), "passed: 1");
    }

    #[test]
    fn test_report_lists_failures() {
        let mut validation = Validation::new();
        validation.add_failure(sample_failure());
        let report = validation.report();
        assert!(report.starts_with("passed: 0, failed: 1"));
        assert!(report.contains("/a: value should be equal"));
    }
}
