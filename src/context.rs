//! Assertion context: macro expansion, directive registry, defaults.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use anyhow::Result;

use crate::directive::Directive;
use crate::path::DataPath;
use crate::value::Value;

/// Default time parse layout when neither the context nor a directive
/// overrides it.
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Expands templated expected text before comparison.
///
/// The engine consults the evaluator for every expected string that is not
/// complete JSON. A non-string expansion replaces expected as-is; a string
/// expansion replaces the text and comparison continues.
pub trait Evaluator: Send + Sync {
    /// Check whether the text contains a macro worth expanding.
    fn has_macro(&self, text: &str) -> bool;

    /// Expand the text into a replacement value.
    fn expand(&self, text: &str) -> Result<Value>;
}

/// Evaluator that never expands anything. Used by the default context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvaluator;

impl Evaluator for NoopEvaluator {
    fn has_macro(&self, _text: &str) -> bool {
        false
    }

    fn expand(&self, text: &str) -> Result<Value> {
        Ok(Value::Text(text.to_string()))
    }
}

/// Shared state for one family of assertions.
///
/// Holds the macro evaluator, the path-to-directive registry, and the
/// per-context comparison defaults. The registry uses interior mutability
/// because directive extraction registers policies for descendant paths
/// mid-comparison; the whole context is single-threaded per invocation.
pub struct Context {
    evaluator: Box<dyn Evaluator>,
    registry: RefCell<HashMap<String, Directive>>,
    /// Time parse layout used when no directive overrides it.
    pub default_time_layout: String,
    /// When false, text may leniently match a time instant.
    pub strict_data_type_check: bool,
}

impl Context {
    /// A context with no macro support and default comparison settings.
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(NoopEvaluator))
    }

    /// A context using the supplied macro evaluator.
    pub fn with_evaluator(evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            evaluator,
            registry: RefCell::new(HashMap::new()),
            default_time_layout: DEFAULT_TIME_LAYOUT.to_string(),
            strict_data_type_check: false,
        }
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    /// Attach a directive to a path. It applies to that path and all of its
    /// descendants until a deeper directive overrides individual fields.
    pub fn register(&self, path: &DataPath, directive: Directive) {
        self.register_rendered(path.path(), directive);
    }

    pub(crate) fn register_rendered(&self, path: String, directive: Directive) {
        self.registry.borrow_mut().insert(path, directive);
    }

    /// Look up the directive registered at an exact rendered path.
    pub fn directive_at(&self, path: &str) -> Option<Directive> {
        self.registry.borrow().get(path).cloned()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("registered_paths", &self.registry.borrow().len())
            .field("default_time_layout", &self.default_time_layout)
            .field("strict_data_type_check", &self.strict_data_type_check)
            .finish()
    }
}
