//! # attest
//!
//! A structural assertion engine: decides whether an *actual* value produced
//! by code under test conforms to an *expected* specification. Both sides
//! are heterogeneous data trees — nested maps, sequences, scalars, time
//! instants, and user-supplied predicates. The engine walks the two trees in
//! parallel and reports every point of disagreement with a precise path.
//!
//! Expected strings may carry a compact directive language: `~/regexp/` for
//! regular expressions, `/[min..max]/` for numeric ranges, `/[a,b,c]/` for
//! membership, `/fragment/` for containment, and a leading `!` for negation.
//! Reserved `@`-prefixed keys inside expected maps tune comparison for a
//! whole subtree: `@indexBy` compares sequences of maps order-insensitively,
//! `@switchBy` selects an expected case from actual field values,
//! `@keyExists` / `@keyDoesNotExist` assert mere key presence, and more.
//!
//! Expected is a specification, not an exhaustive template: extra keys and
//! trailing elements in actual are never failures.
//!
//! ## Quick Start
//!
//! ```rust
//! use attest::DataPath;
//! use serde_json::json;
//!
//! let validation = attest::assert(
//!     json!({
//!         "status": "~/^2[0-9]{2}$/",
//!         "items": [
//!             {"@indexBy": ["id"]},
//!             {"id": 1, "name": "/alpha/"},
//!             {"id": 2, "name": "beta"},
//!         ],
//!     }),
//!     json!({
//!         "status": "200",
//!         "elapsed": 0.02,
//!         "items": [
//!             {"id": 2, "name": "beta"},
//!             {"id": 1, "name": "the alpha one"},
//!         ],
//!     }),
//!     &DataPath::root(),
//! ).unwrap();
//!
//! assert!(!validation.has_failure(), "{}", validation.report());
//! ```
//!
//! ## Custom context
//!
//! ```rust
//! use attest::{Context, DataPath, Directive};
//! use serde_json::json;
//!
//! let ctx = Context::new();
//! let mut directive = Directive::default();
//! directive.index_by = vec!["id".to_string()];
//! ctx.register(&DataPath::root().key("rows"), directive);
//!
//! let validation = attest::assert_with_context(
//!     json!({"rows": [{"id": 1}]}),
//!     json!({"rows": [{"id": 1}]}),
//!     &DataPath::root(),
//!     &ctx,
//! ).unwrap();
//! assert!(!validation.has_failure());
//! ```

pub mod compare;
pub mod context;
pub mod directive;
pub mod failure;
pub mod path;
pub mod validation;
pub mod value;

// Core entry points
pub use compare::{assert, assert_with_context};

// Data model
pub use failure::{Failure, Violation};
pub use path::DataPath;
pub use validation::Validation;
pub use value::{is_complete_json, parse_json, Predicate, Value};

// Policies and context
pub use context::{Context, Evaluator, NoopEvaluator, DEFAULT_TIME_LAYOUT};
pub use directive::{DataType, Directive};
