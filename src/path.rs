//! Data paths naming every visited node in a comparison.
//!
//! A [`DataPath`] is an immutable cons list of segments. Extending a path by
//! key or index returns a new value; the original is untouched. Paths carry
//! an optional source tag (for example a fixture filename) that children
//! inherit.

use std::sync::Arc;

use crate::context::Context;
use crate::directive::Directive;

/// An immutable identifier for a position inside a data tree.
#[derive(Debug, Clone)]
pub struct DataPath {
    parent: Option<Arc<DataPath>>,
    segment: Segment,
    source: Option<String>,
}

#[derive(Debug, Clone)]
enum Segment {
    Root,
    Key(String),
    Index(usize),
}

impl DataPath {
    /// The root path, rendered as `/`.
    pub fn root() -> DataPath {
        DataPath {
            parent: None,
            segment: Segment::Root,
            source: None,
        }
    }

    /// Extend this path by a map key.
    pub fn key(&self, key: &str) -> DataPath {
        DataPath {
            parent: Some(Arc::new(self.clone())),
            segment: Segment::Key(key.to_string()),
            source: None,
        }
    }

    /// Extend this path by a sequence index.
    pub fn index(&self, index: usize) -> DataPath {
        DataPath {
            parent: Some(Arc::new(self.clone())),
            segment: Segment::Index(index),
            source: None,
        }
    }

    /// Render the path: `/`, `/a`, `/items[0].id`.
    pub fn path(&self) -> String {
        match &self.segment {
            Segment::Root => "/".to_string(),
            Segment::Key(key) => {
                let parent = self.parent_path();
                if parent == "/" {
                    format!("/{key}")
                } else {
                    format!("{parent}.{key}")
                }
            }
            Segment::Index(index) => format!("{}[{index}]", self.parent_path()),
        }
    }

    fn parent_path(&self) -> String {
        self.parent
            .as_ref()
            .map(|parent| parent.path())
            .unwrap_or_else(|| "/".to_string())
    }

    /// The source tag for this position, inherited from the nearest ancestor
    /// that set one.
    pub fn source(&self) -> String {
        if let Some(source) = &self.source {
            return source.clone();
        }
        self.parent
            .as_ref()
            .map(|parent| parent.source())
            .unwrap_or_default()
    }

    /// Attach a source tag. Children extended from this value inherit it.
    pub fn set_source(&mut self, source: Option<String>) {
        if let Some(source) = source {
            if !source.is_empty() {
                self.source = Some(source);
            }
        }
    }

    /// Resolve the directive in force at this path.
    ///
    /// Walks the ancestor chain root-first, overlaying every directive
    /// registered on the context. Explicitly set fields of a deeper
    /// directive win; unset fields inherit from the ancestors.
    pub fn directive(&self, ctx: &Context) -> Directive {
        let mut chain: Vec<&DataPath> = Vec::new();
        let mut current = Some(self);
        while let Some(path) = current {
            chain.push(path);
            current = path.parent.as_deref();
        }

        let mut directive = Directive::default();
        for path in chain.iter().rev() {
            if let Some(mut registered) = ctx.directive_at(&path.path()) {
                registered.merge_from(&directive);
                directive = registered;
            }
        }
        directive
    }
}
