//! Element matching
//!
//! Decides whether an element of the parent tree and an element of the child
//! tree stand for the same logical node and should be merged recursively.

use crate::tree::Element;

/// Decides whether two sibling elements from parent and child trees match
pub trait ElementMatcher: Send + Sync {
    /// Whether `parent` and `child` represent the same logical node
    fn matches(&self, parent: &Element, child: &Element) -> bool;
}

/// Matches elements with the same name and the same identifying attribute
///
/// Elements that lack the attribute never match, even when their names are
/// equal; each of them keeps its own position in the merged output.
#[derive(Debug, Clone)]
pub struct AttributeMatcher {
    attribute: String,
}

impl AttributeMatcher {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl Default for AttributeMatcher {
    fn default() -> Self {
        Self::new("id")
    }
}

impl ElementMatcher for AttributeMatcher {
    fn matches(&self, parent: &Element, child: &Element) -> bool {
        if parent.name() != child.name() {
            return false;
        }
        match (
            parent.attribute(&self.attribute),
            child.attribute(&self.attribute),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
