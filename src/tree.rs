//! In-memory descriptor tree
//!
//! Descriptors are ordered trees of named elements. Each element carries an
//! ordered list of attributes and an ordered list of children, which are
//! either nested elements or text.
//!
//! Merging never mutates its inputs: every merge result is a freshly built
//! tree, so parsed documents can be shared between merges and cached.

use std::fmt;

/// A child node of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element
    Element(Element),
    /// Character data
    Text(String),
}

impl Node {
    /// The element behind this node, if it is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Whether this node is text made only of whitespace
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// A named element with attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes and no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add or overwrite an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder: append a text node
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder: append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attributes in stored order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Set an attribute, keeping its position when it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// All child nodes in document order
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Append a child node
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Append a text node
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Direct text content: the concatenation of this element's text nodes
    ///
    /// Returns `None` when the element has no text nodes at all.
    pub fn text(&self) -> Option<String> {
        let mut texts = self.children.iter().filter_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            Node::Element(_) => None,
        });
        let first = texts.next()?;
        Some(texts.fold(first.to_string(), |mut acc, text| {
            acc.push_str(text);
            acc
        }))
    }

    /// Direct text that is not only whitespace
    pub fn significant_text(&self) -> Option<String> {
        self.text().filter(|text| !text.trim().is_empty())
    }

    /// Whether the element has non-blank text or any child element
    pub fn has_content(&self) -> bool {
        self.children.iter().any(|node| match node {
            Node::Element(_) => true,
            Node::Text(text) => !text.trim().is_empty(),
        })
    }

    /// Whether the element has neither attributes nor content
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && !self.has_content()
    }

    /// Copy of this element without attributes matching `drop`, applied to
    /// the whole subtree
    pub fn without_attributes<F>(&self, drop: &F) -> Element
    where
        F: Fn(&str) -> bool,
    {
        Element {
            name: self.name.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(key, _)| !drop(key.as_str()))
                .cloned()
                .collect(),
            children: self
                .children
                .iter()
                .map(|node| match node {
                    Node::Element(element) => Node::Element(element.without_attributes(drop)),
                    Node::Text(text) => Node::Text(text.clone()),
                })
                .collect(),
        }
    }

    /// Number of elements in this subtree, including this one
    pub fn element_count(&self) -> usize {
        1 + self
            .child_elements()
            .map(Element::element_count)
            .sum::<usize>()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::xml::element_to_string(self))
    }
}

/// A parsed descriptor document
///
/// A document without a root is the result of merging nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    root: Option<Element>,
}

impl Document {
    /// Wrap a root element
    pub fn new(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// A document with no root element
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<Element> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
