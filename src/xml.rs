//! Markup adapter
//!
//! Converts descriptor markup to and from the [`tree`](crate::tree) model.
//! Parsing is delegated to `xot`; comments and processing instructions are
//! not part of the descriptor model and are dropped. Serialization writes
//! attributes in stored order and self-closes elements without children.

use xot::{Node as XotNode, Value, Xot};

use crate::error::{Error, Result};
use crate::tree::{Document, Element, Node};

/// Parse descriptor markup into a [`Document`]
pub fn parse(markup: &str) -> Result<Document> {
    let mut xot = Xot::new();
    let root = xot.parse(markup).map_err(|e| Error::XmlParse {
        message: e.to_string(),
    })?;
    let document_element = xot.document_element(root).map_err(|e| Error::XmlParse {
        message: e.to_string(),
    })?;
    let element = convert_element(&xot, document_element)?;
    Ok(Document::new(element))
}

fn convert_element(xot: &Xot, node: XotNode) -> Result<Element> {
    let source = xot.element(node).ok_or_else(|| Error::XmlParse {
        message: "expected an element node".to_string(),
    })?;
    let mut element = Element::new(xot.local_name_str(source.name()));

    for (name, value) in xot.attributes(node).iter() {
        element.set_attribute(xot.local_name_str(name), value.as_str());
    }

    for child in xot.children(node) {
        match xot.value(child) {
            Value::Element(_) => element.push(convert_element(xot, child)?),
            Value::Text(text) => element.push_text(text.get()),
            _ => {}
        }
    }

    Ok(element)
}

/// Serialize a document; an empty document serializes to an empty string
pub fn to_string(document: &Document) -> String {
    document.root().map(element_to_string).unwrap_or_default()
}

/// Serialize a single element subtree
pub fn element_to_string(element: &Element) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for (name, value) in element.attributes() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }

    if element.children().is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in element.children() {
        match child {
            Node::Element(nested) => write_element(nested, out),
            Node::Text(text) => escape_into(text, false, out),
        }
    }
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
