//! Merge cues
//!
//! A cue is a named rule that turns a matched parent/child element pair into
//! one merged element. The leaf cues copy one side verbatim; the container
//! cue `merge-parent-and-child` merges attributes, text and children and
//! recurses into matched child elements through the [`CueResolver`].
//!
//! | Name                      | Default priority | Result                                    |
//! |---------------------------|------------------|-------------------------------------------|
//! | `use-parent`              | 10               | copy of the parent                        |
//! | `use-child`               | 10               | copy of the child                         |
//! | `use-parent-if-not-empty` | 5                | parent, or child when the parent is empty |
//! | `use-child-if-not-empty`  | 5                | child, or parent when the child is empty  |
//! | `merge-parent-and-child`  | 0                | recursive structural merge                |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::trace;
use serde::{Deserialize, Serialize};

use super::resolver::CueResolver;
use crate::error::{Error, Result};
use crate::tree::Element;

/// Parameters handed to a cue: the selecting attribute and sibling
/// parameter attributes, by attribute name
pub type CueParams = BTreeMap<String, String>;

/// Parameter naming the child/parent group order
pub const ORDER_PARAM: &str = "order";

/// The kinds of merge cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    UseParent,
    UseChild,
    UseParentIfNotEmpty,
    UseChildIfNotEmpty,
    MergeParentAndChild,
}

impl CueKind {
    pub const ALL: [CueKind; 5] = [
        CueKind::UseParent,
        CueKind::UseChild,
        CueKind::UseParentIfNotEmpty,
        CueKind::UseChildIfNotEmpty,
        CueKind::MergeParentAndChild,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CueKind::UseParent => "use-parent",
            CueKind::UseChild => "use-child",
            CueKind::UseParentIfNotEmpty => "use-parent-if-not-empty",
            CueKind::UseChildIfNotEmpty => "use-child-if-not-empty",
            CueKind::MergeParentAndChild => "merge-parent-and-child",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CueKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn default_priority(&self) -> i32 {
        match self {
            CueKind::UseParent | CueKind::UseChild => 10,
            CueKind::UseParentIfNotEmpty | CueKind::UseChildIfNotEmpty => 5,
            CueKind::MergeParentAndChild => 0,
        }
    }
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of the child group relative to the parent group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Child-contributed elements precede parent-only elements
    Before,
    /// Parent-only elements precede child-contributed elements
    #[default]
    After,
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "before" => Ok(Order::Before),
            "after" => Ok(Order::After),
            other => Err(format!(
                "invalid order '{}', expected 'before' or 'after'",
                other
            )),
        }
    }
}

/// A merge rule together with its priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCue {
    kind: CueKind,
    priority: i32,
}

impl MergeCue {
    /// A cue with its kind's default priority
    pub fn new(kind: CueKind) -> Self {
        Self::with_priority(kind, kind.default_priority())
    }

    pub fn with_priority(kind: CueKind, priority: i32) -> Self {
        Self { kind, priority }
    }

    /// Look a cue up by name, with its default priority
    pub fn from_name(name: &str) -> Option<Self> {
        CueKind::from_name(name).map(Self::new)
    }

    pub fn kind(&self) -> CueKind {
        self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Merge `child` over `parent`, producing a new element
    ///
    /// Neither input is modified.
    pub fn merge(
        &self,
        parent: &Element,
        child: &Element,
        params: &CueParams,
        resolver: &CueResolver,
    ) -> Result<Element> {
        trace!("applying {} to <{}>", self.kind, child.name());
        match self.kind {
            CueKind::UseParent => Ok(parent.clone()),
            CueKind::UseChild => Ok(child.clone()),
            CueKind::UseParentIfNotEmpty => Ok(if parent.is_empty() {
                child.clone()
            } else {
                parent.clone()
            }),
            CueKind::UseChildIfNotEmpty => Ok(if child.is_empty() {
                parent.clone()
            } else {
                child.clone()
            }),
            CueKind::MergeParentAndChild => merge_parent_and_child(parent, child, params, resolver),
        }
    }
}

/// Structural merge of two matched containers
///
/// Attributes: the parent's, overwritten in place by the child's, then the
/// child-only ones. Text: the child's significant text, else the parent's.
/// Children: the child group (child's elements in child order, matched ones
/// replaced by their merged result) and the parent group (unmatched parent
/// elements in parent order), emitted in the configured order.
fn merge_parent_and_child(
    parent: &Element,
    child: &Element,
    params: &CueParams,
    resolver: &CueResolver,
) -> Result<Element> {
    if parent.name() != child.name() {
        return Err(Error::Merge {
            element: child.name().to_string(),
            message: format!(
                "cannot merge <{}> into <{}>: element names differ",
                child.name(),
                parent.name()
            ),
        });
    }

    let order = match params.get(ORDER_PARAM) {
        Some(value) => value.parse::<Order>().map_err(|message| Error::Merge {
            element: child.name().to_string(),
            message,
        })?,
        None => resolver.default_order(),
    };

    let mut merged = Element::new(parent.name());
    for (name, value) in parent.attributes() {
        merged.set_attribute(name, value);
    }
    for (name, value) in child.attributes() {
        merged.set_attribute(name, value);
    }

    if let Some(text) = child
        .significant_text()
        .or_else(|| parent.significant_text())
    {
        merged.push_text(text);
    }

    let parent_elements: Vec<&Element> = parent.child_elements().collect();
    let mut consumed = vec![false; parent_elements.len()];

    let mut child_group = Vec::new();
    for element in child.child_elements() {
        let counterpart = parent_elements
            .iter()
            .enumerate()
            .find(|(i, candidate)| !consumed[*i] && resolver.matcher().matches(candidate, element))
            .map(|(i, candidate)| (i, *candidate));

        match counterpart {
            Some((index, parent_element)) => {
                consumed[index] = true;
                let context = resolver.resolve(parent_element, element)?;
                child_group.push(context.apply()?);
            }
            None => child_group.push(element.clone()),
        }
    }

    let parent_group: Vec<Element> = parent_elements
        .iter()
        .zip(&consumed)
        .filter(|(_, used)| !**used)
        .map(|(element, _)| (*element).clone())
        .collect();

    let (first, second) = match order {
        Order::Before => (child_group, parent_group),
        Order::After => (parent_group, child_group),
    };
    for element in first.into_iter().chain(second) {
        merged.push(element);
    }

    Ok(merged)
}
