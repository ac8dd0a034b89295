//! Merge cue resolution
//!
//! Given a matched parent/child element pair, the resolver picks the cue that
//! merges them:
//!
//! 1. The child's attributes are scanned against the child-cue registry and
//!    the parent's attributes against the parent-cue registry. The configured
//!    cue attribute (`merge-cue="use-parent"`) is a candidate on whichever
//!    side carries it; the merger drops it from intermediate results, so it
//!    only steers the merge of the document that carries it.
//! 2. If only one side has a candidate, it wins.
//! 3. If both do, the strictly higher priority wins. **On equal priority the
//!    child-side candidate wins**: the more specific document outranks its
//!    ancestor.
//! 4. If neither does, the default child cue is used when the child has
//!    content (text or child elements), else the default parent cue, so that
//!    merging with an empty element never erases information.
//!
//! The selecting attribute's value and any sibling attribute matching the
//! parameter pattern are handed to the cue as parameters.

use log::debug;
use regex::Regex;

use super::cue::{CueKind, CueParams, MergeCue, Order};
use super::matcher::{AttributeMatcher, ElementMatcher};
use crate::config::{CueBindingConfig, MergeConfig};
use crate::error::{Error, Result};
use crate::tree::Element;

/// An attribute that selects a cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueBinding {
    attribute: String,
    cue: MergeCue,
}

impl CueBinding {
    pub fn new(attribute: impl Into<String>, cue: MergeCue) -> Self {
        Self {
            attribute: attribute.into(),
            cue,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn cue(&self) -> MergeCue {
        self.cue
    }
}

/// Attribute-name to cue mapping for one side of a merge
#[derive(Debug, Clone, Default)]
pub struct CueRegistry {
    bindings: Vec<CueBinding>,
}

impl CueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a binding
    pub fn bind(mut self, attribute: impl Into<String>, cue: MergeCue) -> Self {
        self.bindings.push(CueBinding::new(attribute, cue));
        self
    }

    /// Build a registry from configuration, resolving cue names
    pub fn from_config(bindings: &[CueBindingConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for binding in bindings {
            let kind = CueKind::from_name(&binding.cue).ok_or_else(|| Error::UnresolvedCue {
                attribute: binding.attribute.clone(),
                cue: binding.cue.clone(),
            })?;
            let priority = binding.priority.unwrap_or_else(|| kind.default_priority());
            registry = registry.bind(&binding.attribute, MergeCue::with_priority(kind, priority));
        }
        Ok(registry)
    }

    /// The binding selected by `element`'s attributes
    ///
    /// Among present attributes the highest priority wins; equal priorities
    /// keep the first binding in registration order. An attribute whose value
    /// is `false` does not select its cue.
    pub fn lookup(&self, element: &Element) -> Option<&CueBinding> {
        let mut best: Option<&CueBinding> = None;
        for binding in &self.bindings {
            let enabled = element
                .attribute(&binding.attribute)
                .map(|value| !value.trim().eq_ignore_ascii_case("false"))
                .unwrap_or(false);
            if !enabled {
                continue;
            }
            match best {
                Some(current) if current.cue.priority() >= binding.cue.priority() => {}
                _ => best = Some(binding),
            }
        }
        best
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.attribute.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Which side a cue candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Parent,
    Child,
}

/// The outcome of cue resolution for one element pair
#[derive(Clone)]
pub struct MergeCueContext<'a> {
    cue: MergeCue,
    parent: &'a Element,
    child: &'a Element,
    params: CueParams,
    resolver: &'a CueResolver,
}

impl<'a> MergeCueContext<'a> {
    pub fn new(
        cue: MergeCue,
        parent: &'a Element,
        child: &'a Element,
        params: CueParams,
        resolver: &'a CueResolver,
    ) -> Self {
        Self {
            cue,
            parent,
            child,
            params,
            resolver,
        }
    }

    pub fn cue(&self) -> MergeCue {
        self.cue
    }

    pub fn params(&self) -> &CueParams {
        &self.params
    }

    pub fn parent(&self) -> &Element {
        self.parent
    }

    pub fn child(&self) -> &Element {
        self.child
    }

    /// Run the resolved cue
    pub fn apply(&self) -> Result<Element> {
        self.cue
            .merge(self.parent, self.child, &self.params, self.resolver)
    }
}

impl std::fmt::Debug for MergeCueContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeCueContext")
            .field("cue", &self.cue)
            .field("element", &self.child.name())
            .field("params", &self.params)
            .finish()
    }
}

struct Candidate {
    cue: MergeCue,
    attribute: String,
    side: Side,
}

/// Chooses the merge cue for matched element pairs
pub struct CueResolver {
    parent_cues: CueRegistry,
    child_cues: CueRegistry,
    cue_attribute: Option<String>,
    parameter_pattern: Regex,
    default_child_cue: MergeCue,
    default_parent_cue: MergeCue,
    default_order: Order,
    matcher: Box<dyn ElementMatcher>,
}

impl CueResolver {
    /// Build a resolver from configuration
    ///
    /// Fails with `UnresolvedCue` if any binding or default names an unknown
    /// cue, and with `Regex` if the parameter pattern does not compile.
    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        Ok(Self {
            parent_cues: CueRegistry::from_config(&config.parent_cues)?,
            child_cues: CueRegistry::from_config(&config.child_cues)?,
            cue_attribute: config.cue_attribute.clone(),
            parameter_pattern: Regex::new(&config.parameter_pattern)?,
            default_child_cue: named_cue("default-child-cue", &config.default_child_cue)?,
            default_parent_cue: named_cue("default-parent-cue", &config.default_parent_cue)?,
            default_order: config.default_order,
            matcher: Box::new(AttributeMatcher::new(config.id_attribute.clone())),
        })
    }

    /// Replace the element matcher
    pub fn with_matcher(mut self, matcher: impl ElementMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Replace the parent-side registry
    pub fn with_parent_cues(mut self, registry: CueRegistry) -> Self {
        self.parent_cues = registry;
        self
    }

    /// Replace the child-side registry
    pub fn with_child_cues(mut self, registry: CueRegistry) -> Self {
        self.child_cues = registry;
        self
    }

    pub fn matcher(&self) -> &dyn ElementMatcher {
        self.matcher.as_ref()
    }

    pub fn default_order(&self) -> Order {
        self.default_order
    }

    /// Resolve the cue for a matched pair
    pub fn resolve<'a>(
        &'a self,
        parent: &'a Element,
        child: &'a Element,
    ) -> Result<MergeCueContext<'a>> {
        let parent_candidate = self.candidate(parent, &self.parent_cues, Side::Parent)?;
        let child_candidate = self.candidate(child, &self.child_cues, Side::Child)?;

        let winner = match (parent_candidate, child_candidate) {
            (Some(p), Some(c)) => {
                if p.cue.priority() > c.cue.priority() {
                    Some(p)
                } else {
                    Some(c)
                }
            }
            (Some(p), None) => Some(p),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };

        let context = match winner {
            Some(candidate) => {
                let source = match candidate.side {
                    Side::Parent => parent,
                    Side::Child => child,
                };
                let mut params = self.parameters(source);
                if let Some(value) = source.attribute(&candidate.attribute) {
                    params.insert(candidate.attribute.clone(), value.to_string());
                }
                debug!(
                    "<{}>: {:?} cue {} selected by '{}'",
                    child.name(),
                    candidate.side,
                    candidate.cue.name(),
                    candidate.attribute
                );
                MergeCueContext::new(candidate.cue, parent, child, params, self)
            }
            None => {
                let cue = if child.has_content() {
                    self.default_child_cue
                } else {
                    self.default_parent_cue
                };
                debug!("<{}>: default cue {}", child.name(), cue.name());
                MergeCueContext::new(cue, parent, child, self.parameters(child), self)
            }
        };

        Ok(context)
    }

    /// Parameters carried by `element`: attributes matching the pattern
    pub fn parameters(&self, element: &Element) -> CueParams {
        element
            .attributes()
            .filter(|(name, _)| self.parameter_pattern.is_match(name))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Whether an attribute only steers merging and should not survive it
    pub fn is_control_attribute(&self, name: &str) -> bool {
        self.cue_attribute.as_deref() == Some(name)
            || self.parent_cues.attributes().any(|a| a == name)
            || self.child_cues.attributes().any(|a| a == name)
            || self.parameter_pattern.is_match(name)
    }

    /// `element` without the explicit cue attribute, at any depth
    pub fn without_cue_attribute(&self, element: &Element) -> Element {
        match self.cue_attribute.as_deref() {
            Some(cue_attribute) => element.without_attributes(&|name: &str| name == cue_attribute),
            None => element.clone(),
        }
    }

    fn candidate(
        &self,
        element: &Element,
        registry: &CueRegistry,
        side: Side,
    ) -> Result<Option<Candidate>> {
        let bound = registry.lookup(element).map(|binding| Candidate {
            cue: binding.cue(),
            attribute: binding.attribute().to_string(),
            side,
        });

        let explicit = match self
            .cue_attribute
            .as_deref()
            .and_then(|attribute| element.attribute(attribute).map(|value| (attribute, value)))
        {
            Some((attribute, value)) => Some(Candidate {
                cue: named_cue(attribute, value.trim())?,
                attribute: attribute.to_string(),
                side,
            }),
            None => None,
        };

        Ok(match (bound, explicit) {
            (Some(bound), Some(explicit)) => {
                if bound.cue.priority() > explicit.cue.priority() {
                    Some(bound)
                } else {
                    Some(explicit)
                }
            }
            (bound, explicit) => explicit.or(bound),
        })
    }
}

impl std::fmt::Debug for CueResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CueResolver")
            .field("parent_cues", &self.parent_cues)
            .field("child_cues", &self.child_cues)
            .field("cue_attribute", &self.cue_attribute)
            .field("default_order", &self.default_order)
            .finish_non_exhaustive()
    }
}

fn named_cue(attribute: &str, name: &str) -> Result<MergeCue> {
    MergeCue::from_name(name).ok_or_else(|| Error::UnresolvedCue {
        attribute: attribute.to_string(),
        cue: name.to_string(),
    })
}
