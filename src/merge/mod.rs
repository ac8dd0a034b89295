//! Descriptor merge engine
//!
//! This module merges an ordered list of descriptor documents into one. The
//! list runs from the least specific document (the repository root) to the
//! most specific one (next to the requested item). Each document is merged
//! over the accumulated result of the ones before it, so descendants can
//! override, inherit from, or extend their ancestors.
//!
//! ## Submodules
//!
//! - `matcher` - decides which elements of two trees are the same logical node
//! - `cue` - the merge rules (use parent, use child, merge both, ...)
//! - `resolver` - picks the cue for a matched pair from element attributes
//!
//! ## Example
//!
//! ```
//! use descriptor_merge::config::MergeConfig;
//! use descriptor_merge::merge::DescriptorMerger;
//! use descriptor_merge::xml;
//!
//! let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();
//! let parent = xml::parse(r#"<root><element id="2" disallow-override="true">b</element></root>"#).unwrap();
//! let child = xml::parse(r#"<root><element id="2">g</element></root>"#).unwrap();
//!
//! let merged = merger.merge(&[parent, child]).unwrap();
//! assert_eq!(xml::to_string(&merged), r#"<root><element id="2">b</element></root>"#);
//! ```

pub mod cue;
pub mod matcher;
pub mod resolver;

pub use cue::{CueKind, CueParams, MergeCue, Order};
pub use matcher::{AttributeMatcher, ElementMatcher};
pub use resolver::{CueBinding, CueRegistry, CueResolver, MergeCueContext};

use log::debug;

use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::tree::{Document, Element};

/// Merges ordered descriptor documents into one
#[derive(Debug)]
pub struct DescriptorMerger {
    resolver: CueResolver,
    initial_cue: MergeCue,
    strip_cue_attributes: bool,
}

impl DescriptorMerger {
    /// A merger applying `initial_cue` to the document roots
    pub fn new(resolver: CueResolver, initial_cue: MergeCue) -> Self {
        Self {
            resolver,
            initial_cue,
            strip_cue_attributes: true,
        }
    }

    /// Build the resolver and merger from configuration
    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        let resolver = CueResolver::from_config(config)?;
        let initial_cue = MergeCue::from_name(&config.initial_cue).ok_or_else(|| {
            Error::UnresolvedCue {
                attribute: "initial-cue".to_string(),
                cue: config.initial_cue.clone(),
            }
        })?;
        Ok(Self::new(resolver, initial_cue).strip_cue_attributes(config.strip_cue_attributes))
    }

    /// Builder: keep or remove control attributes in the final document
    pub fn strip_cue_attributes(mut self, strip: bool) -> Self {
        self.strip_cue_attributes = strip;
        self
    }

    pub fn resolver(&self) -> &CueResolver {
        &self.resolver
    }

    pub fn initial_cue(&self) -> MergeCue {
        self.initial_cue
    }

    /// Merge `documents`, least specific first
    ///
    /// Documents without a root are skipped; merging nothing yields an empty
    /// document. Any cue failure aborts the whole merge. An explicit cue
    /// attribute steers only the merge of the document that carries it and is
    /// dropped from intermediate results; other control attributes persist
    /// until the end.
    pub fn merge(&self, documents: &[Document]) -> Result<Document> {
        let mut roots = documents.iter().filter_map(Document::root);

        let Some(first) = roots.next() else {
            return Ok(Document::empty());
        };

        let mut accumulated = first.clone();
        let mut merged_count = 1;
        let mut roots = roots.peekable();
        while let Some(root) = roots.next() {
            accumulated = self.merge_roots(&accumulated, root)?;
            merged_count += 1;
            if roots.peek().is_some() {
                accumulated = self.resolver.without_cue_attribute(&accumulated);
            }
        }
        debug!(
            "merged {} descriptor(s) into <{}> ({} elements)",
            merged_count,
            accumulated.name(),
            accumulated.element_count()
        );

        if self.strip_cue_attributes {
            accumulated =
                accumulated.without_attributes(&|name: &str| self.resolver.is_control_attribute(name));
        }

        Ok(Document::new(accumulated))
    }

    /// Merge one child root over an accumulated parent root
    pub fn merge_roots(&self, parent: &Element, child: &Element) -> Result<Element> {
        let params = self.resolver.parameters(child);
        self.initial_cue
            .merge(parent, child, &params, &self.resolver)
    }
}
