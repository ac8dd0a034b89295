//! # Configuration Schema and Parsing
//!
//! This module defines the configuration of the merge engine and the scoped
//! cache, and the logic for loading it from YAML.
//!
//! ## Key Components
//!
//! - **`Config`**: The top-level document with a `merge` and a `cache` section.
//!   Every field has a default, so an empty file is a valid configuration.
//!
//! - **`MergeConfig`**: Which attribute identifies matching elements, which
//!   attributes select which merge cue on the parent and on the child side,
//!   and the fallback cues used when no attribute applies.
//!
//! - **`CacheConfig`**: The cache partitions (scopes) with their capacities,
//!   the default expiry and refresh intervals in ticks, and which cache
//!   template variant callers get.
//!
//! ## Example
//!
//! ```
//! use descriptor_merge::config;
//!
//! let config = config::parse(r#"
//! merge:
//!   id-attribute: name
//!   default-order: before
//! cache:
//!   scopes:
//!     - name: descriptors
//!       capacity: 64
//! "#).unwrap();
//!
//! assert_eq!(config.merge.id_attribute, "name");
//! assert_eq!(config.cache.scopes[0].capacity, 64);
//! ```
//!
//! Cue names are checked when the resolver is built from the configuration,
//! not while parsing, so that a bad name is reported together with the
//! attribute that selects it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::merge::Order;

/// Name of the scope merged descriptors are cached in unless configured
pub const DEFAULT_SCOPE: &str = "descriptors";

/// Complete configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Merge engine settings
    pub merge: MergeConfig,
    /// Scoped cache settings
    pub cache: CacheConfig,
}

/// One attribute-to-cue binding in a cue registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueBindingConfig {
    /// Attribute whose presence selects the cue
    pub attribute: String,
    /// Cue name, e.g. `use-parent` or `merge-parent-and-child`
    pub cue: String,
    /// Priority override; the cue's default priority is used when omitted
    #[serde(default)]
    pub priority: Option<i32>,
}

impl CueBindingConfig {
    pub fn new(attribute: &str, cue: &str, priority: Option<i32>) -> Self {
        Self {
            attribute: attribute.to_string(),
            cue: cue.to_string(),
            priority,
        }
    }
}

/// Merge engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MergeConfig {
    /// Attribute identifying "the same logical node" across documents
    pub id_attribute: String,
    /// Cues selectable by an attribute on the parent (ancestor) element
    pub parent_cues: Vec<CueBindingConfig>,
    /// Cues selectable by an attribute on the child (descendant) element
    pub child_cues: Vec<CueBindingConfig>,
    /// Attribute whose value names a cue directly
    pub cue_attribute: Option<String>,
    /// Regex selecting sibling attributes passed to the cue as parameters
    pub parameter_pattern: String,
    /// Order used by `merge-parent-and-child` when no `order` is given
    pub default_order: Order,
    /// Fallback cue when no attribute applies and the child has content
    pub default_child_cue: String,
    /// Fallback cue when no attribute applies and the child has no content
    pub default_parent_cue: String,
    /// Cue applied to the document roots
    pub initial_cue: String,
    /// Remove cue-selecting and parameter attributes from merged output
    pub strip_cue_attributes: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            id_attribute: "id".to_string(),
            parent_cues: vec![CueBindingConfig::new(
                "disallow-override",
                "use-parent",
                Some(100),
            )],
            child_cues: vec![
                CueBindingConfig::new("merge-with-parent", "merge-parent-and-child", Some(10)),
                CueBindingConfig::new("override", "use-child", Some(10)),
                CueBindingConfig::new("use-parent-if-empty", "use-child-if-not-empty", Some(10)),
            ],
            cue_attribute: Some("merge-cue".to_string()),
            parameter_pattern: "^(order)$".to_string(),
            default_order: Order::After,
            default_child_cue: "use-child".to_string(),
            default_parent_cue: "use-parent".to_string(),
            initial_cue: "merge-parent-and-child".to_string(),
            strip_cue_attributes: true,
        }
    }
}

/// One cache partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Scope name
    pub name: String,
    /// Maximum number of resident entries
    pub capacity: usize,
}

/// Which cache template variant to hand to callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockingMode {
    /// Per-key locking: at most one computation in flight per key
    #[default]
    Locking,
    /// Double-checked but unlocked: duplicate computations are possible
    NonLocking,
    /// Bypass the cache entirely
    None,
}

/// Scoped cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Scopes registered at startup
    pub scopes: Vec<ScopeConfig>,
    /// Scope used for merged descriptors
    pub descriptor_scope: String,
    /// Default expiry in ticks (0 = never)
    pub ticks_to_expire: i64,
    /// Default refresh interval in ticks (0 = never)
    pub ticks_to_refresh: i64,
    /// Template variant
    pub locking: LockingMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            scopes: vec![ScopeConfig {
                name: DEFAULT_SCOPE.to_string(),
                capacity: 1000,
            }],
            descriptor_scope: DEFAULT_SCOPE.to_string(),
            ticks_to_expire: 0,
            ticks_to_refresh: 0,
            locking: LockingMode::Locking,
        }
    }
}

/// Parses a YAML string into a [`Config`].
///
/// An empty or whitespace-only document yields the default configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml_content)?)
}

/// Reads and parses a configuration file.
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}
