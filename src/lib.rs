//! # Descriptor Merge Library
//!
//! This library merges hierarchical descriptor documents and caches the
//! results. A descriptor is a small tree of named elements with attributes
//! and text that configures one content item. Descriptors stored higher up
//! a folder hierarchy act as ancestors of the ones below, and the effective
//! descriptor of an item is the merge of all of them.
//!
//! ## Quick Example
//!
//! ```
//! use descriptor_merge::config::MergeConfig;
//! use descriptor_merge::merge::DescriptorMerger;
//! use descriptor_merge::xml;
//!
//! let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();
//! let parent = xml::parse(r#"<item><title id="t">Base</title><size id="s">1</size></item>"#).unwrap();
//! let child = xml::parse(r#"<item><size id="s">2</size></item>"#).unwrap();
//!
//! let merged = merger.merge(&[parent, child]).unwrap();
//! assert_eq!(
//!     xml::to_string(&merged),
//!     r#"<item><title id="t">Base</title><size id="s">2</size></item>"#
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Trees (`tree`)**: Owned, immutable-by-convention element trees. Every
//!   merge builds a new tree, so inputs can be shared and cached.
//! - **Merge engine (`merge`)**: Matches elements of a parent and a child
//!   tree, picks a merge cue for each matched pair from its attributes, and
//!   applies it recursively.
//! - **Configuration (`config`)**: Which attributes select which cues, the
//!   fallback cues, and the cache scopes, loaded from YAML.
//! - **Stores and strategies (`store`, `strategy`)**: Where descriptor markup
//!   comes from and which descriptors contribute to a requested one.
//! - **Scoped cache (`cache`)**: A partitioned LRU cache with expiry, refresh
//!   and single-flight computation.
//! - **Service (`service`)**: Cached merged descriptors by url.
//!
//! ## Execution Flow
//!
//! 1.  **Strategy**: List the contributing descriptors for a url, most
//!     general first.
//! 2.  **Store**: Resolve them to documents, skipping missing optional ones.
//! 3.  **Merge**: Fold the documents into one, each over the result of the
//!     ones before it.
//! 4.  **Cache**: Keep the merged document under its url for later requests.

pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod service;
pub mod store;
pub mod strategy;
pub mod tree;
pub mod xml;

pub use error::{Error, Result};
