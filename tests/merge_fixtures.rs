//! Integration tests for the merge pipeline.
//!
//! These tests go through the public library API: a store holds descriptor
//! markup, a strategy picks the contributors, the merger folds them and the
//! service caches the result.

mod common;

use std::sync::Arc;

use common::descriptors;
use descriptor_merge::config::{self, Config, MergeConfig};
use descriptor_merge::merge::DescriptorMerger;
use descriptor_merge::service::{merge_descriptor, DescriptorService};
use descriptor_merge::store::{ContentStore, MemoryStore};
use descriptor_merge::strategy::{FolderPatternStrategy, InheritVersionsStrategy};
use descriptor_merge::{xml, Error};
use proptest::prelude::*;

fn tree_store() -> MemoryStore {
    MemoryStore::new()
        .with("/item.xml", descriptors::ROOT)
        .unwrap()
        .with("/a/item.xml", descriptors::FOLDER)
        .unwrap()
        .with("/a/b/item.xml", descriptors::LEAF)
        .unwrap()
}

fn merge_markup(config: &MergeConfig, markup: &[&str]) -> String {
    let merger = DescriptorMerger::from_config(config).unwrap();
    let documents: Vec<_> = markup.iter().map(|m| xml::parse(m).unwrap()).collect();
    xml::to_string(&merger.merge(&documents).unwrap())
}

#[test]
fn test_three_level_tree_through_service() {
    let service = DescriptorService::new(
        Arc::new(tree_store()),
        Arc::new(InheritVersionsStrategy::default()),
        &Config::default(),
    )
    .unwrap();

    let merged = service.merged("/a/b/item.xml").unwrap();
    assert_eq!(xml::to_string(&merged), descriptors::MERGED);
}

#[test]
fn test_missing_intermediate_descriptor_is_skipped() {
    let store = MemoryStore::new()
        .with("/item.xml", descriptors::ROOT)
        .unwrap()
        .with("/a/b/item.xml", descriptors::LEAF)
        .unwrap();
    let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();

    let merged = merge_descriptor(
        &store,
        &InheritVersionsStrategy::default(),
        &merger,
        "/a/b/item.xml",
    )
    .unwrap();
    assert_eq!(
        xml::to_string(&merged),
        r#"<item><element id="1">a</element><element id="2">b</element><group id="4"><element id="5">e</element></group><element id="3">c</element></item>"#
    );
}

#[test]
fn test_all_optional_with_nothing_present_is_empty() {
    let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();
    let merged = merge_descriptor(
        &MemoryStore::new(),
        &InheritVersionsStrategy::new(true),
        &merger,
        "/x/item.xml",
    )
    .unwrap();
    assert!(merged.is_empty());
    assert_eq!(xml::to_string(&merged), "");
}

#[test]
fn test_folder_pattern_strategy_merges_siblings() {
    let store: Arc<dyn ContentStore> = Arc::new(
        MemoryStore::new()
            .with("/base.xml", r#"<item><colour id="c">red</colour></item>"#)
            .unwrap()
            .with("/a/shape.xml", r#"<item><shape id="s">round</shape></item>"#)
            .unwrap()
            .with("/a/item.xml", r#"<item><colour id="c">blue</colour></item>"#)
            .unwrap(),
    );
    let strategy = FolderPatternStrategy::new(Arc::clone(&store), "*.xml").unwrap();
    let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();

    let merged = merge_descriptor(store.as_ref(), &strategy, &merger, "/a/item.xml").unwrap();
    assert_eq!(
        xml::to_string(&merged),
        r#"<item><shape id="s">round</shape><colour id="c">blue</colour></item>"#
    );
}

#[test]
fn test_emptiness_fallback() {
    let config = MergeConfig::default();
    let parent = r#"<item><entry id="1">parent text</entry></item>"#;

    assert_eq!(
        merge_markup(&config, &[parent, r#"<item><entry id="1"/></item>"#]),
        r#"<item><entry id="1">parent text</entry></item>"#
    );
    assert_eq!(
        merge_markup(&config, &[parent, r#"<item><entry id="1">child text</entry></item>"#]),
        r#"<item><entry id="1">child text</entry></item>"#
    );
}

#[test]
fn test_matching_attribute_from_config() {
    let config = config::parse(common::configs::MATCH_BY_NAME).unwrap();
    assert_eq!(
        merge_markup(
            &config.merge,
            &[
                r#"<item><entry name="x">1</entry></item>"#,
                r#"<item><entry name="x">2</entry></item>"#,
            ],
        ),
        r#"<item><entry name="x">2</entry></item>"#
    );
}

#[test]
fn test_default_order_from_config() {
    let config = config::parse(common::configs::ORDER_BEFORE).unwrap();
    assert_eq!(
        merge_markup(
            &config.merge,
            &[
                r#"<item><entry id="1">1</entry></item>"#,
                r#"<item><entry id="2">2</entry></item>"#,
            ],
        ),
        r#"<item><entry id="2">2</entry><entry id="1">1</entry></item>"#
    );
}

#[test]
fn test_unknown_cue_in_config_is_reported() {
    let config = config::parse(common::configs::UNKNOWN_CUE).unwrap();
    let err = DescriptorMerger::from_config(&config.merge).unwrap_err();
    assert!(matches!(err, Error::UnresolvedCue { ref cue, .. } if cue == "use-somebody"));
}

proptest! {
    #[test]
    fn prop_disjoint_children_are_all_kept(
        parent_ids in proptest::collection::btree_set(0u32..50, 0..8),
        child_ids in proptest::collection::btree_set(50u32..100, 0..8),
    ) {
        let render = |ids: &std::collections::BTreeSet<u32>| {
            let body: String = ids.iter().map(|id| format!(r#"<e id="{}"/>"#, id)).collect();
            format!("<item>{}</item>", body)
        };
        let merger = DescriptorMerger::from_config(&MergeConfig::default()).unwrap();
        let merged = merger
            .merge(&[
                xml::parse(&render(&parent_ids)).unwrap(),
                xml::parse(&render(&child_ids)).unwrap(),
            ])
            .unwrap();

        let root = merged.root().unwrap();
        let ids: Vec<u32> = root
            .child_elements()
            .map(|e| e.attribute("id").unwrap().parse().unwrap())
            .collect();
        let expected: Vec<u32> = parent_ids.iter().chain(child_ids.iter()).copied().collect();
        prop_assert_eq!(ids, expected);
    }
}
