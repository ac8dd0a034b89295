//! End-to-end tests for the `stats` command.
//!
//! The command merges every url twice through the cache, so the second round
//! is served from it, and prints per-scope statistics as JSON.

mod common;
use common::prelude::*;

fn stats_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stats output should be JSON")
}

#[test]
fn test_stats_counts_hits_and_loads() {
    let fixture = TestFixture::new().with_descriptor_tree();

    let output = fixture
        .command()
        .arg("stats")
        .arg("--root")
        .arg(fixture.path())
        .args(["/a/b/item.xml", "/a/item.xml"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stats = stats_json(&output);
    let scope = &stats["descriptors"];
    assert_eq!(scope["size"], 2);
    assert_eq!(scope["hit_count"], 2);
    assert_eq!(scope["miss_count"], 2);
    assert_eq!(scope["load_success_count"], 2);
    assert_eq!(scope["eviction_count"], 0);
}

#[test]
fn test_stats_respects_scope_capacity() {
    let fixture = TestFixture::new()
        .with_descriptor_tree()
        .with_config(configs::SMALL_SCOPE);

    let output = fixture
        .command()
        .arg("stats")
        .arg("--root")
        .arg(fixture.path())
        .arg("--config")
        .arg(fixture.config_path())
        .args(["/item.xml", "/a/item.xml"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stats = stats_json(&output);
    assert_eq!(stats["descriptors"]["size"], 1);
    assert!(stats["descriptors"]["eviction_count"].as_u64().unwrap() >= 1);
}

#[test]
fn test_stats_reports_failed_urls() {
    let fixture = TestFixture::new().with_descriptor_tree();

    fixture
        .command()
        .arg("stats")
        .arg("--root")
        .arg(fixture.path())
        .args(["/item.xml", "/missing/item.xml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"descriptors\""))
        .stderr(predicate::str::contains("/missing/item.xml"));
}
