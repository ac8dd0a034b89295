//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and descriptor trees to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_descriptor_tree();
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{configs, descriptors};
    pub use super::TestFixture;
}

/// Configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Matches elements on `name` instead of `id`.
    pub const MATCH_BY_NAME: &str = r#"
merge:
  id-attribute: name
"#;

    /// Children go before their parents unless told otherwise.
    pub const ORDER_BEFORE: &str = r#"
merge:
  default-order: before
"#;

    /// A small descriptor scope.
    pub const SMALL_SCOPE: &str = r#"
cache:
  scopes:
    - name: descriptors
      capacity: 1
"#;

    /// Names a cue that does not exist.
    pub const UNKNOWN_CUE: &str = r#"
merge:
  child-cues:
    - attribute: replace
      cue: use-somebody
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "merge: [unclosed";
}

/// Descriptor markup used across tests.
#[allow(dead_code)]
pub mod descriptors {
    /// Repository-wide defaults.
    pub const ROOT: &str = r#"<item><element id="1">a</element><element id="2" disallow-override="true">b</element><group id="4"><element id="5">e</element></group></item>"#;

    /// Folder-level overrides.
    pub const FOLDER: &str = r#"<item><element id="1">f</element><element id="2">g</element><group id="4" merge-with-parent="true" order="before"><element id="8">h</element></group></item>"#;

    /// The requested item.
    pub const LEAF: &str = r#"<item><element id="3">c</element></item>"#;

    /// Result of merging ROOT, FOLDER and LEAF with the default configuration.
    pub const MERGED: &str = r#"<item><element id="1">f</element><element id="2">b</element><group id="4"><element id="8">h</element><element id="5">e</element></group><element id="3">c</element></item>"#;
}

/// A test fixture that provides a temporary directory of descriptors.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_config(configs::ORDER_BEFORE)
///     .with_file("a/item.xml", "<item/>");
///
/// fixture
///     .command()
///     .args(["resolve", "--root"])
///     .arg(fixture.path())
///     .arg("/a/item.xml")
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `descriptor-merge.yaml` configuration file with the given content.
    #[allow(dead_code)]
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("descriptor-merge.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Lay out the three-level tree from [`descriptors`].
    #[allow(dead_code)]
    pub fn with_descriptor_tree(self) -> Self {
        self.with_file("item.xml", descriptors::ROOT)
            .with_file("a/item.xml", descriptors::FOLDER)
            .with_file("a/b/item.xml", descriptors::LEAF)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    #[allow(dead_code)]
    pub fn config_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("descriptor-merge.yaml")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's directory.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("descriptor-merge");
        cmd.current_dir(self.path());
        cmd.env_remove("DESCRIPTOR_MERGE_CONFIG");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_descriptor_tree() {
        let fixture = TestFixture::new().with_descriptor_tree();
        assert!(fixture.path().join("a/b/item.xml").exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        let configs = [
            configs::MATCH_BY_NAME,
            configs::ORDER_BEFORE,
            configs::SMALL_SCOPE,
            configs::UNKNOWN_CUE,
        ];

        for config in configs {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
