//! Merge strategies: which descriptors contribute to a merged descriptor
//!
//! A strategy turns one requested url into an ordered list of contributors,
//! most general first. The requested descriptor itself always comes last, so
//! it has the final say in the merge.
//!
//! ## Strategies
//!
//! - [`InheritVersionsStrategy`] walks the url path from the store root down:
//!   for `/a/b/item.xml` it yields `/item.xml`, `/a/item.xml` and
//!   `/a/b/item.xml`.
//! - [`FolderPatternStrategy`] collects every descriptor matching a file name
//!   pattern in each ancestor folder, then the requested descriptor.

use std::sync::Arc;

use glob::Pattern;
use log::trace;

use crate::error::Result;
use crate::store::{file_name, join_url, normalize_url, parent_folder, ContentStore};

/// One contributor to a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeableDescriptor {
    pub url: String,
    /// Skipped silently when missing from the store
    pub optional: bool,
}

impl MergeableDescriptor {
    pub fn new(url: impl Into<String>, optional: bool) -> Self {
        Self {
            url: url.into(),
            optional,
        }
    }

    pub fn optional(url: impl Into<String>) -> Self {
        Self::new(url, true)
    }

    pub fn required(url: impl Into<String>) -> Self {
        Self::new(url, false)
    }
}

/// Produces the ordered contributors for a requested descriptor
pub trait DescriptorMergeStrategy: Send + Sync {
    fn get_descriptors(&self, url: &str) -> Result<Vec<MergeableDescriptor>>;
}

/// Folders from the root down to the folder holding `url`
fn ancestor_folders(url: &str) -> Vec<String> {
    let mut folders = vec!["/".to_string()];
    let parent = parent_folder(url);
    let mut current = String::new();
    for segment in parent.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        folders.push(current.clone());
    }
    folders
}

/// Inherit a descriptor of the same name from every ancestor folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InheritVersionsStrategy {
    /// Also treat the requested descriptor as optional
    pub all_optional: bool,
}

impl InheritVersionsStrategy {
    pub fn new(all_optional: bool) -> Self {
        Self { all_optional }
    }
}

impl DescriptorMergeStrategy for InheritVersionsStrategy {
    fn get_descriptors(&self, url: &str) -> Result<Vec<MergeableDescriptor>> {
        let url = normalize_url(url)?;
        let name = file_name(&url);
        let folders = ancestor_folders(&url);
        let last = folders.len() - 1;

        let descriptors: Vec<MergeableDescriptor> = folders
            .iter()
            .enumerate()
            .map(|(index, folder)| {
                let optional = self.all_optional || index != last;
                MergeableDescriptor::new(join_url(folder, name), optional)
            })
            .collect();
        trace!("inherit strategy for {}: {:?}", url, descriptors);
        Ok(descriptors)
    }
}

/// Merge every descriptor matching a file name pattern along the path
pub struct FolderPatternStrategy {
    store: Arc<dyn ContentStore>,
    pattern: Pattern,
}

impl FolderPatternStrategy {
    pub fn new(store: Arc<dyn ContentStore>, pattern: &str) -> Result<Self> {
        Ok(Self {
            store,
            pattern: Pattern::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl DescriptorMergeStrategy for FolderPatternStrategy {
    fn get_descriptors(&self, url: &str) -> Result<Vec<MergeableDescriptor>> {
        let url = normalize_url(url)?;
        let mut descriptors = Vec::new();

        for folder in ancestor_folders(&url) {
            for sibling in self.store.list_sibling_urls(&folder)? {
                if sibling != url && self.pattern.matches(file_name(&sibling)) {
                    descriptors.push(MergeableDescriptor::optional(sibling));
                }
            }
        }
        descriptors.push(MergeableDescriptor::required(url.as_str()));
        trace!("folder strategy for {}: {:?}", url, descriptors);
        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;

    fn urls(descriptors: &[MergeableDescriptor]) -> Vec<(&str, bool)> {
        descriptors
            .iter()
            .map(|d| (d.url.as_str(), d.optional))
            .collect()
    }

    #[test]
    fn test_ancestor_folders() {
        assert_eq!(ancestor_folders("/item.xml"), vec!["/"]);
        assert_eq!(ancestor_folders("/a/b/item.xml"), vec!["/", "/a", "/a/b"]);
    }

    #[test]
    fn test_inherit_versions_walks_down_the_path() {
        let descriptors = InheritVersionsStrategy::default()
            .get_descriptors("/a/b/item.xml")
            .unwrap();
        assert_eq!(
            urls(&descriptors),
            vec![
                ("/item.xml", true),
                ("/a/item.xml", true),
                ("/a/b/item.xml", false),
            ]
        );
    }

    #[test]
    fn test_inherit_versions_all_optional() {
        let descriptors = InheritVersionsStrategy::new(true)
            .get_descriptors("a/item.xml")
            .unwrap();
        assert!(descriptors.iter().all(|d| d.optional));
        assert_eq!(descriptors.len(), 2);
    }

    #[test]
    fn test_inherit_versions_at_root() {
        let descriptors = InheritVersionsStrategy::default()
            .get_descriptors("/item.xml")
            .unwrap();
        assert_eq!(urls(&descriptors), vec![("/item.xml", false)]);
    }

    #[test]
    fn test_folder_pattern_collects_matches() {
        let store = MemoryStore::new()
            .with("/defaults.xml", "<d/>")
            .unwrap()
            .with("/readme.txt", "<r/>")
            .unwrap()
            .with("/a/b-defaults.xml", "<d/>")
            .unwrap()
            .with("/a/a-defaults.xml", "<d/>")
            .unwrap()
            .with("/a/item.xml", "<i/>")
            .unwrap()
            .with("/other/defaults.xml", "<d/>")
            .unwrap();
        let strategy = FolderPatternStrategy::new(Arc::new(store), "*.xml").unwrap();
        assert_eq!(strategy.pattern(), "*.xml");

        let descriptors = strategy.get_descriptors("/a/item.xml").unwrap();
        assert_eq!(
            urls(&descriptors),
            vec![
                ("/defaults.xml", true),
                ("/a/a-defaults.xml", true),
                ("/a/b-defaults.xml", true),
                ("/a/item.xml", false),
            ]
        );
    }

    #[test]
    fn test_folder_pattern_rejects_bad_glob() {
        let result = FolderPatternStrategy::new(Arc::new(MemoryStore::new()), "[");
        assert!(matches!(result, Err(Error::Glob(_))));
    }
}
