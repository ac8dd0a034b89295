//! Content stores that hold raw descriptor markup
//!
//! Descriptors are addressed by slash-separated urls rooted at `/`, such as
//! `/products/widgets/item.xml`. A store resolves a url to a parsed
//! [`Document`] and lists the descriptors that live in one folder.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::strategy::MergeableDescriptor;
use crate::tree::Document;
use crate::xml;

/// Source of descriptor documents
pub trait ContentStore: Send + Sync {
    /// Fetch and parse the descriptor at `url`; `None` when it does not exist
    fn resolve(&self, url: &str) -> Result<Option<Document>>;

    /// Urls of the descriptors directly inside `folder_url`, sorted
    fn list_sibling_urls(&self, folder_url: &str) -> Result<Vec<String>>;
}

/// Canonical form of a url: leading slash, no empty or `.` segments, no
/// trailing slash
///
/// `..` segments are rejected so a url can never leave the store root.
pub fn normalize_url(url: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in url.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(Error::Configuration {
                    message: format!("descriptor url '{}' escapes the store root", url),
                    hint: Some("remove '..' segments from the url".to_string()),
                })
            }
            other => segments.push(other),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Folder part of a normalized url; the root is its own parent
pub fn parent_folder(url: &str) -> &str {
    match url.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &url[..index],
    }
}

/// Last segment of a url
pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Append a name to a folder url
pub fn join_url(folder: &str, name: &str) -> String {
    if folder.ends_with('/') {
        format!("{}{}", folder, name)
    } else {
        format!("{}/{}", folder, name)
    }
}

/// In-memory store of url -> markup
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    descriptors: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the markup stored at `url`
    pub fn insert(&mut self, url: &str, markup: impl Into<String>) -> Result<()> {
        self.descriptors.insert(normalize_url(url)?, markup.into());
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, url: &str, markup: impl Into<String>) -> Result<Self> {
        self.insert(url, markup)?;
        Ok(self)
    }

    pub fn remove(&mut self, url: &str) -> Result<Option<String>> {
        Ok(self.descriptors.remove(&normalize_url(url)?))
    }

    pub fn contains(&self, url: &str) -> bool {
        normalize_url(url)
            .map(|url| self.descriptors.contains_key(&url))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn resolve(&self, url: &str) -> Result<Option<Document>> {
        let url = normalize_url(url)?;
        self.descriptors
            .get(&url)
            .map(|markup| xml::parse(markup))
            .transpose()
    }

    fn list_sibling_urls(&self, folder_url: &str) -> Result<Vec<String>> {
        let folder = normalize_url(folder_url)?;
        let mut urls: Vec<String> = self
            .descriptors
            .keys()
            .filter(|url| parent_folder(url) == folder)
            .cloned()
            .collect();
        urls.sort();
        Ok(urls)
    }
}

/// Store reading descriptor files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, url: &str) -> Result<PathBuf> {
        let url = normalize_url(url)?;
        Ok(self.root.join(url.trim_start_matches('/')))
    }
}

impl ContentStore for DirectoryStore {
    fn resolve(&self, url: &str) -> Result<Option<Document>> {
        let path = self.path_of(url)?;
        if !path.is_file() {
            trace!("no descriptor at {}", path.display());
            return Ok(None);
        }
        let markup = fs::read_to_string(&path)?;
        debug!("read descriptor {} ({} bytes)", path.display(), markup.len());
        xml::parse(&markup)
            .map(Some)
            .map_err(|err| match err {
                Error::XmlParse { message } => Error::XmlParse {
                    message: format!("{}: {}", path.display(), message),
                },
                other => other,
            })
    }

    fn list_sibling_urls(&self, folder_url: &str) -> Result<Vec<String>> {
        let folder = normalize_url(folder_url)?;
        let dir = self.path_of(&folder)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut urls = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Some(name) = entry.file_name().to_str() {
                urls.push(join_url(&folder, name));
            }
        }
        Ok(urls)
    }
}

/// Resolve a descriptor list to documents, in order
///
/// Missing optional descriptors are skipped. A missing required descriptor
/// fails with [`Error::DescriptorNotFound`].
pub fn resolve_documents(
    store: &dyn ContentStore,
    descriptors: &[MergeableDescriptor],
) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        match store.resolve(&descriptor.url)? {
            Some(document) => documents.push(document),
            None if descriptor.optional => {
                trace!("skipping missing optional descriptor {}", descriptor.url);
            }
            None => {
                return Err(Error::DescriptorNotFound {
                    url: descriptor.url.clone(),
                })
            }
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("a/b/item.xml").unwrap(), "/a/b/item.xml");
        assert_eq!(normalize_url("//a/./b/").unwrap(), "/a/b");
        assert_eq!(normalize_url("").unwrap(), "/");
        assert!(matches!(
            normalize_url("/a/../../etc"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_url_parts() {
        assert_eq!(parent_folder("/a/b/item.xml"), "/a/b");
        assert_eq!(parent_folder("/item.xml"), "/");
        assert_eq!(parent_folder("/"), "/");
        assert_eq!(file_name("/a/b/item.xml"), "item.xml");
        assert_eq!(join_url("/", "item.xml"), "/item.xml");
        assert_eq!(join_url("/a", "item.xml"), "/a/item.xml");
    }

    #[test]
    fn test_memory_store_resolve() {
        let store = MemoryStore::new()
            .with("/a/item.xml", "<item>1</item>")
            .unwrap();
        let document = store.resolve("a/item.xml").unwrap().unwrap();
        assert_eq!(document.root().unwrap().name(), "item");
        assert!(store.resolve("/a/other.xml").unwrap().is_none());
        assert!(store.contains("/a/item.xml"));
    }

    #[test]
    fn test_memory_store_resolve_reports_bad_markup() {
        let store = MemoryStore::new().with("/bad.xml", "<item>").unwrap();
        assert!(matches!(store.resolve("/bad.xml"), Err(Error::XmlParse { .. })));
    }

    #[test]
    fn test_memory_store_lists_direct_children_only() {
        let store = MemoryStore::new()
            .with("/a/z.xml", "<z/>")
            .unwrap()
            .with("/a/b.xml", "<b/>")
            .unwrap()
            .with("/a/deeper/c.xml", "<c/>")
            .unwrap()
            .with("/root.xml", "<r/>")
            .unwrap();
        assert_eq!(
            store.list_sibling_urls("/a").unwrap(),
            vec!["/a/b.xml", "/a/z.xml"]
        );
        assert_eq!(store.list_sibling_urls("/").unwrap(), vec!["/root.xml"]);
    }

    #[test]
    fn test_directory_store() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/nested")).unwrap();
        fs::write(temp.path().join("a/item.xml"), "<item id=\"1\"/>").unwrap();
        fs::write(temp.path().join("a/base.xml"), "<base/>").unwrap();
        fs::write(temp.path().join("a/nested/deep.xml"), "<deep/>").unwrap();

        let store = DirectoryStore::new(temp.path());
        let document = store.resolve("/a/item.xml").unwrap().unwrap();
        assert_eq!(document.root().unwrap().attribute("id"), Some("1"));
        assert!(store.resolve("/a/missing.xml").unwrap().is_none());
        assert!(store.resolve("/a/nested").unwrap().is_none());

        assert_eq!(
            store.list_sibling_urls("/a").unwrap(),
            vec!["/a/base.xml", "/a/item.xml"]
        );
        assert!(store.list_sibling_urls("/missing").unwrap().is_empty());
    }

    #[test]
    fn test_directory_store_names_file_in_parse_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.xml"), "<a><b></a>").unwrap();
        let err = DirectoryStore::new(temp.path())
            .resolve("/broken.xml")
            .unwrap_err();
        assert!(err.to_string().contains("broken.xml"));
    }

    #[test]
    fn test_resolve_documents_skips_missing_optional() {
        let store = MemoryStore::new()
            .with("/a/item.xml", "<item/>")
            .unwrap();
        let descriptors = vec![
            MergeableDescriptor::optional("/item.xml"),
            MergeableDescriptor::required("/a/item.xml"),
        ];
        let documents = resolve_documents(&store, &descriptors).unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn test_resolve_documents_requires_required() {
        let store = MemoryStore::new();
        let err = resolve_documents(&store, &[MergeableDescriptor::required("/a.xml")]).unwrap_err();
        assert!(matches!(err, Error::DescriptorNotFound { url } if url == "/a.xml"));
    }
}
