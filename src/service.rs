//! Merged descriptor service
//!
//! Ties the pieces together for the common request: "give me the effective
//! descriptor at this url". The strategy lists the contributors, the store
//! resolves them, the merger folds them into one document and the cache
//! template keeps the result so repeated requests skip all of that.

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cache::{
    cache_key, CacheContext, CacheStatistics, CacheTemplate, ConfiguredTemplate, MemoryScopedCache,
    ScopedCache,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::merge::DescriptorMerger;
use crate::store::{normalize_url, resolve_documents, ContentStore};
use crate::strategy::DescriptorMergeStrategy;
use crate::tree::Document;

/// First key element of every cached merged descriptor
pub const MERGED_DESCRIPTOR_KEY: &str = "merged-descriptor";

/// Resolve and merge the contributors of `url` without caching
pub fn merge_descriptor(
    store: &dyn ContentStore,
    strategy: &dyn DescriptorMergeStrategy,
    merger: &DescriptorMerger,
    url: &str,
) -> Result<Document> {
    let descriptors = strategy.get_descriptors(url)?;
    let documents = resolve_documents(store, &descriptors)?;
    debug!(
        "merging {} of {} candidate descriptor(s) for {}",
        documents.len(),
        descriptors.len(),
        url
    );
    merger.merge(&documents)
}

/// Cached access to merged descriptors
pub struct DescriptorService {
    store: Arc<dyn ContentStore>,
    strategy: Arc<dyn DescriptorMergeStrategy>,
    merger: Arc<DescriptorMerger>,
    cache: Arc<dyn ScopedCache<Arc<Document>>>,
    template: ConfiguredTemplate<Arc<Document>>,
    scope: String,
}

impl DescriptorService {
    /// A service with an in-memory cache built from `config`
    pub fn new(
        store: Arc<dyn ContentStore>,
        strategy: Arc<dyn DescriptorMergeStrategy>,
        config: &Config,
    ) -> Result<Self> {
        let cache = Arc::new(MemoryScopedCache::<Arc<Document>>::from_config(&config.cache)?);
        Self::with_cache(store, strategy, config, cache)
    }

    /// A service over an existing cache
    ///
    /// The configured descriptor scope must already be registered.
    pub fn with_cache(
        store: Arc<dyn ContentStore>,
        strategy: Arc<dyn DescriptorMergeStrategy>,
        config: &Config,
        cache: Arc<dyn ScopedCache<Arc<Document>>>,
    ) -> Result<Self> {
        let scope = config.cache.descriptor_scope.clone();
        if !cache.has_scope(&scope) {
            return Err(Error::Configuration {
                message: format!("descriptor scope '{}' is not a registered cache scope", scope),
                hint: Some("add it under 'cache.scopes' or change 'cache.descriptor-scope'".to_string()),
            });
        }

        let merger = Arc::new(DescriptorMerger::from_config(&config.merge)?);
        let template = ConfiguredTemplate::from_config(Arc::clone(&cache), &config.cache);
        Ok(Self {
            store,
            strategy,
            merger,
            cache,
            template,
            scope,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn cache(&self) -> &Arc<dyn ScopedCache<Arc<Document>>> {
        &self.cache
    }

    pub fn merger(&self) -> &DescriptorMerger {
        &self.merger
    }

    /// The merged descriptor for `url`, computed at most once while cached
    pub fn merged(&self, url: &str) -> Result<Arc<Document>> {
        let url = normalize_url(url)?;
        let store = Arc::clone(&self.store);
        let strategy = Arc::clone(&self.strategy);
        let merger = Arc::clone(&self.merger);
        let target = url.clone();

        self.template.get_object(
            &CacheContext::new(self.scope.as_str()),
            None,
            move || {
                merge_descriptor(store.as_ref(), strategy.as_ref(), &merger, &target).map(Arc::new)
            },
            &[MERGED_DESCRIPTOR_KEY, url.as_str()],
        )
    }

    /// Compute many merged descriptors in parallel
    ///
    /// Results come back in the order of `urls`; one failing url does not
    /// stop the others.
    pub fn warm(&self, urls: &[String]) -> Vec<(String, Result<Arc<Document>>)> {
        let results: Vec<(String, Result<Arc<Document>>)> = urls
            .par_iter()
            .map(|url| (url.clone(), self.merged(url)))
            .collect();

        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        if failed > 0 {
            warn!("{} of {} descriptor(s) failed to merge", failed, results.len());
        }
        info!("warmed {} descriptor(s) in scope '{}'", results.len() - failed, self.scope);
        results
    }

    /// Drop the cached merge of `url`; `false` when none was cached
    pub fn invalidate(&self, url: &str) -> Result<bool> {
        let url = normalize_url(url)?;
        let key = cache_key(&[MERGED_DESCRIPTOR_KEY, url.as_str()])?;
        self.cache.remove(&self.scope, &key)
    }

    /// Statistics of every registered scope, by scope name
    pub fn statistics(&self) -> Result<Vec<(String, CacheStatistics)>> {
        self.cache
            .scope_names()?
            .into_iter()
            .map(|name| {
                let stats = self.cache.statistics(&name)?;
                Ok((name, stats))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockingMode;
    use crate::store::MemoryStore;
    use crate::strategy::InheritVersionsStrategy;
    use crate::xml;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with(
                "/item.xml",
                r#"<item><element id="2" disallow-override="true">b</element><element id="3">c</element></item>"#,
            )
            .unwrap()
            .with(
                "/a/item.xml",
                r#"<item><element id="2">g</element><element id="3">h</element></item>"#,
            )
            .unwrap()
    }

    fn service(config: &Config) -> DescriptorService {
        DescriptorService::new(
            Arc::new(store()),
            Arc::new(InheritVersionsStrategy::default()),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_merge_descriptor_uncached() {
        let merger = DescriptorMerger::from_config(&Config::default().merge).unwrap();
        let merged = merge_descriptor(
            &store(),
            &InheritVersionsStrategy::default(),
            &merger,
            "/a/item.xml",
        )
        .unwrap();
        assert_eq!(
            xml::to_string(&merged),
            r#"<item><element id="2">b</element><element id="3">h</element></item>"#
        );
    }

    #[test]
    fn test_merged_is_cached() {
        let service = service(&Config::default());
        let first = service.merged("/a/item.xml").unwrap();
        let second = service.merged("a/item.xml").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = service.cache().statistics(service.scope()).unwrap();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.load_success_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_missing_required_descriptor() {
        let service = service(&Config::default());
        let err = service.merged("/b/item.xml").unwrap_err();
        assert!(matches!(err, Error::DescriptorNotFound { url } if url == "/b/item.xml"));
        assert_eq!(service.cache().size(service.scope()).unwrap(), 0);
    }

    #[test]
    fn test_invalidate() {
        let service = service(&Config::default());
        service.merged("/a/item.xml").unwrap();
        assert!(service.invalidate("/a/item.xml").unwrap());
        assert!(!service.invalidate("/a/item.xml").unwrap());
        assert_eq!(service.cache().size(service.scope()).unwrap(), 0);
    }

    #[test]
    fn test_warm_keeps_order_and_reports_failures() {
        let service = service(&Config::default());
        let urls = vec![
            "/a/item.xml".to_string(),
            "/missing.xml".to_string(),
            "/item.xml".to_string(),
        ];
        let results = service.warm(&urls);

        let names: Vec<&str> = results.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(names, vec!["/a/item.xml", "/missing.xml", "/item.xml"]);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
        assert_eq!(service.cache().size(service.scope()).unwrap(), 2);
    }

    #[test]
    fn test_unregistered_descriptor_scope() {
        let mut config = Config::default();
        config.cache.descriptor_scope = "elsewhere".to_string();
        let result = DescriptorService::new(
            Arc::new(store()),
            Arc::new(InheritVersionsStrategy::default()),
            &config,
        );
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_no_cache_mode_recomputes() {
        let mut config = Config::default();
        config.cache.locking = LockingMode::None;
        let service = service(&config);
        let first = service.merged("/a/item.xml").unwrap();
        let second = service.merged("/a/item.xml").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(service.cache().size(service.scope()).unwrap(), 0);
    }

    #[test]
    fn test_statistics_lists_scopes() {
        let service = service(&Config::default());
        service.merged("/item.xml").unwrap();
        let stats = service.statistics().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].0, crate::config::DEFAULT_SCOPE);
        assert_eq!(stats[0].1.size, 1);
    }
}
