//! # Cache Templates
//!
//! Compute-on-miss over a [`ScopedCache`]. A caller names a scope, hands over
//! a compute callback and the elements that identify the value; the template
//! returns the cached value or computes, stores and returns a fresh one.
//!
//! Three flavours share one signature:
//!
//! - [`LockingCacheTemplate`] takes a per-key lock on a miss, so concurrent
//!   callers for the same key wait for one computation.
//! - [`NonLockingCacheTemplate`] never blocks; concurrent misses may compute
//!   the same value twice and the last store wins.
//! - [`NoCacheTemplate`] always computes.
//!
//! ## Failure policy
//!
//! Cache faults ([`Error::is_cache_fault`]) never fail a request: a failed
//! read is treated as a miss and a failed write still returns the computed
//! value. Every other error, including an unknown scope or a compute failure,
//! reaches the caller. A failed computation is never cached.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use super::item::{ItemOptions, Loader};
use super::locks::KeyLocks;
use super::ScopedCache;
use crate::config::{CacheConfig, LockingMode};
use crate::error::{Error, Result};

/// Build a cache key from its elements
///
/// Elements are encoded as a JSON array, so `["a,b"]` and `["a", "b"]` never
/// collide and equal element lists always give equal keys.
pub fn cache_key(elements: &[&str]) -> Result<String> {
    serde_json::to_string(elements).map_err(|err| Error::Serialization {
        message: format!("cannot encode cache key: {}", err),
    })
}

/// Which partition a lookup goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheContext {
    pub scope: String,
}

impl CacheContext {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }
}

/// Per-call overrides of the template's expiry and refresh defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachingOptions {
    pub ticks_to_expire: Option<i64>,
    pub ticks_to_refresh: Option<i64>,
}

/// Compute-on-miss access to a scoped cache
pub trait CacheTemplate<V> {
    /// Return the value cached under `key_elements`, computing it on a miss
    fn get_object<F>(
        &self,
        context: &CacheContext,
        options: Option<&CachingOptions>,
        compute: F,
        key_elements: &[&str],
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static;
}

/// Store access shared by the caching templates
struct Backing<V> {
    cache: Arc<dyn ScopedCache<V>>,
    ticks_to_expire: i64,
    ticks_to_refresh: i64,
}

impl<V> Backing<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn lookup(&self, scope: &str, key: &str) -> Result<Option<V>> {
        match self.cache.get(scope, key) {
            Ok(found) => Ok(found.map(|item| item.into_value())),
            Err(err) if err.is_cache_fault() => {
                warn!("cache read of '{}' in scope '{}' failed, treating as miss: {}", key, scope, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Look up again after the first lookup missed
    ///
    /// Presence is checked without touching the statistics, so a key that is
    /// still missing counts as one miss in total; a key stored meanwhile is
    /// read and counts as a hit.
    fn recheck(&self, scope: &str, key: &str) -> Result<Option<V>> {
        match self.cache.has_key(scope, key) {
            Ok(true) => self.lookup(scope, key),
            Ok(false) => Ok(None),
            Err(err) if err.is_cache_fault() => {
                warn!("cache check of '{}' in scope '{}' failed, treating as miss: {}", key, scope, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Run the computation, account for it and store the result
    fn compute_and_store<F>(
        &self,
        scope: &str,
        key: &str,
        options: Option<&CachingOptions>,
        compute: F,
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        let started = Instant::now();
        let outcome = compute();
        let elapsed = started.elapsed();

        if let Err(err) = self.cache.record_load(scope, elapsed, outcome.is_ok()) {
            warn!("could not record load for scope '{}': {}", scope, err);
        }
        let value = outcome?;
        debug!("computed '{}' in scope '{}' in {:?}", key, scope, elapsed);

        let compute = Arc::new(compute);
        let loader: Loader<V> = Arc::new(move |_: &[String]| compute());
        let item_options = ItemOptions {
            ticks_to_expire: options
                .and_then(|o| o.ticks_to_expire)
                .unwrap_or(self.ticks_to_expire),
            ticks_to_refresh: options
                .and_then(|o| o.ticks_to_refresh)
                .unwrap_or(self.ticks_to_refresh),
            loader: Some(loader),
            loader_params: Vec::new(),
        };

        match self.cache.put_with(scope, key, value.clone(), item_options) {
            Ok(()) => {}
            Err(err) if err.is_cache_fault() => {
                warn!("cache write of '{}' in scope '{}' failed, value not cached: {}", key, scope, err);
            }
            Err(err) => return Err(err),
        }
        Ok(value)
    }
}

/// Single-flight template: one computation per key at a time
pub struct LockingCacheTemplate<V> {
    backing: Backing<V>,
    locks: KeyLocks,
}

impl<V> LockingCacheTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A template whose entries never expire and are never refreshed
    pub fn new(cache: Arc<dyn ScopedCache<V>>) -> Self {
        Self::with_defaults(cache, 0, 0)
    }

    pub fn with_defaults(cache: Arc<dyn ScopedCache<V>>, ticks_to_expire: i64, ticks_to_refresh: i64) -> Self {
        Self {
            backing: Backing {
                cache,
                ticks_to_expire,
                ticks_to_refresh,
            },
            locks: KeyLocks::new(),
        }
    }

    pub fn cache(&self) -> &Arc<dyn ScopedCache<V>> {
        &self.backing.cache
    }

    /// Keys with a computation in progress or waiting for one
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl<V> CacheTemplate<V> for LockingCacheTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get_object<F>(
        &self,
        context: &CacheContext,
        options: Option<&CachingOptions>,
        compute: F,
        key_elements: &[&str],
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        let scope = context.scope.as_str();
        let key = cache_key(key_elements)?;

        if let Some(value) = self.backing.lookup(scope, &key)? {
            return Ok(value);
        }

        let _guard = self.locks.acquire(scope, &key)?;
        if let Some(value) = self.backing.recheck(scope, &key)? {
            debug!("'{}' in scope '{}' was computed while waiting", key, scope);
            return Ok(value);
        }
        self.backing.compute_and_store(scope, &key, options, compute)
    }
}

/// Template that never blocks; concurrent misses may compute twice
pub struct NonLockingCacheTemplate<V> {
    backing: Backing<V>,
}

impl<V> NonLockingCacheTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<dyn ScopedCache<V>>) -> Self {
        Self::with_defaults(cache, 0, 0)
    }

    pub fn with_defaults(cache: Arc<dyn ScopedCache<V>>, ticks_to_expire: i64, ticks_to_refresh: i64) -> Self {
        Self {
            backing: Backing {
                cache,
                ticks_to_expire,
                ticks_to_refresh,
            },
        }
    }

    pub fn cache(&self) -> &Arc<dyn ScopedCache<V>> {
        &self.backing.cache
    }
}

impl<V> CacheTemplate<V> for NonLockingCacheTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get_object<F>(
        &self,
        context: &CacheContext,
        options: Option<&CachingOptions>,
        compute: F,
        key_elements: &[&str],
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        let scope = context.scope.as_str();
        let key = cache_key(key_elements)?;

        if let Some(value) = self.backing.lookup(scope, &key)? {
            return Ok(value);
        }
        // Another caller may have stored it since the first lookup.
        if let Some(value) = self.backing.recheck(scope, &key)? {
            return Ok(value);
        }
        self.backing.compute_and_store(scope, &key, options, compute)
    }
}

/// Template that bypasses the cache entirely
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCacheTemplate;

impl<V> CacheTemplate<V> for NoCacheTemplate {
    fn get_object<F>(
        &self,
        _context: &CacheContext,
        _options: Option<&CachingOptions>,
        compute: F,
        _key_elements: &[&str],
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        compute()
    }
}

/// The template variant selected by configuration
pub enum ConfiguredTemplate<V> {
    Locking(LockingCacheTemplate<V>),
    NonLocking(NonLockingCacheTemplate<V>),
    None(NoCacheTemplate),
}

impl<V> ConfiguredTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn from_config(cache: Arc<dyn ScopedCache<V>>, config: &CacheConfig) -> Self {
        let (expire, refresh) = (config.ticks_to_expire, config.ticks_to_refresh);
        match config.locking {
            LockingMode::Locking => {
                Self::Locking(LockingCacheTemplate::with_defaults(cache, expire, refresh))
            }
            LockingMode::NonLocking => {
                Self::NonLocking(NonLockingCacheTemplate::with_defaults(cache, expire, refresh))
            }
            LockingMode::None => Self::None(NoCacheTemplate),
        }
    }

    /// The store behind the template, if it caches at all
    pub fn cache(&self) -> Option<&Arc<dyn ScopedCache<V>>> {
        match self {
            Self::Locking(template) => Some(template.cache()),
            Self::NonLocking(template) => Some(template.cache()),
            Self::None(_) => None,
        }
    }
}

impl<V> CacheTemplate<V> for ConfiguredTemplate<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get_object<F>(
        &self,
        context: &CacheContext,
        options: Option<&CachingOptions>,
        compute: F,
        key_elements: &[&str],
    ) -> Result<V>
    where
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        match self {
            Self::Locking(template) => template.get_object(context, options, compute, key_elements),
            Self::NonLocking(template) => template.get_object(context, options, compute, key_elements),
            Self::None(template) => template.get_object(context, options, compute, key_elements),
        }
    }
}
