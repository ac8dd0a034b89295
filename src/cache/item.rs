//! Cache entries and their expiry/refresh metadata

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Recomputes a cached value; receives the entry's loader parameters
pub type Loader<V> = Arc<dyn Fn(&[String]) -> Result<V> + Send + Sync>;

/// Expiry, refresh and loader settings for an extended `put`
pub struct ItemOptions<V> {
    /// Ticks until the entry expires (0 = never)
    pub ticks_to_expire: i64,
    /// Ticks until the entry is recomputed by its loader (0 = never)
    pub ticks_to_refresh: i64,
    /// Callback used to refresh the entry
    pub loader: Option<Loader<V>>,
    /// Parameters handed to the loader
    pub loader_params: Vec<String>,
}

impl<V> Default for ItemOptions<V> {
    fn default() -> Self {
        Self {
            ticks_to_expire: 0,
            ticks_to_refresh: 0,
            loader: None,
            loader_params: Vec::new(),
        }
    }
}

impl<V> Clone for ItemOptions<V> {
    fn clone(&self) -> Self {
        Self {
            ticks_to_expire: self.ticks_to_expire,
            ticks_to_refresh: self.ticks_to_refresh,
            loader: self.loader.clone(),
            loader_params: self.loader_params.clone(),
        }
    }
}

impl<V> fmt::Debug for ItemOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemOptions")
            .field("ticks_to_expire", &self.ticks_to_expire)
            .field("ticks_to_refresh", &self.ticks_to_refresh)
            .field("loader", &self.loader.is_some())
            .field("loader_params", &self.loader_params)
            .finish()
    }
}

/// A cached value with its metadata
///
/// Items are only ever stored fully built; readers see either no item or a
/// complete one.
pub struct CacheItem<V> {
    scope: String,
    key: String,
    value: V,
    created_at: i64,
    options: ItemOptions<V>,
    stamp: u64,
}

impl<V> CacheItem<V> {
    pub fn new(
        scope: impl Into<String>,
        key: impl Into<String>,
        value: V,
        created_at: i64,
        options: ItemOptions<V>,
    ) -> Self {
        Self {
            scope: scope.into(),
            key: key.into(),
            value,
            created_at,
            options,
            stamp: 0,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn ticks_to_expire(&self) -> i64 {
        self.options.ticks_to_expire
    }

    pub fn ticks_to_refresh(&self) -> i64 {
        self.options.ticks_to_refresh
    }

    pub fn has_loader(&self) -> bool {
        self.options.loader.is_some()
    }

    pub fn loader_params(&self) -> &[String] {
        &self.options.loader_params
    }

    /// Store-assigned insertion stamp; distinguishes two entries under one key
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    pub(crate) fn set_stamp(&mut self, stamp: u64) {
        self.stamp = stamp;
    }

    /// `ticks_to_expire != 0 && now - created_at >= ticks_to_expire`
    pub fn is_expired(&self, now: i64) -> bool {
        let ttl = self.options.ticks_to_expire;
        ttl != 0 && now - self.created_at >= ttl
    }

    /// `ticks_to_refresh != 0 && now - created_at >= ticks_to_refresh`
    pub fn needs_refresh(&self, now: i64) -> bool {
        let interval = self.options.ticks_to_refresh;
        interval != 0 && now - self.created_at >= interval
    }

    /// Run the loader to compute a fresh value
    ///
    /// An item with a refresh interval but no loader is misconfigured; that
    /// only surfaces here, when a refresh is due.
    pub fn load(&self) -> Result<V> {
        match &self.options.loader {
            Some(loader) => loader(&self.options.loader_params),
            None => Err(Error::Configuration {
                message: format!(
                    "cache entry '{}' in scope '{}' needs refresh but has no loader",
                    self.key, self.scope
                ),
                hint: Some("pass a loader whenever ticks_to_refresh is non-zero".to_string()),
            }),
        }
    }

    /// The same entry with a new value, created at `now`
    pub fn refreshed(&self, value: V, now: i64) -> Self {
        Self {
            scope: self.scope.clone(),
            key: self.key.clone(),
            value,
            created_at: now,
            options: self.options.clone(),
            stamp: 0,
        }
    }
}

impl<V: Clone> Clone for CacheItem<V> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            created_at: self.created_at,
            options: self.options.clone(),
            stamp: self.stamp,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for CacheItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("created_at", &self.created_at)
            .field("options", &self.options)
            .finish()
    }
}
