//! In-process scoped cache backed by one LRU map per scope

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use log::{debug, warn};
use lru::LruCache;

use super::clock::{SystemTicks, TickSource};
use super::item::{CacheItem, ItemOptions};
use super::stats::{CacheStatistics, Counters};
use super::ScopedCache;
use crate::config::CacheConfig;
use crate::error::{Error, Result};

struct Scope<V> {
    entries: LruCache<String, CacheItem<V>>,
    counters: Counters,
    /// Keys whose refresh is running on some caller
    refreshing: HashSet<String>,
    last_stamp: u64,
}

impl<V> Scope<V> {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            counters: Counters::default(),
            refreshing: HashSet::new(),
            last_stamp: 0,
        }
    }

    /// Insert, counting a capacity eviction when another key is pushed out
    fn insert(&mut self, mut item: CacheItem<V>) {
        self.last_stamp += 1;
        item.set_stamp(self.last_stamp);
        let key = item.key().to_string();
        if let Some((evicted, _)) = self.entries.push(key.clone(), item) {
            if evicted != key {
                debug!("evicted '{}' to respect capacity", evicted);
                self.counters.evictions += 1;
            }
        }
    }

    /// Whether `item` is still the resident entry for its key
    fn is_resident(&self, item: &CacheItem<V>) -> bool {
        self.entries
            .peek(item.key())
            .map(|resident| resident.stamp() == item.stamp())
            .unwrap_or(false)
    }
}

/// Releases a refresh claim, also when the loader panics
struct RefreshClaim<'a, V> {
    scope: &'a Mutex<Scope<V>>,
    key: String,
}

impl<V> Drop for RefreshClaim<'_, V> {
    fn drop(&mut self) {
        let mut scope = match self.scope.lock() {
            Ok(scope) => scope,
            Err(poisoned) => poisoned.into_inner(),
        };
        scope.refreshing.remove(&self.key);
    }
}

/// Thread-safe, size-bounded cache partitioned into named scopes
///
/// Each scope holds at most its configured number of entries and evicts the
/// least recently used one on overflow. Scopes are locked independently, so
/// operations on different scopes never contend beyond a short read of the
/// scope table.
pub struct MemoryScopedCache<V> {
    scopes: RwLock<HashMap<String, Arc<Mutex<Scope<V>>>>>,
    ticks: Arc<dyn TickSource>,
}

impl<V> MemoryScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// An empty cache counting ticks in milliseconds
    pub fn new() -> Self {
        Self::with_ticks(Arc::new(SystemTicks))
    }

    /// An empty cache with a custom tick source
    pub fn with_ticks(ticks: Arc<dyn TickSource>) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            ticks,
        }
    }

    /// A cache with the configured scopes registered
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let cache = Self::new();
        for scope in &config.scopes {
            cache.add_scope(&scope.name, scope.capacity)?;
        }
        Ok(cache)
    }

    fn scope(&self, name: &str) -> Result<Arc<Mutex<Scope<V>>>> {
        let scopes = self.scopes.read().map_err(|_| Error::LockPoisoned {
            context: "scope table".to_string(),
        })?;
        scopes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidScope {
                scope: name.to_string(),
            })
    }

    fn with_scope<T>(&self, name: &str, f: impl FnOnce(&mut Scope<V>) -> T) -> Result<T> {
        let scope = self.scope(name)?;
        let mut guard = lock_scope(&scope, name)?;
        Ok(f(&mut guard))
    }

    /// Refresh a claimed entry outside the scope lock and store the outcome
    ///
    /// The refreshed value replaces the entry only if it is still resident;
    /// a concurrent `remove`, `clear_scope` or newer `put` takes precedence.
    fn refresh(
        &self,
        scope: &Mutex<Scope<V>>,
        name: &str,
        item: CacheItem<V>,
        now: i64,
    ) -> Result<CacheItem<V>> {
        let _claim = RefreshClaim {
            scope,
            key: item.key().to_string(),
        };

        let started = Instant::now();
        let outcome = item.load();
        let elapsed = started.elapsed();

        let mut guard = lock_scope(scope, name)?;
        let s = &mut *guard;
        match outcome {
            Ok(value) => {
                s.counters.record_load(elapsed, true);
                let refreshed = item.refreshed(value, now);
                if s.is_resident(&item) {
                    s.insert(refreshed.clone());
                    debug!("refreshed '{}' in scope '{}'", item.key(), name);
                } else {
                    debug!(
                        "'{}' in scope '{}' changed during refresh, discarding refreshed value",
                        item.key(),
                        name
                    );
                }
                Ok(refreshed)
            }
            Err(err) => {
                s.counters.record_load(elapsed, false);
                warn!(
                    "refresh of '{}' in scope '{}' failed, serving stale value: {}",
                    item.key(),
                    name,
                    err
                );
                Ok(item)
            }
        }
    }
}

impl<V> Default for MemoryScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock_scope<'a, V>(scope: &'a Mutex<Scope<V>>, name: &str) -> Result<MutexGuard<'a, Scope<V>>> {
    scope.lock().map_err(|_| Error::LockPoisoned {
        context: format!("scope '{}'", name),
    })
}

fn capacity(name: &str, capacity: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(capacity).ok_or_else(|| Error::Configuration {
        message: format!("scope '{}' must have a positive capacity", name),
        hint: Some("set 'capacity' to at least 1".to_string()),
    })
}

impl<V> ScopedCache<V> for MemoryScopedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn add_scope(&self, name: &str, size: usize) -> Result<()> {
        let cap = capacity(name, size)?;
        let mut scopes = self.scopes.write().map_err(|_| Error::LockPoisoned {
            context: "scope table".to_string(),
        })?;
        match scopes.get(name) {
            Some(existing) => {
                let mut scope = lock_scope(existing, name)?;
                let overflow = scope.entries.len().saturating_sub(cap.get());
                scope.entries.resize(cap);
                scope.counters.evictions += overflow as u64;
                debug!("resized scope '{}' to {}", name, cap);
            }
            None => {
                scopes.insert(name.to_string(), Arc::new(Mutex::new(Scope::new(cap))));
                debug!("added scope '{}' with capacity {}", name, cap);
            }
        }
        Ok(())
    }

    fn remove_scope(&self, name: &str) -> Result<()> {
        let mut scopes = self.scopes.write().map_err(|_| Error::LockPoisoned {
            context: "scope table".to_string(),
        })?;
        scopes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidScope {
                scope: name.to_string(),
            })
    }

    fn has_scope(&self, name: &str) -> bool {
        self.scopes
            .read()
            .map(|scopes| scopes.contains_key(name))
            .unwrap_or(false)
    }

    fn scope_names(&self) -> Result<Vec<String>> {
        let scopes = self.scopes.read().map_err(|_| Error::LockPoisoned {
            context: "scope table".to_string(),
        })?;
        let mut names: Vec<String> = scopes.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn get(&self, scope: &str, key: &str) -> Result<Option<CacheItem<V>>> {
        let now = self.ticks.now();
        let shared = self.scope(scope)?;
        let (item, claimed) = {
            let mut guard = lock_scope(&shared, scope)?;
            let s = &mut *guard;
            let item = match s.entries.get(key) {
                Some(item) => item.clone(),
                None => {
                    s.counters.misses += 1;
                    return Ok(None);
                }
            };
            if item.is_expired(now) {
                s.entries.pop(key);
                s.counters.misses += 1;
                return Ok(None);
            }
            s.counters.hits += 1;
            if !item.needs_refresh(now) {
                return Ok(Some(item));
            }
            if !item.has_loader() {
                // load() reports the missing loader
                item.load()?;
            }
            let claimed = s.refreshing.insert(key.to_string());
            (item, claimed)
        };

        if claimed {
            self.refresh(&shared, scope, item, now).map(Some)
        } else {
            debug!("'{}' in scope '{}' is being refreshed, serving stale value", key, scope);
            Ok(Some(item))
        }
    }

    fn has_key(&self, scope: &str, key: &str) -> Result<bool> {
        let now = self.ticks.now();
        self.with_scope(scope, |s| {
            s.entries
                .peek(key)
                .map(|item| !item.is_expired(now))
                .unwrap_or(false)
        })
    }

    fn keys(&self, scope: &str) -> Result<Vec<String>> {
        let now = self.ticks.now();
        self.with_scope(scope, |s| {
            s.entries
                .iter()
                .filter(|(_, item)| !item.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        })
    }

    fn size(&self, scope: &str) -> Result<usize> {
        self.with_scope(scope, |s| s.entries.len())
    }

    fn put_with(&self, scope: &str, key: &str, value: V, options: ItemOptions<V>) -> Result<()> {
        let item = CacheItem::new(scope, key, value, self.ticks.now(), options);
        self.with_scope(scope, |s| s.insert(item))
    }

    fn remove(&self, scope: &str, key: &str) -> Result<bool> {
        self.with_scope(scope, |s| s.entries.pop(key).is_some())
    }

    fn clear_scope(&self, scope: &str) -> Result<()> {
        self.with_scope(scope, |s| s.entries.clear())
    }

    fn clear_all(&self) -> Result<()> {
        for name in self.scope_names()? {
            // A scope removed concurrently is already empty.
            match self.clear_scope(&name) {
                Ok(()) | Err(Error::InvalidScope { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn statistics(&self, scope: &str) -> Result<CacheStatistics> {
        self.with_scope(scope, |s| s.counters.snapshot(s.entries.len()))
    }

    fn record_load(&self, scope: &str, elapsed: Duration, success: bool) -> Result<()> {
        self.with_scope(scope, |s| s.counters.record_load(elapsed, success))
    }

    fn now(&self) -> i64 {
        self.ticks.now()
    }
}
