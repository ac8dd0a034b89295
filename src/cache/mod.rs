//! # Scoped Cache
//!
//! A process-local cache partitioned into named scopes. Every scope has its
//! own capacity, its own LRU eviction and its own statistics; clearing one
//! scope never touches another.
//!
//! ## Components
//!
//! - [`ScopedCache`]: the storage contract. [`MemoryScopedCache`] is the
//!   in-process implementation; other stores can implement the trait.
//! - [`CacheItem`] and [`ItemOptions`]: entries with expiry, refresh and
//!   loader metadata, measured in ticks from a [`TickSource`].
//! - [`CacheTemplate`]: the compute-on-miss protocol layered on a store, in
//!   locking, non-locking and pass-through flavours.
//! - [`KeyLocks`]: per-key mutual exclusion used by the locking template.
//!
//! ## Example
//!
//! ```
//! use descriptor_merge::cache::{MemoryScopedCache, ScopedCache};
//!
//! let cache: MemoryScopedCache<String> = MemoryScopedCache::new();
//! cache.add_scope("descriptors", 2).unwrap();
//! cache.put("descriptors", "a", "1".to_string()).unwrap();
//!
//! let item = cache.get("descriptors", "a").unwrap().unwrap();
//! assert_eq!(item.value(), "1");
//! ```

use std::time::Duration;

use crate::error::Result;

pub mod clock;
pub mod item;
pub mod locks;
pub mod memory;
pub mod stats;
pub mod template;

pub use clock::{ManualTicks, SystemTicks, TickSource};
pub use item::{CacheItem, ItemOptions, Loader};
pub use locks::{KeyLockGuard, KeyLocks};
pub use memory::MemoryScopedCache;
pub use stats::CacheStatistics;
pub use template::{
    cache_key, CacheContext, CacheTemplate, CachingOptions, ConfiguredTemplate,
    LockingCacheTemplate, NoCacheTemplate, NonLockingCacheTemplate,
};

/// Storage contract for a scoped cache
///
/// Every keyed operation on an unregistered scope fails with
/// [`Error::InvalidScope`](crate::Error::InvalidScope).
pub trait ScopedCache<V>: Send + Sync {
    /// Register a scope, or resize it when it already exists
    fn add_scope(&self, name: &str, size: usize) -> Result<()>;

    fn remove_scope(&self, name: &str) -> Result<()>;

    fn has_scope(&self, name: &str) -> bool;

    /// Registered scope names, sorted
    fn scope_names(&self) -> Result<Vec<String>>;

    /// Look up an entry, honouring expiry and refresh
    ///
    /// A due refresh runs on one caller at a time; others get the stale entry.
    fn get(&self, scope: &str, key: &str) -> Result<Option<CacheItem<V>>>;

    /// Whether a live entry exists, without touching recency or statistics
    fn has_key(&self, scope: &str, key: &str) -> Result<bool>;

    fn keys(&self, scope: &str) -> Result<Vec<String>>;

    fn size(&self, scope: &str) -> Result<usize>;

    /// Store a value that never expires and is never refreshed
    fn put(&self, scope: &str, key: &str, value: V) -> Result<()> {
        self.put_with(scope, key, value, ItemOptions::default())
    }

    fn put_with(&self, scope: &str, key: &str, value: V, options: ItemOptions<V>) -> Result<()>;

    /// Drop one entry; `false` when it was absent
    fn remove(&self, scope: &str, key: &str) -> Result<bool>;

    /// Drop every entry in one scope; statistics are kept
    fn clear_scope(&self, scope: &str) -> Result<()>;

    fn clear_all(&self) -> Result<()>;

    fn statistics(&self, scope: &str) -> Result<CacheStatistics>;

    /// Account for a computation performed on behalf of the scope
    fn record_load(&self, scope: &str, elapsed: Duration, success: bool) -> Result<()>;

    /// Current tick of the store's clock
    fn now(&self) -> i64;
}
