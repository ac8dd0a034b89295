//! Per-key mutual exclusion for compute-on-miss

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};

type LockKey = (String, String);

#[derive(Default)]
struct KeyLock {
    held: Mutex<bool>,
    released: Condvar,
}

/// Lock table keyed by `(scope, key)`
///
/// Entries exist only while someone holds or waits for them, so the table
/// does not grow with the number of distinct keys ever requested.
#[derive(Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<LockKey, Arc<KeyLock>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `(scope, key)` is free and take it
    pub fn acquire(&self, scope: &str, key: &str) -> Result<KeyLockGuard<'_>> {
        let id = (scope.to_string(), key.to_string());
        let lock = {
            let mut table = self.table.lock().map_err(|_| Error::LockPoisoned {
                context: "key lock table".to_string(),
            })?;
            Arc::clone(table.entry(id.clone()).or_default())
        };

        {
            let mut held = lock.held.lock().map_err(|_| Error::LockPoisoned {
                context: format!("key lock '{}' in scope '{}'", key, scope),
            })?;
            while *held {
                held = lock.released.wait(held).map_err(|_| Error::LockPoisoned {
                    context: format!("key lock '{}' in scope '{}'", key, scope),
                })?;
            }
            *held = true;
        }

        Ok(KeyLockGuard {
            owner: self,
            id,
            lock,
        })
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.table.lock().map(|table| table.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its key lock on drop
pub struct KeyLockGuard<'a> {
    owner: &'a KeyLocks,
    id: LockKey,
    lock: Arc<KeyLock>,
}

impl KeyLockGuard<'_> {
    pub fn scope(&self) -> &str {
        &self.id.0
    }

    pub fn key(&self) -> &str {
        &self.id.1
    }
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.lock.held.lock() {
            *held = false;
        }
        self.lock.released.notify_one();

        // Table plus this guard: nobody else is waiting.
        if let Ok(mut table) = self.owner.table.lock() {
            if Arc::strong_count(&self.lock) == 2 {
                table.remove(&self.id);
            }
        }
    }
}
