//! Per-scope cache statistics

use std::time::Duration;

use serde::Serialize;

/// Read-only snapshot of one scope's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    /// Resident entries
    pub size: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub load_success_count: u64,
    pub load_exception_count: u64,
    /// Time spent in loaders and recorded computations
    pub total_load_time: Duration,
    /// Entries dropped to respect the scope capacity
    pub eviction_count: u64,
}

impl CacheStatistics {
    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Hits over requests; 1.0 for a scope that saw no requests
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 1.0,
            requests => self.hit_count as f64 / requests as f64,
        }
    }
}

/// Mutable counters kept beside each scope's entries
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub load_successes: u64,
    pub load_exceptions: u64,
    pub load_time: Duration,
    pub evictions: u64,
}

impl Counters {
    pub fn record_load(&mut self, elapsed: Duration, success: bool) {
        self.load_time += elapsed;
        if success {
            self.load_successes += 1;
        } else {
            self.load_exceptions += 1;
        }
    }

    pub fn snapshot(&self, size: usize) -> CacheStatistics {
        CacheStatistics {
            size,
            hit_count: self.hits,
            miss_count: self.misses,
            load_success_count: self.load_successes,
            load_exception_count: self.load_exceptions,
            total_load_time: self.load_time,
            eviction_count: self.evictions,
        }
    }
}
