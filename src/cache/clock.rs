//! Tick sources for expiry and refresh accounting

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current tick
///
/// The unit is up to the host application; the cache only compares
/// differences against configured intervals.
pub trait TickSource: Send + Sync {
    fn now(&self) -> i64;
}

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTicks;

impl TickSource for SystemTicks {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A tick counter advanced by hand
#[derive(Debug, Default)]
pub struct ManualTicks {
    current: AtomicI64,
}

impl ManualTicks {
    pub fn new(start: i64) -> Self {
        Self {
            current: AtomicI64::new(start),
        }
    }

    /// Move the clock forward, returning the new tick
    pub fn advance(&self, ticks: i64) -> i64 {
        self.current.fetch_add(ticks, Ordering::SeqCst) + ticks
    }

    pub fn set(&self, tick: i64) {
        self.current.store(tick, Ordering::SeqCst);
    }
}

impl TickSource for ManualTicks {
    fn now(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_ticks() {
        let ticks = ManualTicks::new(5);
        assert_eq!(ticks.now(), 5);
        assert_eq!(ticks.advance(10), 15);
        ticks.set(2);
        assert_eq!(ticks.now(), 2);
    }

    #[test]
    fn test_system_ticks_move_forward() {
        let ticks = SystemTicks;
        let first = ticks.now();
        assert!(first > 0);
        assert!(ticks.now() >= first);
    }
}
