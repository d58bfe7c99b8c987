//! Atomic counters for tracker observability.
//!
//! All counters use relaxed ordering — they are advisory/diagnostic, not
//! synchronization primitives.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tracker operation counters.
#[derive(Debug, Default)]
pub struct TracerMetrics {
    /// Successful allocations (alloc + alloc_zeroed).
    pub allocs: AtomicU64,
    /// Allocations the heap refused.
    pub alloc_failures: AtomicU64,
    /// Successful resizes.
    pub reallocs: AtomicU64,
    /// Resizes the heap refused.
    pub realloc_failures: AtomicU64,
    /// Release-and-clear calls that freed a block.
    pub releases: AtomicU64,
}

impl TracerMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocs: AtomicU64::new(0),
            alloc_failures: AtomicU64::new(0),
            reallocs: AtomicU64::new(0),
            realloc_failures: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    #[must_use]
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters into a plain struct.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allocs: Self::get(&self.allocs),
            alloc_failures: Self::get(&self.alloc_failures),
            reallocs: Self::get(&self.reallocs),
            realloc_failures: Self::get(&self.realloc_failures),
            releases: Self::get(&self.releases),
        }
    }
}

/// Point-in-time copy of [`TracerMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub allocs: u64,
    pub alloc_failures: u64,
    pub reallocs: u64,
    pub realloc_failures: u64,
    pub releases: u64,
}
