//! Instrumented allocation facade over a capability heap.
//!
//! Every operation delegates to the underlying [`CapHeap`] first; registry
//! bookkeeping happens only on success and only while tracking is enabled.
//! Heap calls are never made under the registry lock. Failures are logged
//! with provenance and pool statistics, then surfaced as `None` — the
//! facade never retries and never panics on exhaustion.

#![allow(unsafe_code)]

use captrace_heap::CapHeap;
use captrace_heap::Caps;

use crate::config::TracerConfig;
use crate::metrics::TracerMetrics;
use crate::record::{AllocMethod, AllocRecord, CallSite, UNKNOWN_LABEL};
use crate::registry::AllocRegistry;
use crate::report::{FailureReport, log_alloc_failure};

/// A capability heap with debug-mode allocation tracking layered on top.
///
/// Owns the registry and metrics for the heap it wraps; intended to be
/// created once by whichever component initializes the system and passed
/// by shared reference to every call site.
pub struct TracedHeap<H: CapHeap> {
    heap: H,
    registry: AllocRegistry,
    metrics: TracerMetrics,
}

impl<H: CapHeap> TracedHeap<H> {
    /// Wrap `heap` with default configuration (tracking on).
    #[must_use]
    pub fn new(heap: H) -> Self {
        Self::with_config(heap, &TracerConfig::default())
    }

    /// Wrap `heap` with explicit configuration.
    #[must_use]
    pub fn with_config(heap: H, config: &TracerConfig) -> Self {
        Self {
            heap,
            registry: AllocRegistry::new(config),
            metrics: TracerMetrics::new(),
        }
    }

    /// The wrapped heap.
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// The allocation registry.
    pub fn registry(&self) -> &AllocRegistry {
        &self.registry
    }

    /// Operation counters.
    pub fn metrics(&self) -> &TracerMetrics {
        &self.metrics
    }

    /// Allocate `size` bytes with `caps`, registering the block when
    /// tracking is enabled. Prefer [`traced_alloc!`] so provenance is
    /// stamped automatically.
    pub fn alloc(
        &self,
        size: usize,
        caps: Caps,
        site: CallSite,
        label: &'static str,
    ) -> Option<*mut u8> {
        let ptr = self.heap.alloc(size, caps);
        self.finish_alloc(ptr, size, caps, site, label, AllocMethod::Alloc)
    }

    /// Allocate `count * size` zero-initialized bytes. Overflowing requests
    /// are reported like any other failure.
    pub fn alloc_zeroed(
        &self,
        count: usize,
        size: usize,
        caps: Caps,
        site: CallSite,
        label: &'static str,
    ) -> Option<*mut u8> {
        let Some(total) = count.checked_mul(size) else {
            TracerMetrics::inc(&self.metrics.alloc_failures);
            self.note_failure(AllocMethod::AllocZeroed, usize::MAX, caps, site);
            return None;
        };
        let ptr = self.heap.alloc_zeroed(count, size, caps);
        self.finish_alloc(ptr, total, caps, site, label, AllocMethod::AllocZeroed)
    }

    /// Resize a block. On relocation the old record is replaced by one at
    /// the new address (keeping the old record's label); a same-address
    /// resize refreshes the recorded size in place. On failure the old
    /// block and its record are untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live address previously returned by this
    /// facade (or its heap).
    pub unsafe fn realloc(
        &self,
        ptr: *mut u8,
        new_size: usize,
        caps: Caps,
        site: CallSite,
    ) -> Option<*mut u8> {
        // SAFETY: forwarded caller contract.
        let new_ptr = unsafe { self.heap.realloc(ptr, new_size, caps) };
        let Some(p) = new_ptr else {
            TracerMetrics::inc(&self.metrics.realloc_failures);
            self.note_failure(AllocMethod::Realloc, new_size, caps, site);
            return None;
        };
        TracerMetrics::inc(&self.metrics.reallocs);

        if p == ptr {
            self.registry.update_size(p as usize, new_size);
        } else {
            let label = self
                .registry
                .remove(ptr as usize)
                .map_or(UNKNOWN_LABEL, |old| old.label);
            self.registry.insert(AllocRecord {
                address: p as usize,
                size: new_size,
                caps,
                method: AllocMethod::Realloc,
                site,
                label,
            });
        }
        Some(p)
    }

    /// Zero (when a tracked size is known), untrack, free, and null out.
    ///
    /// The caller's pointer variable is nulled, so a repeated call on the
    /// same variable is a harmless no-op and the underlying free happens
    /// exactly once. Untracked pointers are still freed — just not zeroed,
    /// since no length is known for them.
    ///
    /// # Safety
    ///
    /// `*slot` must be null or a live address previously returned by this
    /// facade (or its heap).
    pub unsafe fn release(&self, slot: &mut *mut u8) {
        let ptr = *slot;
        if ptr.is_null() {
            return;
        }
        if self.registry.enabled() {
            // SAFETY: caller guarantees the block is live; the registry
            // only zeroes lengths it recorded for this address.
            unsafe { self.registry.clear(ptr as usize) };
        }
        // SAFETY: forwarded caller contract.
        unsafe { self.heap.free(ptr) };
        TracerMetrics::inc(&self.metrics.releases);
        *slot = std::ptr::null_mut();
    }

    /// Consistent copy of all currently tracked allocations.
    #[must_use]
    pub fn live_allocations(&self) -> Vec<AllocRecord> {
        self.registry.snapshot()
    }

    /// Print every tracked allocation to stderr, one record per line.
    pub fn list_allocations(&self) {
        for record in self.registry.snapshot() {
            eprintln!("{record}");
        }
    }

    fn finish_alloc(
        &self,
        ptr: Option<*mut u8>,
        size: usize,
        caps: Caps,
        site: CallSite,
        label: &'static str,
        method: AllocMethod,
    ) -> Option<*mut u8> {
        let Some(p) = ptr else {
            TracerMetrics::inc(&self.metrics.alloc_failures);
            self.note_failure(method, size, caps, site);
            return None;
        };
        TracerMetrics::inc(&self.metrics.allocs);
        self.registry.insert(AllocRecord {
            address: p as usize,
            size,
            caps,
            method,
            site,
            label,
        });
        Some(p)
    }

    fn note_failure(&self, method: AllocMethod, size: usize, caps: Caps, site: CallSite) {
        log_alloc_failure(
            &self.heap,
            &FailureReport {
                method,
                size,
                caps,
                site,
            },
        );
    }
}

/// Allocate through a [`TracedHeap`] with automatic provenance.
///
/// `traced_alloc!(th, size, caps)` records the variable label as
/// `"unknown"`; pass a fourth argument to label the allocation.
#[macro_export]
macro_rules! traced_alloc {
    ($th:expr, $size:expr, $caps:expr) => {
        $crate::traced_alloc!($th, $size, $caps, $crate::record::UNKNOWN_LABEL)
    };
    ($th:expr, $size:expr, $caps:expr, $label:expr) => {
        $th.alloc($size, $caps, $crate::call_site!(), $label)
    };
}

/// Zero-initialized allocation through a [`TracedHeap`] with automatic
/// provenance. Optional trailing label as in [`traced_alloc!`].
#[macro_export]
macro_rules! traced_alloc_zeroed {
    ($th:expr, $count:expr, $size:expr, $caps:expr) => {
        $crate::traced_alloc_zeroed!($th, $count, $size, $caps, $crate::record::UNKNOWN_LABEL)
    };
    ($th:expr, $count:expr, $size:expr, $caps:expr, $label:expr) => {
        $th.alloc_zeroed($count, $size, $caps, $crate::call_site!(), $label)
    };
}

/// Resize through a [`TracedHeap`] with automatic provenance. The caller
/// must uphold [`TracedHeap::realloc`]'s safety contract.
#[macro_export]
macro_rules! traced_realloc {
    ($th:expr, $ptr:expr, $new_size:expr, $caps:expr) => {
        $th.realloc($ptr, $new_size, $caps, $crate::call_site!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use captrace_heap::{PoolHeap, PoolSpec};
    use std::time::Duration;

    fn demo_heap() -> PoolHeap {
        PoolHeap::new(&[
            PoolSpec::new(Caps::INTERNAL | Caps::CAP_8BIT | Caps::DEFAULT, 4096),
            PoolSpec::new(Caps::SPIRAM | Caps::CAP_8BIT, 8192),
        ])
    }

    fn tracer() -> TracedHeap<PoolHeap> {
        TracedHeap::with_config(
            demo_heap(),
            &TracerConfig::default().with_stall_pause(Duration::ZERO),
        )
    }

    #[test]
    fn two_allocations_enumerate_in_insertion_order() {
        let th = tracer();
        let mut a = traced_alloc!(th, 256, Caps::INTERNAL, "buffer").expect("a");
        let mut b = traced_alloc!(th, 512, Caps::SPIRAM, "debug_string").expect("b");

        let live = th.live_allocations();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].size, 256);
        assert_eq!(live[0].caps, Caps::INTERNAL);
        assert_eq!(live[0].label, "buffer");
        assert_eq!(live[1].size, 512);
        assert_eq!(live[1].caps, Caps::SPIRAM);

        // SAFETY: `a` holds a live block from `th`.
        unsafe { th.release(&mut a) };
        let live = th.live_allocations();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].size, 512);

        // SAFETY: `b` holds a live block from `th`.
        unsafe { th.release(&mut b) };
        assert!(th.live_allocations().is_empty());
        assert_eq!(TracerMetrics::get(&th.metrics().releases), 2);
    }

    #[test]
    fn failed_allocation_is_reported_not_tracked() {
        let th = tracer();
        let _ok = traced_alloc!(th, 64, Caps::INTERNAL).expect("fits");
        assert!(traced_alloc!(th, 1 << 20, Caps::INTERNAL).is_none());

        assert_eq!(th.live_allocations().len(), 1);
        assert_eq!(TracerMetrics::get(&th.metrics().alloc_failures), 1);
    }

    #[test]
    fn overflowing_calloc_fails_cleanly() {
        let th = tracer();
        assert!(traced_alloc_zeroed!(th, usize::MAX, 2, Caps::CAP_8BIT).is_none());
        assert!(th.live_allocations().is_empty());
        assert_eq!(TracerMetrics::get(&th.metrics().alloc_failures), 1);
    }

    #[test]
    fn relocating_realloc_moves_the_record() {
        let th = tracer();
        let ptr = traced_alloc!(th, 32, Caps::INTERNAL, "grow_me").expect("alloc");
        let old_addr = ptr as usize;

        // SAFETY: `ptr` is live and from `th`.
        let new_ptr = unsafe { traced_realloc!(th, ptr, 128, Caps::INTERNAL) }.expect("realloc");
        assert_ne!(new_ptr as usize, old_addr, "reference heap always relocates");

        let live = th.live_allocations();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address, new_ptr as usize);
        assert_eq!(live[0].size, 128);
        assert_eq!(live[0].method, AllocMethod::Realloc);
        assert_eq!(live[0].label, "grow_me", "label survives relocation");
    }

    #[test]
    fn failed_realloc_keeps_the_old_record() {
        let th = tracer();
        let ptr = traced_alloc!(th, 100, Caps::INTERNAL).expect("alloc");
        // SAFETY: `ptr` is live and from `th`.
        let res = unsafe { traced_realloc!(th, ptr, 1 << 20, Caps::INTERNAL) };
        assert!(res.is_none());

        let live = th.live_allocations();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address, ptr as usize);
        assert_eq!(live[0].size, 100);
    }

    #[test]
    fn realloc_of_null_tracks_like_alloc() {
        let th = tracer();
        // SAFETY: null is explicitly allowed.
        let ptr = unsafe { traced_realloc!(th, std::ptr::null_mut(), 64, Caps::INTERNAL) }
            .expect("realloc-as-alloc");
        let live = th.live_allocations();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address, ptr as usize);
        assert_eq!(live[0].label, UNKNOWN_LABEL);
    }

    #[test]
    fn tracking_disabled_is_pure_passthrough() {
        let th = TracedHeap::with_config(demo_heap(), &TracerConfig::default().with_enabled(false));
        let mut a = traced_alloc!(th, 256, Caps::INTERNAL).expect("alloc works untracked");
        assert_eq!(th.registry().len(), 0);
        assert!(th.live_allocations().is_empty());
        // SAFETY: `a` holds a live block from `th`.
        unsafe { th.release(&mut a) };
        assert!(a.is_null());
        assert_eq!(th.registry().len(), 0);
    }

    #[test]
    fn registry_exhaustion_does_not_undo_allocation() {
        let th = TracedHeap::with_config(
            demo_heap(),
            &TracerConfig::default()
                .with_max_entries(1)
                .with_stall_pause(Duration::ZERO),
        );
        let _first = traced_alloc!(th, 64, Caps::INTERNAL).expect("first");
        let second = traced_alloc!(th, 64, Caps::INTERNAL).expect("second stays usable");

        assert_eq!(th.registry().len(), 1, "second allocation is untracked");
        assert_eq!(th.registry().stalls(), 1);
        // The untracked block is real memory: write through it.
        // SAFETY: `second` is a live 64-byte block.
        unsafe { std::ptr::write_bytes(second, 0x5A, 64) };
    }

    #[test]
    fn release_of_null_slot_is_a_no_op() {
        let th = tracer();
        let mut slot: *mut u8 = std::ptr::null_mut();
        // SAFETY: null slot is explicitly allowed.
        unsafe { th.release(&mut slot) };
        assert!(slot.is_null());
        assert_eq!(TracerMetrics::get(&th.metrics().releases), 0);
    }

    #[test]
    fn call_site_points_at_macro_invocation() {
        let th = tracer();
        let _p = traced_alloc!(th, 16, Caps::INTERNAL).expect("alloc");
        let live = th.live_allocations();
        assert!(live[0].site.file.ends_with("trace.rs"));
        assert!(
            live[0]
                .site
                .function
                .ends_with("call_site_points_at_macro_invocation")
        );
    }
}
