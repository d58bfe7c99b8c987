//! The capability-heap contract consumed by the tracking layer.
//!
//! Implementations are assumed internally thread-safe; the tracker never
//! wraps heap calls in its own lock. All allocation entry points signal
//! failure by returning `None` — there is no panic or abort path.

use serde::Serialize;
use std::fmt;

use crate::caps::Caps;

/// Per-pool statistics for one capability mask, in the shape of
/// `multi_heap_info_t`. Diagnostic only; values may be stale by the time
/// the caller reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeapInfo {
    /// Bytes currently available across matching pools.
    pub total_free_bytes: usize,
    /// Bytes currently handed out from matching pools.
    pub total_allocated_bytes: usize,
    /// Largest single allocation that could currently succeed.
    pub largest_free_block: usize,
    /// Number of live blocks in matching pools.
    pub allocated_blocks: usize,
}

impl fmt::Display for HeapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "free: {} bytes, allocated: {} bytes, largest free block: {} bytes, live blocks: {}",
            self.total_free_bytes,
            self.total_allocated_bytes,
            self.largest_free_block,
            self.allocated_blocks
        )
    }
}

/// A heap serving allocations from capability-selected pools.
///
/// The tracker relies on one property beyond ordinary allocator contracts:
/// the heap never returns an address that is currently live. Every method
/// maps to one operation of the underlying allocator.
pub trait CapHeap: Send + Sync {
    /// Allocate `size` bytes from a pool providing every flag in `caps`.
    /// Returns `None` on exhaustion or for zero-size requests.
    fn alloc(&self, size: usize, caps: Caps) -> Option<*mut u8>;

    /// Allocate `count * size` zero-initialized bytes. Returns `None` when
    /// the multiplication overflows or the pool is exhausted.
    fn alloc_zeroed(&self, count: usize, size: usize, caps: Caps) -> Option<*mut u8>;

    /// Resize `ptr` to `new_size` bytes, possibly relocating it. On failure
    /// the original block is untouched and `None` is returned. A null `ptr`
    /// behaves as [`CapHeap::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live address previously returned by this heap.
    unsafe fn realloc(&self, ptr: *mut u8, new_size: usize, caps: Caps) -> Option<*mut u8>;

    /// Return a block to its pool.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live address previously returned by this heap, and
    /// must not be used after this call.
    unsafe fn free(&self, ptr: *mut u8);

    /// Free bytes across pools matching `caps`. Diagnostic only.
    fn free_bytes(&self, caps: Caps) -> usize;

    /// Statistics for pools matching `caps`. Diagnostic only.
    fn heap_info(&self, caps: Caps) -> HeapInfo;
}

/// Rows of the free-bytes summary, one per well-known capability.
const SUMMARY_ROWS: [(Caps, &str); 9] = [
    (Caps::DEFAULT, "total free heap"),
    (Caps::INTERNAL, "free internal memory (DRAM)"),
    (Caps::EXEC, "free IRAM memory (executable)"),
    (Caps::DMA, "free DMA-capable memory"),
    (Caps::CAP_8BIT, "free 8-bit accessible memory"),
    (Caps::CAP_32BIT, "free 32-bit accessible memory"),
    (Caps::SPIRAM, "free SPIRAM memory"),
    (Caps::IRAM_8BIT, "free IRAM memory (byte accessible)"),
    (Caps::RETENTION, "free retention memory"),
];

/// Print a one-line free-bytes summary per well-known capability to stderr.
pub fn print_free_summary<H: CapHeap>(heap: &H, tag: &str) {
    for (caps, label) in SUMMARY_ROWS {
        eprintln!("{tag} - {label}: {} bytes", heap.free_bytes(caps));
    }
}
