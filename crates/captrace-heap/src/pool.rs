//! Reference multi-pool heap backed by the system allocator.
//!
//! Each pool advertises a capability set and a byte budget. Requests are
//! served by the first pool that provides every requested flag and still
//! has room; exhausting a budget makes further requests fail with `None`,
//! which is how the harness and the tests provoke allocation failure
//! deterministically.
//!
//! This is a stand-in for a real capability heap, not an allocator design:
//! blocks come from `std::alloc` and the pools only do the accounting.

#![allow(unsafe_code)]

use parking_lot::Mutex;
use std::alloc::{self, Layout};
use std::collections::HashMap;

use crate::caps::Caps;
use crate::heap::{CapHeap, HeapInfo};

/// Block alignment handed out by the reference heap.
const BLOCK_ALIGN: usize = 8;

/// One pool definition: which capabilities it provides, and its byte budget.
#[derive(Debug, Clone, Copy)]
pub struct PoolSpec {
    /// Capability flags this pool provides.
    pub caps: Caps,
    /// Total bytes this pool may hand out at once.
    pub capacity: usize,
}

impl PoolSpec {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(caps: Caps, capacity: usize) -> Self {
        Self { caps, capacity }
    }
}

#[derive(Debug)]
struct PoolState {
    caps: Caps,
    capacity: usize,
    used: usize,
    live_blocks: usize,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    layout: Layout,
    pool: usize,
}

struct Inner {
    pools: Vec<PoolState>,
    /// Live block address -> layout and owning pool.
    blocks: HashMap<usize, Block>,
}

/// In-memory capability heap with per-pool byte budgets.
pub struct PoolHeap {
    inner: Mutex<Inner>,
}

impl PoolHeap {
    /// Build a heap from pool definitions. Pool order is match order.
    #[must_use]
    pub fn new(specs: &[PoolSpec]) -> Self {
        let pools = specs
            .iter()
            .map(|s| PoolState {
                caps: s.caps,
                capacity: s.capacity,
                used: 0,
                live_blocks: 0,
            })
            .collect();
        Self {
            inner: Mutex::new(Inner {
                pools,
                blocks: HashMap::new(),
            }),
        }
    }

    fn alloc_impl(&self, size: usize, caps: Caps, zeroed: bool) -> Option<*mut u8> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, BLOCK_ALIGN).ok()?;

        let mut inner = self.inner.lock();
        let pool = inner
            .pools
            .iter()
            .position(|p| p.caps.contains(caps) && p.capacity - p.used >= size)?;

        // SAFETY: layout has non-zero size (checked above).
        let ptr = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        if ptr.is_null() {
            return None;
        }

        inner.pools[pool].used += size;
        inner.pools[pool].live_blocks += 1;
        inner.blocks.insert(ptr as usize, Block { layout, pool });
        Some(ptr)
    }
}

impl CapHeap for PoolHeap {
    fn alloc(&self, size: usize, caps: Caps) -> Option<*mut u8> {
        self.alloc_impl(size, caps, false)
    }

    fn alloc_zeroed(&self, count: usize, size: usize, caps: Caps) -> Option<*mut u8> {
        let total = count.checked_mul(size)?;
        self.alloc_impl(total, caps, true)
    }

    unsafe fn realloc(&self, ptr: *mut u8, new_size: usize, caps: Caps) -> Option<*mut u8> {
        if ptr.is_null() {
            return self.alloc(new_size, caps);
        }
        if new_size == 0 {
            return None;
        }

        let old_layout = {
            let inner = self.inner.lock();
            inner.blocks.get(&(ptr as usize))?.layout
        };

        // Fresh allocation first; a failed resize must leave the old block
        // intact. The budget briefly carries both blocks.
        let new_ptr = self.alloc_impl(new_size, caps, false)?;
        let copy = old_layout.size().min(new_size);
        // SAFETY: both blocks are live, disjoint, and at least `copy` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr, new_ptr, copy);
            self.free(ptr);
        }
        Some(new_ptr)
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let mut inner = self.inner.lock();
        // Unknown addresses are tolerated: the block is simply not ours.
        let Some(block) = inner.blocks.remove(&(ptr as usize)) else {
            return;
        };
        inner.pools[block.pool].used -= block.layout.size();
        inner.pools[block.pool].live_blocks -= 1;
        // SAFETY: `ptr` was allocated by this heap with exactly this layout.
        unsafe { alloc::dealloc(ptr, block.layout) };
    }

    fn free_bytes(&self, caps: Caps) -> usize {
        let inner = self.inner.lock();
        inner
            .pools
            .iter()
            .filter(|p| p.caps.contains(caps))
            .map(|p| p.capacity - p.used)
            .sum()
    }

    fn heap_info(&self, caps: Caps) -> HeapInfo {
        let inner = self.inner.lock();
        let mut info = HeapInfo::default();
        for p in inner.pools.iter().filter(|p| p.caps.contains(caps)) {
            let free = p.capacity - p.used;
            info.total_free_bytes += free;
            info.total_allocated_bytes += p.used;
            info.largest_free_block = info.largest_free_block.max(free);
            info.allocated_blocks += p.live_blocks;
        }
        info
    }
}

impl Drop for PoolHeap {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        for (addr, block) in inner.blocks.drain() {
            // SAFETY: every entry in `blocks` is a live allocation of ours.
            unsafe { alloc::dealloc(addr as *mut u8, block.layout) };
        }
    }
}
