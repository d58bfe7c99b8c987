//! Capability-based heap interface for captrace.
//!
//! Models an allocator that serves memory from multiple distinct pools,
//! selected at call time by a capability bit mask (DMA-capable, executable,
//! external SPIRAM, internal RAM, ...). The tracking layer in the `captrace`
//! crate treats this allocator as a given collaborator: it is consumed only
//! through the [`CapHeap`] trait and assumed internally thread-safe.
//!
//! The crate consists of:
//! - **Capability masks** (`caps`): bit-flag pool selectors with human names
//! - **Heap trait** (`heap`): allocate / resize / free / per-pool statistics
//! - **Reference pools** (`pool`): an in-memory multi-pool heap with byte
//!   budgets, used by the harness and by tests that need to force
//!   pool-exhaustion failures

pub mod caps;
pub mod heap;
pub mod pool;

pub use caps::Caps;
pub use heap::{CapHeap, HeapInfo, print_free_summary};
pub use pool::{PoolHeap, PoolSpec};
