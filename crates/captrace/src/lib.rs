//! Debug-mode allocation tracking for capability-based heaps.
//!
//! Layers a process-wide registry of live allocations on top of an
//! externally provided capability heap (see `captrace-heap`). Callers
//! allocate through capability-annotated facade calls that stamp call-site
//! provenance automatically, enumerate every live tracked allocation on
//! demand, and release blocks through a zero-untrack-free-null sequence.
//!
//! # Architecture
//!
//! - **Records** (`record`): per-allocation metadata + `call_site!`
//! - **Registry** (`registry`): THE CORE — mutex-serialized insert,
//!   remove-by-address, enumerate, and zero-then-remove, with a fail-open
//!   policy when the registry itself cannot grow
//! - **Facade** (`trace`): alloc / alloc_zeroed / realloc / release over
//!   any [`captrace_heap::CapHeap`], plus the `traced_*!` macros
//! - **Reporting** (`report`): structured allocation-failure diagnostics
//! - **Configuration** (`config`): tracking gate, entry cap, stall pause
//! - **Metrics** (`metrics`): relaxed atomic counters
//!
//! Tracking never interferes with the underlying memory: a failed
//! bookkeeping step leaves the caller holding perfectly usable, merely
//! untracked, memory.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod report;
pub mod trace;

pub use config::TracerConfig;
pub use error::RegistryError;
pub use metrics::{MetricsSnapshot, TracerMetrics};
pub use record::{AllocMethod, AllocRecord, CallSite, UNKNOWN_LABEL};
pub use registry::AllocRegistry;
pub use report::{FailureReport, log_alloc_failure};
pub use trace::TracedHeap;
