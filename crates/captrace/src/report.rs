//! Structured diagnostics for allocation failure.
//!
//! A failed allocation is reported, never retried and never fatal: the
//! report carries full provenance plus the capability-pool statistics at
//! the time of failure, serializable for machine consumers and `Display`
//! for humans.

use captrace_heap::{CapHeap, Caps};
use serde::Serialize;
use std::fmt;

use crate::record::{AllocMethod, CallSite};

/// Diagnostic context for one failed allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Which facade operation failed.
    pub method: AllocMethod,
    /// Total bytes requested.
    pub size: usize,
    /// Capability mask of the request.
    pub caps: Caps,
    /// Where the request came from.
    pub site: CallSite,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes ({}) for {} in {} at {}:{}",
            self.size,
            self.caps.name(),
            self.method,
            self.site.function,
            self.site.file,
            self.site.line
        )
    }
}

/// Log a failure report plus the pool statistics for the requested
/// capability to stderr.
pub fn log_alloc_failure<H: CapHeap>(heap: &H, report: &FailureReport) {
    eprintln!("captrace: {report}");
    eprintln!(
        "captrace: {} pools: {}",
        report.caps.name(),
        heap.heap_info(report.caps)
    );
}
