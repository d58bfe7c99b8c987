//! Allocation metadata records.
//!
//! One [`AllocRecord`] exists per live tracked allocation. Records carry the
//! call-site provenance stamped by [`call_site!`] at the instrumented call,
//! plus an optional caller-supplied variable label.

use captrace_heap::Caps;
use serde::Serialize;
use std::fmt;

/// Label recorded when the caller did not supply one. No mechanism derives
/// the destination variable's name automatically.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Which facade operation created a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocMethod {
    /// Plain allocation.
    Alloc,
    /// Zero-initialized `count * size` allocation.
    AllocZeroed,
    /// Resize of an existing allocation.
    Realloc,
}

impl AllocMethod {
    /// Stable name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AllocMethod::Alloc => "alloc",
            AllocMethod::AllocZeroed => "alloc_zeroed",
            AllocMethod::Realloc => "realloc",
        }
    }
}

impl fmt::Display for AllocMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call-site provenance: file, line, and enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Source file of the instrumented call.
    pub file: &'static str,
    /// Line of the instrumented call.
    pub line: u32,
    /// Enclosing function path.
    pub function: &'static str,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.function)
    }
}

/// Capture the current call site as a [`CallSite`].
///
/// The function name is derived from the type name of a local item, so it
/// reports the full module path of the enclosing function.
#[macro_export]
macro_rules! call_site {
    () => {{
        fn here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(here);
        let name = name.strip_suffix("::here").unwrap_or(name);
        $crate::record::CallSite {
            file: file!(),
            line: line!(),
            function: name,
        }
    }};
}

/// Metadata for one live tracked allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocRecord {
    /// Block address; unique among live records.
    pub address: usize,
    /// Requested size in bytes.
    pub size: usize,
    /// Capability mask the block was requested with.
    pub caps: Caps,
    /// Which facade operation created the record.
    pub method: AllocMethod,
    /// Provenance of the creating call.
    pub site: CallSite,
    /// Caller-supplied variable label, [`UNKNOWN_LABEL`] by default.
    pub label: &'static str,
}

impl fmt::Display for AllocRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory allocated at 0x{:x}, caps {}, size {} bytes, in {}, line {}, function {}, variable {}",
            self.address, self.caps, self.size, self.site.file, self.site.line, self.site.function, self.label
        )
    }
}
