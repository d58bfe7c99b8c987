//! Registry error taxonomy.
//!
//! These errors never cross the allocation surface: the facade signals
//! failure through null/`None` returns only (no exception-style control
//! flow). They exist so the registry's fail-open path has a structured
//! message to log.

use std::collections::TryReserveError;
use thiserror::Error;

/// Why the tracking registry could not accept a record.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The configured entry cap was reached.
    #[error("tracking registry at capacity: {live} live records (limit {limit})")]
    Exhausted {
        /// Live records at the time of the attempt.
        live: usize,
        /// Configured entry limit.
        limit: usize,
    },
    /// The backing storage could not grow.
    #[error("tracking registry growth failed: {0}")]
    Growth(#[from] TryReserveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_names_limits() {
        let err = RegistryError::Exhausted { live: 7, limit: 7 };
        let msg = err.to_string();
        assert!(msg.contains("7 live records"));
        assert!(msg.contains("limit 7"));
    }
}
