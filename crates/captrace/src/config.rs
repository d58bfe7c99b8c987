//! Tracker configuration.
//!
//! Tracking is debug instrumentation; whether it is active is decided at
//! tracker construction, either programmatically or from the environment:
//!
//! - `CAPTRACE_TRACKING`: `on`/`off` (loose, case-insensitive). Default on.
//! - `CAPTRACE_MAX_ENTRIES`: registry entry cap. Default 4096.
//!
//! The tracking flag can also be flipped at runtime through the registry;
//! that is a benign race by design — it only gates whether bookkeeping
//! happens, never the correctness of the underlying memory.

use std::time::Duration;

/// Default registry entry cap.
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Default diagnostic pause after a registry growth failure.
pub const DEFAULT_STALL_PAUSE: Duration = Duration::from_millis(100);

/// Construction-time settings for a [`crate::TracedHeap`].
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Whether allocations are registered at all.
    pub enabled: bool,
    /// Upper bound on live registry entries; exceeding it takes the same
    /// fail-open path as a failed storage growth.
    pub max_entries: usize,
    /// How long the registry stalls (under its lock) after a growth
    /// failure, so the fatal-resource log is visible before the untracked
    /// allocation proceeds.
    pub stall_pause: Duration,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            stall_pause: DEFAULT_STALL_PAUSE,
        }
    }
}

impl TracerConfig {
    /// Read configuration from `CAPTRACE_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var("CAPTRACE_TRACKING") {
            cfg.enabled = parse_flag(&raw).unwrap_or(cfg.enabled);
        }
        if let Ok(raw) = std::env::var("CAPTRACE_MAX_ENTRIES") {
            cfg.max_entries = raw.trim().parse().unwrap_or(cfg.max_entries);
        }
        cfg
    }

    /// Override the tracking flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the registry entry cap.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Override the growth-failure pause (tests set this to zero).
    #[must_use]
    pub fn with_stall_pause(mut self, pause: Duration) -> Self {
        self.stall_pause = pause;
        self
    }
}

/// Parse a boolean flag loosely (case-insensitive).
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_tracking_on() {
        let cfg = TracerConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(cfg.stall_pause, DEFAULT_STALL_PAUSE);
    }

    #[test]
    fn flag_parsing_is_loose() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag(" yes "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("Off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn builder_overrides() {
        let cfg = TracerConfig::default()
            .with_enabled(false)
            .with_max_entries(2)
            .with_stall_pause(Duration::ZERO);
        assert!(!cfg.enabled);
        assert_eq!(cfg.max_entries, 2);
        assert_eq!(cfg.stall_pause, Duration::ZERO);
    }
}
