//! Capability bit masks for pool selection.
//!
//! A `Caps` value names the properties an allocation must have; the heap
//! serves it from a pool that provides every requested flag. Flag values
//! match the ESP-IDF `MALLOC_CAP_*` constants so masks round-trip through
//! logs unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Capability mask selecting which memory pool(s) may serve an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caps(u32);

impl Caps {
    /// Memory must be able to hold executable code.
    pub const EXEC: Caps = Caps(1 << 0);
    /// Memory must allow aligned 32-bit word access.
    pub const CAP_32BIT: Caps = Caps(1 << 1);
    /// Memory must allow byte-level access.
    pub const CAP_8BIT: Caps = Caps(1 << 2);
    /// Memory must be usable for DMA transfers.
    pub const DMA: Caps = Caps(1 << 3);
    /// Memory mapped to protection domain 2.
    pub const PID2: Caps = Caps(1 << 4);
    /// Memory mapped to protection domain 3.
    pub const PID3: Caps = Caps(1 << 5);
    /// Memory mapped to protection domain 4.
    pub const PID4: Caps = Caps(1 << 6);
    /// Memory mapped to protection domain 5.
    pub const PID5: Caps = Caps(1 << 7);
    /// Memory mapped to protection domain 6.
    pub const PID6: Caps = Caps(1 << 8);
    /// Memory mapped to protection domain 7.
    pub const PID7: Caps = Caps(1 << 9);
    /// External SPI RAM.
    pub const SPIRAM: Caps = Caps(1 << 10);
    /// Internal RAM (usable when external RAM is offline).
    pub const INTERNAL: Caps = Caps(1 << 11);
    /// Default pool, safe to hand to `malloc`-style callers.
    pub const DEFAULT: Caps = Caps(1 << 12);
    /// Instruction RAM exposed with byte access.
    pub const IRAM_8BIT: Caps = Caps(1 << 13);
    /// Retention RAM that survives deep sleep.
    pub const RETENTION: Caps = Caps(1 << 14);

    /// Empty mask (matches any pool; selects none specifically).
    pub const NONE: Caps = Caps(0);

    /// Construct from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Caps(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every flag in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Caps) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if `self` and `other` share at least one flag.
    #[must_use]
    pub const fn intersects(self, other: Caps) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Human-readable name of the highest-priority flag in the mask.
    ///
    /// Priority order follows the original capability-name table: EXEC
    /// first, then access width, DMA, protection domains, SPIRAM, INTERNAL,
    /// DEFAULT. A mask with no recognized flag reports `"unknown"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        if self.intersects(Caps::EXEC) {
            "MALLOC_CAP_EXEC"
        } else if self.intersects(Caps::CAP_32BIT) {
            "MALLOC_CAP_32BIT"
        } else if self.intersects(Caps::CAP_8BIT) {
            "MALLOC_CAP_8BIT"
        } else if self.intersects(Caps::DMA) {
            "MALLOC_CAP_DMA"
        } else if self.intersects(Caps::PID2) {
            "MALLOC_CAP_PID2"
        } else if self.intersects(Caps::PID3) {
            "MALLOC_CAP_PID3"
        } else if self.intersects(Caps::PID4) {
            "MALLOC_CAP_PID4"
        } else if self.intersects(Caps::PID5) {
            "MALLOC_CAP_PID5"
        } else if self.intersects(Caps::PID6) {
            "MALLOC_CAP_PID6"
        } else if self.intersects(Caps::PID7) {
            "MALLOC_CAP_PID7"
        } else if self.intersects(Caps::SPIRAM) {
            "MALLOC_CAP_SPIRAM"
        } else if self.intersects(Caps::INTERNAL) {
            "MALLOC_CAP_INTERNAL"
        } else if self.intersects(Caps::DEFAULT) {
            "MALLOC_CAP_DEFAULT"
        } else {
            "unknown"
        }
    }
}

impl BitOr for Caps {
    type Output = Caps;

    fn bitor(self, rhs: Caps) -> Caps {
        Caps(self.0 | rhs.0)
    }
}

impl BitOrAssign for Caps {
    fn bitor_assign(&mut self, rhs: Caps) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_and_union() {
        let m = Caps::CAP_8BIT | Caps::INTERNAL;
        assert!(m.contains(Caps::CAP_8BIT));
        assert!(m.contains(Caps::INTERNAL));
        assert!(!m.contains(Caps::SPIRAM));
        assert!(m.contains(Caps::CAP_8BIT | Caps::INTERNAL));
    }

    #[test]
    fn name_uses_priority_order() {
        assert_eq!((Caps::EXEC | Caps::SPIRAM).name(), "MALLOC_CAP_EXEC");
        assert_eq!((Caps::CAP_8BIT | Caps::DMA).name(), "MALLOC_CAP_8BIT");
        assert_eq!(Caps::SPIRAM.name(), "MALLOC_CAP_SPIRAM");
        assert_eq!(Caps::NONE.name(), "unknown");
        assert_eq!(Caps::RETENTION.name(), "unknown");
    }

    #[test]
    fn bits_round_trip() {
        let m = Caps::DMA | Caps::DEFAULT;
        assert_eq!(Caps::from_bits(m.bits()), m);
    }

    #[test]
    fn json_round_trips_as_raw_bits() {
        let m = Caps::SPIRAM | Caps::CAP_8BIT;
        let json = serde_json::to_string(&m).expect("serialize");
        assert_eq!(json, m.bits().to_string());
        let back: Caps = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, m);
    }
}
