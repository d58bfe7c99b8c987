//! The allocation registry: a per-tracker store of live allocation records.
//!
//! A single `parking_lot::Mutex` serializes every mutation and enumeration,
//! so concurrent callers never observe a half-shifted or partially-grown
//! backing store. The lock wraps registry bookkeeping only — the heap's own
//! allocate/free calls happen outside it, except for the zero pass in
//! [`AllocRegistry::clear`], where the block size must be read atomically
//! with the overwrite.
//!
//! Failure policy is fail-open: if the registry itself cannot grow, the
//! triggering allocation is never rolled back. Tracking fidelity is
//! sacrificed before caller-visible correctness.

#![allow(unsafe_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::config::TracerConfig;
use crate::error::RegistryError;
use crate::record::AllocRecord;

/// Registry of currently live tracked allocations.
pub struct AllocRegistry {
    /// Live records, insertion-ordered. Count and storage are one thing:
    /// `Vec::len` is the record count the spec keeps separately.
    records: Mutex<Vec<AllocRecord>>,
    /// Global tracking gate. Read unsynchronized by design; flipping it
    /// mid-run only changes whether bookkeeping happens.
    enabled: AtomicBool,
    /// Entry cap; reaching it takes the growth-failure path.
    max_entries: usize,
    /// Diagnostic pause after a growth failure.
    stall_pause: Duration,
    /// Growth failures observed so far.
    stalls: AtomicU64,
}

impl AllocRegistry {
    /// Build a registry from tracker configuration.
    #[must_use]
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(config.enabled),
            max_entries: config.max_entries,
            stall_pause: config.stall_pause,
            stalls: AtomicU64::new(0),
        }
    }

    /// Whether tracking is active.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Toggle tracking. Affects subsequent operations only; records already
    /// present stay until removed.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Number of live records. Zero while tracking is disabled, so the
    /// count always matches what [`AllocRegistry::snapshot`] enumerates.
    #[must_use]
    pub fn len(&self) -> usize {
        if !self.enabled() {
            return 0;
        }
        self.records.lock().len()
    }

    /// True when no records are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Growth failures observed so far.
    #[must_use]
    pub fn stalls(&self) -> u64 {
        self.stalls.load(Ordering::Relaxed)
    }

    /// Register a new live allocation. No-op when tracking is disabled.
    ///
    /// If the backing storage cannot grow (or the entry cap is reached),
    /// the failure is logged, the registry stalls for the configured pause,
    /// and the record is dropped — the allocation it describes stays valid,
    /// merely untracked.
    pub fn insert(&self, record: AllocRecord) {
        if !self.enabled() {
            return;
        }
        let mut records = self.records.lock();
        let grown = if records.len() >= self.max_entries {
            Err(RegistryError::Exhausted {
                live: records.len(),
                limit: self.max_entries,
            })
        } else {
            records.try_reserve(1).map_err(RegistryError::from)
        };
        if let Err(err) = grown {
            self.stalls.fetch_add(1, Ordering::Relaxed);
            eprintln!("captrace: {err}; allocation stays live but untracked");
            // Pause under the lock so the message lands before any
            // interleaved registry traffic continues.
            std::thread::sleep(self.stall_pause);
            return;
        }
        records.push(record);
    }

    /// Remove the record for `addr`, returning it. Silent no-op (returning
    /// `None`) when tracking is disabled, `addr` is null, or no record
    /// matches.
    ///
    /// Removal shifts later entries down, preserving their relative order,
    /// then shrinks the backing storage — released entirely once the last
    /// record is gone.
    pub fn remove(&self, addr: usize) -> Option<AllocRecord> {
        if addr == 0 || !self.enabled() {
            return None;
        }
        let mut records = self.records.lock();
        let idx = records.iter().position(|r| r.address == addr)?;
        let removed = records.remove(idx);
        if records.is_empty() {
            *records = Vec::new();
        } else {
            records.shrink_to_fit();
        }
        Some(removed)
    }

    /// Refresh the recorded size for a live record (resize that did not
    /// relocate). Returns whether a record was updated.
    pub fn update_size(&self, addr: usize, new_size: usize) -> bool {
        if addr == 0 || !self.enabled() {
            return false;
        }
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.address == addr) {
            Some(r) => {
                r.size = new_size;
                true
            }
            None => false,
        }
    }

    /// Consistent copy of all live records. Empty when tracking is disabled.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AllocRecord> {
        if !self.enabled() {
            return Vec::new();
        }
        self.records.lock().clone()
    }

    /// Zero the block at `addr` if its size is known, then remove its
    /// record. The zero pass runs under the lock so the size cannot change
    /// between lookup and overwrite; removal re-acquires the lock.
    ///
    /// This is a single best-effort pass, not a multi-pass secure wipe.
    ///
    /// # Safety
    ///
    /// If a record exists for `addr`, the block must still be live and at
    /// least `record.size` bytes long.
    pub unsafe fn clear(&self, addr: usize) {
        if addr == 0 || !self.enabled() {
            return;
        }
        {
            let records = self.records.lock();
            if let Some(r) = records.iter().find(|r| r.address == addr) {
                // SAFETY: caller guarantees the tracked block is live and
                // spans `r.size` bytes.
                unsafe { std::ptr::write_bytes(addr as *mut u8, 0, r.size) };
            }
        }
        self.remove(addr);
    }
}
