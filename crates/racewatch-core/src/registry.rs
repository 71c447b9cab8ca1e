//! Offender registry
//!
//! One slot per [`TrackedType`], each mapping [`CallSiteKey`] to the first
//! [`OffenderEntry`] observed there during the current cycle.
//!
//! Writers never block each other on a single lock: the slots are sharded
//! `DashMap`s and the shard lock covers only the insert, never the container
//! operation being observed. Concurrent first writes to a fresh call site
//! collapse onto one entry.
//!
//! Entries carry the cycle generation they were recorded in. A write that
//! passed the watching check just before teardown can land after the slot
//! was drained; it is stamped with the finished generation and discarded by
//! the next drain instead of being blamed on the next cycle.

use crate::call_site::CallSiteKey;
use crate::instance::InstanceRef;
use crate::tracked::{MutatingOp, TrackedType};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicU64, Ordering};

/// A recorded mutation attempt
#[derive(Debug)]
pub struct OffenderEntry {
    /// Where the mutation was attempted
    pub call_site: CallSiteKey,
    /// The instance that was mutated
    pub responsible: InstanceRef,
    /// Stack at the first attempt
    pub stack: Backtrace,
    /// Operation that fired
    pub op: MutatingOp,
    /// Name of the mutating thread, if it has one
    pub thread: Option<String>,
    /// Registry-wide attempt number of the first attempt
    pub sequence: u64,
    /// Cycle generation the entry was recorded in
    pub generation: u64,
}

/// Per-type first-write-wins offender map
#[derive(Debug, Default)]
pub struct OffenderRegistry {
    slots: [DashMap<CallSiteKey, OffenderEntry>; 3],
    sources: DashSet<&'static str>,
    write_attempts: AtomicU64,
    generation: AtomicU64,
}

impl OffenderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle generation; returns it
    pub(crate) fn begin_cycle(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current cycle generation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Record an attempt unless the call site already has an entry
    ///
    /// `capture` runs only when the call site is new in this generation. An
    /// entry left over from an earlier generation is replaced. Returns
    /// whether a new entry was stored.
    pub fn record<F>(
        &self,
        kind: TrackedType,
        call_site: CallSiteKey,
        op: MutatingOp,
        responsible: &InstanceRef,
        capture: F,
    ) -> bool
    where
        F: FnOnce() -> Backtrace,
    {
        let sequence = self.write_attempts.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation();
        let slot = &self.slots[kind.index()];
        if slot
            .get(&call_site)
            .is_some_and(|entry| entry.generation == generation)
        {
            return false;
        }

        // Capture outside the shard lock; a lost race only wastes the capture
        let entry = OffenderEntry {
            call_site,
            responsible: responsible.clone(),
            stack: capture(),
            op,
            thread: std::thread::current().name().map(str::to_string),
            sequence,
            generation,
        };
        let stored = match slot.entry(call_site) {
            Entry::Occupied(occupied) if occupied.get().generation == generation => false,
            Entry::Occupied(mut stale) => {
                stale.insert(entry);
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        };
        if stored {
            self.sources.insert(call_site.file());
        }
        stored
    }

    /// Remove and return every entry for `kind` from the current
    /// generation, oldest first
    ///
    /// Entries from earlier generations are removed and dropped.
    pub fn drain(&self, kind: TrackedType) -> Vec<OffenderEntry> {
        let generation = self.generation();
        let slot = &self.slots[kind.index()];
        let keys: Vec<CallSiteKey> = slot.iter().map(|entry| *entry.key()).collect();
        let (mut entries, stale): (Vec<OffenderEntry>, Vec<OffenderEntry>) = keys
            .into_iter()
            .filter_map(|key| slot.remove(&key).map(|(_, entry)| entry))
            .partition(|entry| entry.generation == generation);
        // Anything inserted between collecting keys and removing them
        slot.clear();
        if !stale.is_empty() {
            tracing::debug!(%kind, stale = stale.len(), "dropped entries from an earlier cycle");
        }
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    /// Whether the slot for `kind` holds an entry for `call_site`
    #[must_use]
    pub fn contains(&self, kind: TrackedType, call_site: &CallSiteKey) -> bool {
        self.slots[kind.index()].contains_key(call_site)
    }

    /// Number of entries for `kind`
    #[must_use]
    pub fn len(&self, kind: TrackedType) -> usize {
        self.slots[kind.index()].len()
    }

    /// Whether the slot for `kind` is empty
    #[must_use]
    pub fn is_empty(&self, kind: TrackedType) -> bool {
        self.slots[kind.index()].is_empty()
    }

    /// Total write attempts since the registry was created
    #[must_use]
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::Relaxed)
    }

    /// Source files of every call site ever recorded
    ///
    /// This is the set of "known" files whitelist rules resolve against.
    #[must_use]
    pub fn known_sources(&self) -> Vec<&'static str> {
        let mut files: Vec<&'static str> = self.sources.iter().map(|f| *f).collect();
        files.sort_unstable();
        files
    }
}
