//! Instance identity and the live-instance arena
//!
//! Every tracked container owns an [`InstanceRef`]: a shared identity record
//! that carries the frozen/internal markers and the set-once agent slot.
//! The owning [`crate::Monitor`] keeps a weak index of all records so
//! `inject` can find every instance that is still alive.

use crate::agent::InstrumentationAgent;
use crate::monitor::Monitor;
use crate::tracked::{MutatingOp, TrackedType};
use parking_lot::Mutex;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a tracked container instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct InstanceCore {
    id: InstanceId,
    kind: TrackedType,
    internal: bool,
    frozen: AtomicBool,
    agent: OnceLock<Arc<InstrumentationAgent>>,
    monitor: Weak<Monitor>,
}

/// Shared reference to a tracked instance's identity record
///
/// Offender entries hold the responsible instance through this handle.
/// Comparisons are by identity, never by container contents.
#[derive(Clone)]
pub struct InstanceRef(Arc<InstanceCore>);

impl InstanceRef {
    pub(crate) fn new(kind: TrackedType, internal: bool, monitor: Weak<Monitor>) -> Self {
        Self(Arc::new(InstanceCore {
            id: InstanceId::next(),
            kind,
            internal,
            frozen: AtomicBool::new(false),
            agent: OnceLock::new(),
            monitor,
        }))
    }

    /// Monitor the instance was registered in, if it still exists
    #[must_use]
    pub fn monitor(&self) -> Option<Arc<Monitor>> {
        self.0.monitor.upgrade()
    }

    /// Instance identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    /// Container kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TrackedType {
        self.0.kind
    }

    /// Whether the instance has been frozen
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.0.frozen.load(Ordering::Acquire)
    }

    /// Whether the instance is part of racewatch's own bookkeeping
    #[inline]
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.0.internal
    }

    /// Whether an agent has been attached
    #[inline]
    #[must_use]
    pub fn is_instrumented(&self) -> bool {
        self.0.agent.get().is_some()
    }

    /// Identity comparison
    #[inline]
    #[must_use]
    pub fn same_instance(&self, other: &InstanceRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn freeze(&self) {
        self.0.frozen.store(true, Ordering::Release);
    }

    /// Attach an agent. Returns false if one was already attached.
    pub(crate) fn attach(&self, agent: &Arc<InstrumentationAgent>) -> bool {
        self.0.agent.set(Arc::clone(agent)).is_ok()
    }

    fn downgrade(&self) -> Weak<InstanceCore> {
        Arc::downgrade(&self.0)
    }

    /// Entry point of every intercepted operation
    #[inline]
    pub(crate) fn intercept(&self, op: MutatingOp, location: &'static Location<'static>) {
        if let Some(agent) = self.0.agent.get() {
            agent.observe(self, op, location);
        }
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRef")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("frozen", &self.is_frozen())
            .field("internal", &self.is_internal())
            .field("instrumented", &self.is_instrumented())
            .finish()
    }
}

impl PartialEq for InstanceRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for InstanceRef {}

/// Weak per-type index of every instance created in a monitor
#[derive(Default)]
pub(crate) struct LiveInstances {
    slots: [Mutex<Vec<Weak<InstanceCore>>>; 3],
}

impl LiveInstances {
    pub(crate) fn register(&self, instance: &InstanceRef) {
        let mut slot = self.slots[instance.kind().index()].lock();
        // Compact before the vector would reallocate
        if slot.len() == slot.capacity() && !slot.is_empty() {
            slot.retain(|weak| weak.strong_count() > 0);
        }
        slot.push(instance.downgrade());
    }

    /// Live instances of `kind` at the time of the call
    pub(crate) fn snapshot(&self, kind: TrackedType) -> Vec<InstanceRef> {
        self.slots[kind.index()]
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(InstanceRef)
            .collect()
    }

    /// Drop index entries of dead instances. Returns how many were removed.
    pub(crate) fn sweep(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| {
                let mut slot = slot.lock();
                let before = slot.len();
                slot.retain(|weak| weak.strong_count() > 0);
                before - slot.len()
            })
            .sum()
    }
}
