//! Instrumentation agent
//!
//! An agent is attached to individual instances by [`crate::Watcher::inject`].
//! Attached instances route every intercepted operation through
//! [`InstrumentationAgent::observe`] before performing it.

use crate::call_site::CallSiteKey;
use crate::instance::InstanceRef;
use crate::monitor::Monitor;
use crate::tracked::{MutatingOp, TrackedType};
use std::collections::HashSet;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Per-type interception capability
pub struct InstrumentationAgent {
    kind: TrackedType,
    ops: HashSet<MutatingOp>,
    monitor: Arc<Monitor>,
}

impl InstrumentationAgent {
    /// Agent intercepting every mutating operation of `kind`
    #[must_use]
    pub fn new(kind: TrackedType, monitor: Arc<Monitor>) -> Self {
        Self {
            kind,
            ops: kind.mutating_ops().iter().copied().collect(),
            monitor,
        }
    }

    /// Tracked type this agent instruments
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TrackedType {
        self.kind
    }

    /// Whether `op` is intercepted by this agent
    #[inline]
    #[must_use]
    pub fn covers(&self, op: MutatingOp) -> bool {
        self.ops.contains(&op)
    }

    /// Record an attempted mutation if the monitor is watching
    ///
    /// Returns whether a registry write was attempted. Never alters the
    /// operation that follows.
    pub(crate) fn observe(
        &self,
        instance: &InstanceRef,
        op: MutatingOp,
        location: &'static Location<'static>,
    ) -> bool {
        if !self.monitor.is_watching() || !self.covers(op) {
            return false;
        }

        let key = CallSiteKey::from_location(location);
        let capture = self.monitor.stack_capture();
        self.monitor
            .registry()
            .record(self.kind, key, op, instance, || capture.capture());
        true
    }
}

impl fmt::Debug for InstrumentationAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationAgent")
            .field("kind", &self.kind)
            .field("ops", &self.ops.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::Location;

    #[test]
    fn covers_only_its_type_ops() {
        let agent = InstrumentationAgent::new(TrackedType::Set, Monitor::new());
        assert!(agent.covers(MutatingOp::Take));
        assert!(!agent.covers(MutatingOp::Push));
    }

    #[test]
    fn observe_is_inert_when_not_watching() {
        let monitor = Monitor::new();
        let agent = InstrumentationAgent::new(TrackedType::Map, Arc::clone(&monitor));
        let instance = InstanceRef::new(TrackedType::Map, false, std::sync::Weak::new());

        assert!(!agent.observe(&instance, MutatingOp::Insert, Location::caller()));
        assert_eq!(monitor.registry().write_attempts(), 0);
        assert!(monitor.registry().is_empty(TrackedType::Map));
    }

    #[test]
    fn observe_records_while_watching() {
        let monitor = Monitor::new();
        let agent = InstrumentationAgent::new(TrackedType::Map, Arc::clone(&monitor));
        let instance = InstanceRef::new(TrackedType::Map, false, std::sync::Weak::new());

        monitor.arm().unwrap();
        assert!(agent.observe(&instance, MutatingOp::Insert, Location::caller()));
        monitor.disarm();

        assert_eq!(monitor.registry().len(TrackedType::Map), 1);
    }
}
