//! Monitor: the shared state behind watchers and tracked containers
//!
//! A [`Monitor`] owns the watching flag, the [`OffenderRegistry`], the
//! live-instance arena and the set of internal bookkeeping instances.
//! Containers created with `new()` attach to [`Monitor::global`]; `new_in`
//! constructors attach to an explicit monitor, which keeps independent
//! pipelines (and tests) from observing each other.

use crate::call_site::StackCapture;
use crate::error::{WatchError, WatchResult};
use crate::instance::{InstanceId, InstanceRef, LiveInstances};
use crate::registry::OffenderRegistry;
use crate::tracked::TrackedType;
use dashmap::DashSet;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static GLOBAL_MONITOR: Lazy<Arc<Monitor>> = Lazy::new(Monitor::new);

/// Shared watch state
pub struct Monitor {
    watching: AtomicBool,
    registry: OffenderRegistry,
    live: LiveInstances,
    internal: DashSet<InstanceId>,
    search_path: RwLock<Vec<PathBuf>>,
    capture: RwLock<StackCapture>,
}

impl Monitor {
    /// Create an isolated monitor
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            watching: AtomicBool::new(false),
            registry: OffenderRegistry::new(),
            live: LiveInstances::default(),
            internal: DashSet::new(),
            search_path: RwLock::new(vec![PathBuf::new()]),
            capture: RwLock::new(StackCapture::default()),
        })
    }

    /// Process-wide default monitor
    #[must_use]
    pub fn global() -> &'static Arc<Monitor> {
        &GLOBAL_MONITOR
    }

    /// Whether a watch cycle is currently armed
    #[inline]
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Acquire)
    }

    /// Raise the watching flag and start a new registry generation
    ///
    /// # Errors
    /// `WatchError::AlreadyWatching` if the flag is already up.
    pub(crate) fn arm(&self) -> WatchResult<()> {
        self.watching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WatchError::AlreadyWatching)?;
        self.registry.begin_cycle();
        Ok(())
    }

    /// Lower the watching flag
    pub(crate) fn disarm(&self) {
        self.watching.store(false, Ordering::Release);
    }

    /// The offender registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &OffenderRegistry {
        &self.registry
    }

    /// Register a new tracked instance
    pub(crate) fn track(self: &Arc<Self>, kind: TrackedType, internal: bool) -> InstanceRef {
        let instance = InstanceRef::new(kind, internal, Arc::downgrade(self));
        if internal {
            self.internal.insert(instance.id());
        }
        self.live.register(&instance);
        instance
    }

    /// Whether `id` belongs to one of racewatch's own bookkeeping containers
    #[inline]
    #[must_use]
    pub fn is_internal(&self, id: InstanceId) -> bool {
        self.internal.contains(&id)
    }

    /// Currently live instances of `kind`
    #[must_use]
    pub fn live_instances(&self, kind: TrackedType) -> Vec<InstanceRef> {
        self.live.snapshot(kind)
    }

    /// Drop arena entries of instances that no longer exist
    pub fn sweep(&self) -> usize {
        self.live.sweep()
    }

    /// Roots whitelist rules are joined against
    #[must_use]
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.search_path.read().clone()
    }

    /// Replace the search path
    pub fn set_search_path<I, P>(&self, roots: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        *self.search_path.write() = roots.into_iter().map(Into::into).collect();
    }

    /// Stack capture mode for new offender entries
    #[must_use]
    pub fn stack_capture(&self) -> StackCapture {
        *self.capture.read()
    }

    /// Set the stack capture mode
    pub fn set_stack_capture(&self, capture: StackCapture) {
        *self.capture.write() = capture;
    }

    /// Snapshot of instance and registry counters
    #[must_use]
    pub fn stats(&self) -> MonitorStats {
        let types = TrackedType::ALL
            .iter()
            .map(|&kind| {
                let live = self.live.snapshot(kind);
                TypeStats {
                    kind,
                    live: live.len(),
                    instrumented: live.iter().filter(|i| i.is_instrumented()).count(),
                    frozen: live.iter().filter(|i| i.is_frozen()).count(),
                    internal: live.iter().filter(|i| i.is_internal()).count(),
                    pending: self.registry.len(kind),
                }
            })
            .collect();

        MonitorStats {
            watching: self.is_watching(),
            write_attempts: self.registry.write_attempts(),
            types,
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("watching", &self.is_watching())
            .field("search_path", &*self.search_path.read())
            .field("capture", &self.stack_capture())
            .finish_non_exhaustive()
    }
}

/// Counters for one tracked type
#[derive(Debug, Clone, Serialize)]
pub struct TypeStats {
    /// Tracked type
    pub kind: TrackedType,
    /// Live instances
    pub live: usize,
    /// Live instances carrying an agent
    pub instrumented: usize,
    /// Live frozen instances
    pub frozen: usize,
    /// Live bookkeeping instances
    pub internal: usize,
    /// Offender entries waiting for the next report
    pub pending: usize,
}

/// Monitor-wide counters
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStats {
    /// Watching flag at snapshot time
    pub watching: bool,
    /// Registry write attempts since creation
    pub write_attempts: u64,
    /// Per-type counters
    pub types: Vec<TypeStats>,
}
