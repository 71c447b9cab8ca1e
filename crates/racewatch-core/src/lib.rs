//! racewatch core - shared-mutation detection for container values
//!
//! Flags code that mutates a shared map, sequence or set while a unit of
//! work (typically one request) is being processed:
//! - Containers register in a per-monitor arena when constructed
//! - Watchers inject an instrumentation agent into every eligible instance
//! - Mutations during a watch cycle land in an offender registry keyed by call site
//! - After the cycle, each watcher drains its slot and emits one diagnostic per site
//!
//! # Example
//!
//! ```rust
//! use racewatch_core::{MemorySink, Monitor, Tester, TrackedType, WatchedMap, Watcher};
//! use std::sync::Arc;
//!
//! let monitor = Monitor::new();
//! let mut shared: WatchedMap<String, u32> = WatchedMap::new_in(&monitor);
//!
//! let sink = Arc::new(MemorySink::new());
//! let watchers = Watcher::for_all_types(&monitor, sink.clone());
//! let mut tester = Tester::new(&monitor, &watchers, []);
//!
//! tester.watch(|| {
//!     shared.insert("hits".to_string(), 1);
//! });
//!
//! assert_eq!(sink.diagnostics().len(), 1);
//! assert_eq!(sink.diagnostics()[0].kind, TrackedType::Map);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod agent;
pub mod call_site;
pub mod collections;
pub mod error;
pub mod instance;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod tester;
pub mod tracked;
pub mod watcher;
pub mod whitelist;

// Re-exports for convenience
pub use agent::InstrumentationAgent;
pub use call_site::{CallSiteKey, StackCapture};
pub use collections::{Frozen, Tracked, WatchedMap, WatchedSet, WatchedVec};
pub use error::{WatchError, WatchResult};
pub use instance::{InstanceId, InstanceRef};
pub use monitor::{Monitor, MonitorStats, TypeStats};
pub use registry::{OffenderEntry, OffenderRegistry};
pub use report::{
    CycleReport, Diagnostic, MemorySink, ReportSink, StdoutSink, WatcherReport, DIAGNOSTIC_TAG,
};
pub use tester::{Tester, TesterState};
pub use tracked::{MutatingOp, TrackedType};
pub use watcher::Watcher;
pub use whitelist::{ResolvedWhitelist, Whitelist};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for instrumenting containers and running watch cycles
    pub use crate::{
        Monitor, Tester, Tracked, TrackedType, WatchedMap, WatchedSet, WatchedVec, Watcher,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
