//! Watcher: injection and reporting for one tracked type

use crate::agent::InstrumentationAgent;
use crate::instance::InstanceRef;
use crate::monitor::Monitor;
use crate::report::{Diagnostic, ReportSink, StdoutSink, WatcherReport};
use crate::tracked::TrackedType;
use crate::whitelist::Whitelist;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Owns the agent and whitelist for one [`TrackedType`]
pub struct Watcher {
    kind: TrackedType,
    agent: Arc<InstrumentationAgent>,
    monitor: Arc<Monitor>,
    whitelist: Mutex<Whitelist>,
    sink: Arc<dyn ReportSink>,
}

impl Watcher {
    /// Watcher reporting to standard output
    #[must_use]
    pub fn new(kind: TrackedType, monitor: &Arc<Monitor>) -> Self {
        Self::with_sink(kind, monitor, Arc::new(StdoutSink))
    }

    /// Watcher reporting to `sink`
    #[must_use]
    pub fn with_sink(kind: TrackedType, monitor: &Arc<Monitor>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            kind,
            agent: Arc::new(InstrumentationAgent::new(kind, Arc::clone(monitor))),
            monitor: Arc::clone(monitor),
            whitelist: Mutex::new(Whitelist::new_in(monitor)),
            sink,
        }
    }

    /// One watcher per tracked type, all sharing `sink`
    #[must_use]
    pub fn for_all_types(monitor: &Arc<Monitor>, sink: Arc<dyn ReportSink>) -> Vec<Watcher> {
        TrackedType::ALL
            .iter()
            .map(|&kind| Self::with_sink(kind, monitor, Arc::clone(&sink)))
            .collect()
    }

    /// Tracked type of this watcher
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TrackedType {
        self.kind
    }

    /// Monitor this watcher belongs to
    #[inline]
    #[must_use]
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Merge whitelist rules; never removes existing ones
    pub fn whitelist<I, S>(&self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist.lock().extend(rules);
    }

    /// Current whitelist rules
    #[must_use]
    pub fn whitelist_rules(&self) -> Vec<String> {
        self.whitelist.lock().rules().to_vec()
    }

    /// Attach the agent to every live, eligible instance
    ///
    /// Frozen instances, bookkeeping instances and instances that already
    /// carry an agent are left alone. Returns the number of instances newly
    /// instrumented.
    pub fn inject(&self) -> usize {
        let mut injected = 0;
        for instance in self.monitor.live_instances(self.kind) {
            if instance.is_frozen() || self.monitor.is_internal(instance.id()) {
                tracing::trace!(instance = %instance.id(), kind = %self.kind, "skipping instance");
                continue;
            }
            if instance.attach(&self.agent) {
                injected += 1;
            }
        }
        tracing::debug!(kind = %self.kind, injected, "agent injected");
        injected
    }

    /// Drain the registry slot and emit every entry that is not suppressed
    ///
    /// An entry is suppressed when its call site file is whitelisted, when
    /// the responsible instance is bookkeeping, or when `ignore` returns
    /// true for it. The slot is empty afterwards either way.
    pub fn report_offenders<F>(&self, ignore: F) -> WatcherReport
    where
        F: Fn(&InstanceRef) -> bool,
    {
        let entries = self.monitor.registry().drain(self.kind);
        let mut report = WatcherReport::empty(self.kind);
        if entries.is_empty() {
            return report;
        }

        let resolved = self
            .whitelist
            .lock()
            .resolve(&self.monitor.search_path(), &self.monitor.registry().known_sources());

        for entry in entries {
            if resolved.covers(entry.call_site.file()) {
                report.whitelisted += 1;
            } else if self.monitor.is_internal(entry.responsible.id()) {
                report.internal += 1;
            } else if ignore(&entry.responsible) {
                report.ignored += 1;
            } else {
                let diagnostic = Diagnostic {
                    kind: self.kind,
                    call_site: entry.call_site,
                    op: entry.op,
                    instance: entry.responsible.id(),
                };
                self.sink.emit(&diagnostic);
                report.emitted.push(diagnostic);
            }
        }

        tracing::trace!(
            kind = %self.kind,
            emitted = report.emitted.len(),
            whitelisted = report.whitelisted,
            internal = report.internal,
            ignored = report.ignored,
            "offenders reported"
        );
        report
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("kind", &self.kind)
            .field("whitelist", &self.whitelist_rules())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::CallSiteKey;
    use crate::collections::{Tracked, WatchedMap, WatchedSet, WatchedVec};
    use crate::report::MemorySink;
    use crate::tracked::MutatingOp;
    use std::backtrace::Backtrace;

    fn watcher(kind: TrackedType) -> (Arc<Monitor>, Watcher, Arc<MemorySink>) {
        let monitor = Monitor::new();
        let sink = Arc::new(MemorySink::new());
        let watcher = Watcher::with_sink(kind, &monitor, sink.clone());
        (monitor, watcher, sink)
    }

    #[test]
    fn inject_skips_frozen_and_already_instrumented() {
        let (monitor, watcher, _) = watcher(TrackedType::Set);
        let plain: WatchedSet<u8> = WatchedSet::new_in(&monitor);
        let frozen = WatchedSet::<u8>::new_in(&monitor).freeze();

        assert_eq!(watcher.inject(), 1);
        assert!(plain.instance().is_instrumented());
        assert!(!frozen.instance().is_instrumented());
        assert_eq!(watcher.inject(), 0);
    }

    #[test]
    fn inject_only_touches_own_type() {
        let (monitor, watcher, _) = watcher(TrackedType::Map);
        let seq: WatchedVec<u8> = WatchedVec::new_in(&monitor);
        let map: WatchedMap<u8, u8> = WatchedMap::new_in(&monitor);

        watcher.inject();
        assert!(map.instance().is_instrumented());
        assert!(!seq.instance().is_instrumented());
    }

    #[test]
    fn inject_skips_whitelist_storage() {
        let (monitor, watcher, _) = watcher(TrackedType::Sequence);
        watcher.inject();
        let stats = monitor.stats();
        let seq = stats.types.iter().find(|t| t.kind == TrackedType::Sequence).unwrap();
        assert_eq!(seq.internal, 1);
        assert_eq!(seq.instrumented, 0);
    }

    #[test]
    fn report_on_empty_registry_emits_nothing() {
        let (_monitor, watcher, sink) = watcher(TrackedType::Map);
        let report = watcher.report_offenders(|_| false);
        assert_eq!(report.drained(), 0);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn ignore_predicate_suppresses_by_identity() {
        let (monitor, watcher, sink) = watcher(TrackedType::Map);
        let mut ignored: WatchedMap<&str, u8> = WatchedMap::new_in(&monitor);
        let mut reported: WatchedMap<&str, u8> = WatchedMap::new_in(&monitor);
        watcher.inject();

        monitor.arm().unwrap();
        ignored.insert("a", 1);
        reported.insert("a", 1);
        monitor.disarm();

        let ignored_id = ignored.id();
        let report = watcher.report_offenders(|instance| instance.id() == ignored_id);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.emitted.len(), 1);
        assert_eq!(sink.diagnostics()[0].instance, reported.id());
        assert!(monitor.registry().is_empty(TrackedType::Map));
    }

    #[test]
    fn bookkeeping_entries_are_counted_not_emitted() {
        let (monitor, watcher, sink) = watcher(TrackedType::Sequence);
        let storage: WatchedVec<String> = WatchedVec::bookkeeping_in(&monitor);
        monitor.registry().record(
            TrackedType::Sequence,
            CallSiteKey::here(),
            MutatingOp::Push,
            storage.instance(),
            Backtrace::disabled,
        );

        let report = watcher.report_offenders(|_| false);
        assert_eq!(report.internal, 1);
        assert!(report.emitted.is_empty());
        assert!(sink.diagnostics().is_empty());
        assert!(monitor.registry().is_empty(TrackedType::Sequence));
    }

    #[test]
    fn whitelist_is_additive() {
        let (_monitor, watcher, _) = watcher(TrackedType::Map);
        watcher.whitelist(["src/a.rs"]);
        watcher.whitelist(["src/b.rs"]);
        assert_eq!(watcher.whitelist_rules(), vec!["src/a.rs", "src/b.rs"]);
    }
}
