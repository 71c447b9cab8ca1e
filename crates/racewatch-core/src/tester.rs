//! Tester: one watch cycle around a unit of work
//!
//! ```text
//!   IDLE --setup--> WATCHING --report--> IDLE
//! ```
//!
//! `setup` sweeps the live arena, injects every watcher and raises the flag.
//! `report` lowers the flag and drains every watcher. `report` runs from a
//! drop guard, so it also runs when the unit of work returns early through
//! `?` or unwinds.

use crate::error::{WatchError, WatchResult};
use crate::instance::InstanceId;
use crate::monitor::Monitor;
use crate::report::CycleReport;
use crate::tracked::TrackedType;
use crate::watcher::Watcher;
use std::collections::HashSet;
use std::sync::Arc;

/// Tester lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesterState {
    /// No cycle armed
    Idle,
    /// Flag raised, unit of work running
    Watching,
}

/// Orchestrates one watch cycle over a set of watchers
#[derive(Debug)]
pub struct Tester<'w> {
    monitor: Arc<Monitor>,
    watchers: &'w [Watcher],
    ignore: HashSet<InstanceId>,
    state: TesterState,
    injected: usize,
    last_report: Option<CycleReport>,
}

impl<'w> Tester<'w> {
    /// Tester over `watchers` that never reports the instances in `ignore`
    #[must_use]
    pub fn new<I>(monitor: &Arc<Monitor>, watchers: &'w [Watcher], ignore: I) -> Self
    where
        I: IntoIterator<Item = InstanceId>,
    {
        Self {
            monitor: Arc::clone(monitor),
            watchers,
            ignore: ignore.into_iter().collect(),
            state: TesterState::Idle,
            injected: 0,
            last_report: None,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> TesterState {
        self.state
    }

    /// Report of the most recent cycle
    #[must_use]
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Take the report of the most recent cycle
    pub fn take_report(&mut self) -> Option<CycleReport> {
        self.last_report.take()
    }

    /// Run `unit_of_work` inside a watch cycle
    ///
    /// The unit's return value (including any `Err`) is passed through
    /// unchanged, and a panic resumes after teardown. If another cycle is
    /// already armed on the monitor the unit runs unwatched.
    pub fn watch<F, R>(&mut self, unit_of_work: F) -> R
    where
        F: FnOnce() -> R,
    {
        match self.setup() {
            Ok(()) => self.run_armed(unit_of_work),
            Err(err) => {
                tracing::warn!(error = %err, "running unit of work unwatched");
                unit_of_work()
            }
        }
    }

    /// Like [`Tester::watch`], but refuses to run unwatched
    ///
    /// # Errors
    /// `WatchError::AlreadyWatching` if another cycle is armed on the monitor;
    /// the unit of work is not run.
    pub fn try_watch<F, R>(&mut self, unit_of_work: F) -> WatchResult<R>
    where
        F: FnOnce() -> R,
    {
        self.setup()?;
        Ok(self.run_armed(unit_of_work))
    }

    fn run_armed<F, R>(&mut self, unit_of_work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let teardown = Teardown { tester: self };
        let output = unit_of_work();
        drop(teardown);
        output
    }

    fn setup(&mut self) -> WatchResult<()> {
        // A nested cycle must not instrument instances the open cycle skipped
        if self.monitor.is_watching() {
            return Err(WatchError::AlreadyWatching);
        }
        let swept = self.monitor.sweep();
        self.injected = self.watchers.iter().map(Watcher::inject).sum();
        self.monitor.arm()?;
        self.state = TesterState::Watching;
        tracing::debug!(swept, injected = self.injected, "watch cycle started");
        Ok(())
    }

    fn report(&mut self) {
        self.monitor.disarm();
        self.state = TesterState::Idle;

        let ignore = &self.ignore;
        let watchers: Vec<_> = self
            .watchers
            .iter()
            .map(|watcher| watcher.report_offenders(|instance| ignore.contains(&instance.id())))
            .collect();

        // Slots without a watcher are still cleared
        for kind in TrackedType::ALL {
            if !self.watchers.iter().any(|w| w.kind() == kind) {
                self.monitor.registry().drain(kind);
            }
        }

        let report = CycleReport {
            watchers,
            injected: self.injected,
        };
        tracing::debug!(emitted = report.emitted_count(), "watch cycle finished");
        self.last_report = Some(report);
    }
}

/// Runs `report` when dropped
struct Teardown<'t, 'w> {
    tester: &'t mut Tester<'w>,
}

impl Drop for Teardown<'_, '_> {
    fn drop(&mut self) {
        self.tester.report();
    }
}
