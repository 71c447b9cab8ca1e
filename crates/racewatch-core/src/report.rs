//! Diagnostics and report sinks

use crate::call_site::CallSiteKey;
use crate::instance::InstanceId;
use crate::tracked::{MutatingOp, TrackedType};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

/// Prefix of every emitted diagnostic line
pub const DIAGNOSTIC_TAG: &str = "[THREAD_SAFETY]";

/// One reported offender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Tracked type that was mutated
    pub kind: TrackedType,
    /// Where the mutation happened
    pub call_site: CallSiteKey,
    /// First operation seen at the call site
    pub op: MutatingOp,
    /// Instance that was mutated
    pub instance: InstanceId,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{DIAGNOSTIC_TAG} Potential concurrent {} modification at: {}",
            self.kind, self.call_site
        )
    }
}

/// Destination for emitted diagnostics
pub trait ReportSink: Send + Sync {
    /// Emit one diagnostic
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Writes each diagnostic as a line on standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        // Runs during teardown, possibly while unwinding; a closed stdout is not fatal
        let _ = writeln!(io::stdout().lock(), "{diagnostic}");
    }
}

/// Keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lines.lock().clone()
    }

    /// Rendered lines emitted so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(ToString::to_string).collect()
    }

    /// Remove and return everything emitted so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.lines.lock().push(diagnostic.clone());
    }
}

/// Outcome of one watcher's report
#[derive(Debug, Clone, Serialize)]
pub struct WatcherReport {
    /// Tracked type of the watcher
    pub kind: TrackedType,
    /// Diagnostics emitted, in first-attempt order
    #[serde(serialize_with = "serialize_lines")]
    pub emitted: Vec<Diagnostic>,
    /// Entries dropped because their file is whitelisted
    pub whitelisted: usize,
    /// Entries dropped because the instance is bookkeeping
    pub internal: usize,
    /// Entries dropped by the ignore predicate
    pub ignored: usize,
}

impl WatcherReport {
    pub(crate) fn empty(kind: TrackedType) -> Self {
        Self {
            kind,
            emitted: Vec::new(),
            whitelisted: 0,
            internal: 0,
            ignored: 0,
        }
    }

    /// Entries drained, emitted or not
    #[must_use]
    pub fn drained(&self) -> usize {
        self.emitted.len() + self.whitelisted + self.internal + self.ignored
    }
}

/// Outcome of one watch cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// One report per watcher
    pub watchers: Vec<WatcherReport>,
    /// Instances newly instrumented during setup
    pub injected: usize,
}

impl CycleReport {
    /// Every diagnostic emitted in the cycle
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.watchers.iter().flat_map(|w| w.emitted.iter())
    }

    /// Number of diagnostics emitted in the cycle
    #[must_use]
    pub fn emitted_count(&self) -> usize {
        self.watchers.iter().map(|w| w.emitted.len()).sum()
    }

    /// Whether the cycle emitted nothing
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.emitted_count() == 0
    }
}

fn serialize_lines<S>(emitted: &[Diagnostic], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(emitted.iter().map(ToString::to_string))
}
