//! Shared fixtures for the watch cycle tests
#![allow(dead_code)]

pub mod site_a;

use racewatch_core::{MemorySink, Monitor, Watcher};
use std::sync::Arc;

/// Isolated monitor with one watcher per tracked type, all writing to memory
pub struct Fixture {
    pub monitor: Arc<Monitor>,
    pub watchers: Vec<Watcher>,
    pub sink: Arc<MemorySink>,
}

impl Fixture {
    pub fn new() -> Self {
        let monitor = Monitor::new();
        let sink = Arc::new(MemorySink::new());
        let watchers = Watcher::for_all_types(&monitor, sink.clone());
        Self {
            monitor,
            watchers,
            sink,
        }
    }
}
