//! Testing utilities for the racewatch workspace
//!
//! Shared fixtures: isolated monitors, sample handlers and a closable
//! body stream.

#![allow(missing_docs)]

use parking_lot::Mutex;
use racewatch_core::{MemorySink, Monitor, WatchedMap};
use racewatch_middleware::{BodyStream, BoxError, Request, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Isolated monitor plus a memory sink, for building middleware
pub fn isolated() -> (Arc<Monitor>, Arc<MemorySink>) {
    (Monitor::new(), Arc::new(MemorySink::new()))
}

/// Application state shared by every request: a hit counter per path
pub type SharedHits = Arc<Mutex<WatchedMap<String, u64>>>;

pub fn shared_hits(monitor: &Arc<Monitor>) -> SharedHits {
    Arc::new(Mutex::new(WatchedMap::new_in(monitor)))
}

/// Handler that bumps the shared hit counter for the request path
pub fn counting_handler(
    hits: SharedHits,
) -> impl Fn(&mut Request) -> Result<Response, BoxError> + Send + Sync {
    move |req: &mut Request| -> Result<Response, BoxError> {
        let mut hits = hits.lock();
        let count = hits.get(&req.path).copied().unwrap_or(0) + 1;
        hits.insert(req.path.clone(), count);
        Ok(Response::ok(count.to_string()))
    }
}

/// Handler that only touches the request's own context
pub fn env_only_handler(req: &mut Request) -> Result<Response, BoxError> {
    req.env.insert("handled".to_string(), "true".to_string());
    Ok(Response::ok("ok"))
}

/// Body stream over fixed chunks that records whether it was closed
///
/// `on_chunk` runs before every chunk is produced, so tests can mutate
/// shared state from inside body generation.
pub struct TestStream {
    chunks: Vec<Vec<u8>>,
    fail_after: Option<usize>,
    produced: usize,
    closed: Arc<AtomicBool>,
    on_chunk: Box<dyn FnMut() + Send>,
}

impl TestStream {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_after: None,
            produced: 0,
            closed: Arc::new(AtomicBool::new(false)),
            on_chunk: Box::new(|| {}),
        }
    }

    /// Fail instead of producing chunk number `n`
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn on_chunk(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_chunk = Box::new(f);
        self
    }

    /// Flag set once the stream is closed
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl BodyStream for TestStream {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BoxError> {
        if self.fail_after == Some(self.produced) {
            return Err(format!("stream failed after {} chunks", self.produced).into());
        }
        if self.produced >= self.chunks.len() {
            return Ok(None);
        }
        (self.on_chunk)();
        let chunk = self.chunks[self.produced].clone();
        self.produced += 1;
        Ok(Some(chunk))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn was_closed(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}
