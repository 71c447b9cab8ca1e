//! `racewatch demo`: a small concurrent workload with deliberate shared writes
//!
//! Requests rotate over four routes:
//! - `/hits` bumps a process-wide hit counter (reported)
//! - `/export` streams a body whose chunks append to a shared audit log (reported)
//! - `/session` writes only to the request context (never reported)
//! - `/health` does nothing; skip it via config to run it unwatched

use anyhow::Context;
use parking_lot::Mutex;
use racewatch_config::RaceWatchConfig;
use racewatch_core::{Monitor, ReportSink, WatchedMap, WatchedVec};
use racewatch_middleware::{
    Body, BodyStream, BoxError, Handler, Request, Response, WatchMiddleware,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

const ROUTES: [&str; 4] = ["/hits", "/export", "/session", "/health"];

/// Demo parameters
#[derive(Debug, Clone, Default)]
pub struct DemoOptions {
    /// Number of requests to issue
    pub requests: usize,
    /// Optional config file applied to the middleware
    pub config: Option<PathBuf>,
}

/// Outcome of a demo run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemoSummary {
    /// Requests issued
    pub requests: usize,
    /// Requests whose handler failed
    pub failed: usize,
    /// Final hit counter total
    pub hits: u64,
    /// Audit log length
    pub audit_entries: usize,
}

/// Application state shared by every request
struct AppState {
    hits: Mutex<WatchedMap<String, u64>>,
    audit: Arc<Mutex<WatchedVec<String>>>,
}

impl AppState {
    fn new(monitor: &Arc<Monitor>) -> Self {
        Self {
            hits: Mutex::new(WatchedMap::new_in(monitor)),
            audit: Arc::new(Mutex::new(WatchedVec::new_in(monitor))),
        }
    }

    fn route(&self, req: &mut Request) -> Result<Response, BoxError> {
        match req.path.as_str() {
            "/hits" => {
                let mut hits = self.hits.lock();
                *hits.entry(req.path.clone()).or_insert(0) += 1;
                Ok(Response::ok("counted"))
            }
            "/export" => {
                let stream = AuditStream {
                    audit: Arc::clone(&self.audit),
                    remaining: 3,
                };
                Ok(Response::new(200, Body::Stream(Box::new(stream)))
                    .with_header("content-type", "text/plain"))
            }
            "/session" => {
                req.env.insert("session".to_string(), "fresh".to_string());
                Ok(Response::ok("session started"))
            }
            "/health" => Ok(Response::ok("ok")),
            other => Err(format!("no route for {other}").into()),
        }
    }
}

/// Emits a few lines, logging each one to the shared audit log
struct AuditStream {
    audit: Arc<Mutex<WatchedVec<String>>>,
    remaining: usize,
}

impl BodyStream for AuditStream {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BoxError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let line = format!("row {}\n", self.remaining);
        self.audit.lock().push(line.clone());
        Ok(Some(line.into_bytes()))
    }
}

/// Run the workload, reporting diagnostics to `sink`
///
/// # Errors
/// Returns error if the config cannot be loaded or applied, or a worker task
/// panics
pub async fn run_demo(options: DemoOptions, sink: Arc<dyn ReportSink>) -> anyhow::Result<DemoSummary> {
    let monitor = Monitor::new();
    let state = Arc::new(AppState::new(&monitor));

    let handler_state = Arc::clone(&state);
    let mut app = WatchMiddleware::with_sink(
        move |req: &mut Request| handler_state.route(req),
        &monitor,
        sink,
    );
    if let Some(path) = &options.config {
        let config = RaceWatchConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?;
        app = app.configure(&config)?;
    }
    let app = Arc::new(app);

    tracing::info!(requests = options.requests, "starting demo workload");
    let mut tasks = JoinSet::new();
    for i in 0..options.requests {
        let app = Arc::clone(&app);
        let monitor = Arc::clone(&monitor);
        tasks.spawn_blocking(move || {
            let mut req = Request::new_in("GET", ROUTES[i % ROUTES.len()], &monitor);
            app.call(&mut req)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined.context("demo worker panicked")? {
            tracing::warn!(error = %err, "request failed");
            failed += 1;
        }
    }

    let hits = state.hits.lock().values().sum();
    let audit_entries = state.audit.lock().len();
    let summary = DemoSummary {
        requests: options.requests,
        failed,
        hits,
        audit_entries,
    };
    tracing::info!(?summary, "demo finished");
    Ok(summary)
}
