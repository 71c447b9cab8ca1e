//! Watch middleware
//!
//! Wraps a [`Handler`] so that each call runs inside one watch cycle:
//!
//! ```text
//! Request → skip? ──yes──→ Handler → Response
//!              │
//!              no → cycle lock → Tester::watch(Handler + drain body) → Response
//! ```
//!
//! The cycle covers the whole response lifetime: a streaming body is drained
//! (and its stream closed) before the cycle ends, so mutations made while
//! producing chunks are observed too.

use crate::error::MiddlewareError;
use crate::handler::Handler;
use crate::http::{BoxError, Request, Response};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex};
use racewatch_config::{RaceWatchConfig, SkipRules};
use racewatch_core::{CycleReport, Monitor, ReportSink, StdoutSink, Tester, Tracked, Watcher};
use std::sync::Arc;

/// Serializes watch cycles across every middleware in the process
///
/// Reentrant so a watched handler that calls another watched handler on the
/// same thread does not deadlock; the nested call runs unwatched.
static CYCLE_LOCK: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

/// Runs the wrapped handler inside a watch cycle
pub struct WatchMiddleware<H> {
    inner: H,
    monitor: Arc<Monitor>,
    watchers: Vec<Watcher>,
    skip: SkipRules,
    enabled: bool,
    last_report: Mutex<Option<CycleReport>>,
}

impl<H: Handler> WatchMiddleware<H> {
    /// Wrap `inner`, reporting to standard output
    #[must_use]
    pub fn new(inner: H, monitor: &Arc<Monitor>) -> Self {
        Self::with_sink(inner, monitor, Arc::new(StdoutSink))
    }

    /// Wrap `inner`, reporting to `sink`
    #[must_use]
    pub fn with_sink(inner: H, monitor: &Arc<Monitor>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            inner,
            monitor: Arc::clone(monitor),
            watchers: Watcher::for_all_types(monitor, sink),
            skip: SkipRules::none(),
            enabled: true,
            last_report: Mutex::new(None),
        }
    }

    /// Apply a configuration: enabled flag, skip rules, whitelists, search path
    ///
    /// # Errors
    /// Returns error if a skip pattern or whitelist key is invalid
    pub fn configure(mut self, config: &RaceWatchConfig) -> Result<Self, MiddlewareError> {
        self.skip = config.skip_rules()?;
        config.apply(&self.monitor, &self.watchers)?;
        self.enabled = config.enabled;
        Ok(self)
    }

    /// Turn watching on or off
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Watchers used for every cycle
    #[must_use]
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    /// Report of the most recent watched request
    #[must_use]
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.lock().clone()
    }

    fn should_watch(&self, req: &Request) -> bool {
        self.enabled && !self.skip.matches(&req.path)
    }
}

impl<H: Handler> Handler for WatchMiddleware<H> {
    fn call(&self, req: &mut Request) -> Result<Response, BoxError> {
        if !self.should_watch(req) {
            tracing::trace!(method = %req.method, path = %req.path, "request not watched");
            return self.inner.call(req);
        }

        let _cycle = CYCLE_LOCK.lock();
        let mut tester = Tester::new(&self.monitor, &self.watchers, [req.env.id()]);
        let result = tester.watch(|| self.inner.call(req)?.into_fixed());

        if let Some(report) = tester.take_report() {
            tracing::debug!(
                method = %req.method,
                path = %req.path,
                emitted = report.emitted_count(),
                "request watched"
            );
            *self.last_report.lock() = Some(report);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use racewatch_core::{MemorySink, WatchedVec};

    fn middleware<H: Handler>(inner: H) -> (WatchMiddleware<H>, Arc<Monitor>, Arc<MemorySink>) {
        let monitor = Monitor::new();
        let sink = Arc::new(MemorySink::new());
        let mw = WatchMiddleware::with_sink(inner, &monitor, sink.clone());
        (mw, monitor, sink)
    }

    #[test]
    fn env_mutation_is_not_reported() {
        let handler = |req: &mut Request| -> Result<Response, BoxError> {
            req.env.insert("user".into(), "alice".into());
            Ok(Response::ok("ok"))
        };
        let (mw, monitor, sink) = middleware(handler);
        let mut req = Request::new_in("GET", "/", &monitor);

        mw.call(&mut req).unwrap();
        assert!(sink.diagnostics().is_empty());
        let report = mw.last_report().unwrap();
        assert_eq!(report.watchers[0].ignored, 1);
    }

    #[test]
    fn disabled_middleware_never_arms() {
        let handler = |_: &mut Request| -> Result<Response, BoxError> { Ok(Response::ok("ok")) };
        let (mw, monitor, _) = middleware(handler);
        let mw = mw.enabled(false);

        mw.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();
        assert!(mw.last_report().is_none());
    }

    #[test]
    fn skipped_path_runs_unwatched() {
        let monitor = Monitor::new();
        let sink = Arc::new(MemorySink::new());
        let shared = Mutex::new(WatchedVec::<u8>::new_in(&monitor));
        let handler = move |_: &mut Request| -> Result<Response, BoxError> {
            shared.lock().push(1);
            Ok(Response::ok("ok"))
        };
        let mw = WatchMiddleware::with_sink(handler, &monitor, sink.clone());
        let config = RaceWatchConfig::new().with_skip_path("^/health$");
        let mw = mw.configure(&config).unwrap();

        mw.call(&mut Request::new_in("GET", "/health", &monitor)).unwrap();
        assert!(sink.diagnostics().is_empty());
        assert!(mw.last_report().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let handler = |_: &mut Request| -> Result<Response, BoxError> { Ok(Response::ok("ok")) };
        let (mw, _, _) = middleware(handler);
        let config = RaceWatchConfig::new().with_skip_path("(");
        assert!(matches!(mw.configure(&config), Err(MiddlewareError::Config(_))));
    }

    #[test]
    fn response_body_is_materialized() {
        let handler = |_: &mut Request| -> Result<Response, BoxError> {
            Ok(Response::new(200, Body::Fixed(vec![b"x".to_vec()])))
        };
        let (mw, monitor, _) = middleware(handler);
        let response = mw.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();
        assert!(!response.body.is_stream());
    }
}
