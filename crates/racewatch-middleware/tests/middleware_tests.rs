use pretty_assertions::assert_eq;
use racewatch_config::RaceWatchConfig;
use racewatch_core::{TrackedType, WatchedVec};
use racewatch_middleware::{Body, BoxError, Handler, Request, Response, WatchMiddleware};
use racewatch_test_utils::{
    counting_handler, env_only_handler, isolated, shared_hits, was_closed, TestStream,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_shared_state_mutation_is_reported() {
    let (monitor, sink) = isolated();
    let hits = shared_hits(&monitor);
    let app = WatchMiddleware::with_sink(counting_handler(Arc::clone(&hits)), &monitor, sink.clone());

    let response = app.call(&mut Request::new_in("GET", "/users", &monitor)).unwrap();

    assert_eq!(response.body.chunks().unwrap(), &[b"1".to_vec()][..]);
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, TrackedType::Map);
    assert!(diagnostics[0].call_site.file().ends_with("lib.rs"));
    assert!(!monitor.is_watching());
}

#[test]
fn test_request_env_is_ignored() {
    let (monitor, sink) = isolated();
    let app = WatchMiddleware::with_sink(env_only_handler, &monitor, sink.clone());

    let mut req = Request::new_in("POST", "/login", &monitor);
    app.call(&mut req).unwrap();

    assert_eq!(req.env.get("handled").map(String::as_str), Some("true"));
    assert!(sink.diagnostics().is_empty());
    assert_eq!(app.last_report().unwrap().watchers[0].ignored, 1);
}

#[test]
fn test_streaming_body_is_drained_inside_the_cycle() {
    let (monitor, sink) = isolated();
    let log = Arc::new(Mutex::new(WatchedVec::<usize>::new_in(&monitor)));
    let stream_log = Arc::clone(&log);
    let closed = Arc::new(Mutex::new(None));
    let closed_slot = Arc::clone(&closed);

    let handler = move |_: &mut Request| -> Result<Response, BoxError> {
        let log = Arc::clone(&stream_log);
        let stream = TestStream::new(["a", "b", "c"]).on_chunk(move || {
            let mut log = log.lock().unwrap();
            let next = log.len();
            log.push(next);
        });
        *closed_slot.lock().unwrap() = Some(stream.closed_flag());
        Ok(Response::new(200, Body::Stream(Box::new(stream))))
    };
    let app = WatchMiddleware::with_sink(handler, &monitor, sink.clone());

    let response = app.call(&mut Request::new_in("GET", "/export", &monitor)).unwrap();

    assert!(!response.body.is_stream());
    assert_eq!(response.body.chunks().unwrap().len(), 3);
    assert_eq!(log.lock().unwrap().len(), 3);
    assert!(was_closed(closed.lock().unwrap().as_ref().unwrap()));
    // Three pushes from one call site
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, TrackedType::Sequence);
}

#[test]
fn test_stream_failure_propagates_and_closes() {
    let (monitor, sink) = isolated();
    let closed = Arc::new(Mutex::new(None));
    let closed_slot = Arc::clone(&closed);
    let handler = move |_: &mut Request| -> Result<Response, BoxError> {
        let stream = TestStream::new(["a", "b"]).failing_after(1);
        *closed_slot.lock().unwrap() = Some(stream.closed_flag());
        Ok(Response::new(200, Body::Stream(Box::new(stream))))
    };
    let app = WatchMiddleware::with_sink(handler, &monitor, sink);

    let err = app.call(&mut Request::new_in("GET", "/", &monitor)).unwrap_err();

    assert_eq!(err.to_string(), "stream failed after 1 chunks");
    assert!(was_closed(closed.lock().unwrap().as_ref().unwrap()));
    assert!(!monitor.is_watching());
}

#[test]
fn test_handler_error_propagates_after_report() {
    let (monitor, sink) = isolated();
    let shared = Arc::new(Mutex::new(WatchedVec::<u8>::new_in(&monitor)));
    let handler = move |_: &mut Request| -> Result<Response, BoxError> {
        shared.lock().unwrap().push(1);
        Err("database unavailable".into())
    };
    let app = WatchMiddleware::with_sink(handler, &monitor, sink.clone());

    let err = app.call(&mut Request::new_in("GET", "/", &monitor)).unwrap_err();

    assert_eq!(err.to_string(), "database unavailable");
    assert_eq!(sink.lines().len(), 1);
    assert!(sink.lines()[0].starts_with("[THREAD_SAFETY] Potential concurrent Sequence modification at: "));
}

#[test]
fn test_whitelist_from_config_suppresses_handler_file() {
    let (monitor, sink) = isolated();
    let hits = shared_hits(&monitor);
    let config = RaceWatchConfig::new()
        .with_whitelist(TrackedType::Map, ["**/racewatch-test-utils/src/lib.rs"]);
    let app = WatchMiddleware::with_sink(counting_handler(hits), &monitor, sink.clone())
        .configure(&config)
        .unwrap();

    app.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();

    assert!(sink.diagnostics().is_empty());
    assert_eq!(app.last_report().unwrap().watchers[0].whitelisted, 1);
}

#[test]
fn test_concurrent_requests_are_serialized() {
    let (monitor, sink) = isolated();
    let hits = shared_hits(&monitor);
    let app = Arc::new(WatchMiddleware::with_sink(
        counting_handler(Arc::clone(&hits)),
        &monitor,
        sink.clone(),
    ));

    std::thread::scope(|scope| {
        for i in 0..8 {
            let app = Arc::clone(&app);
            let monitor = Arc::clone(&monitor);
            scope.spawn(move || {
                let path = format!("/items/{}", i % 2);
                app.call(&mut Request::new_in("GET", path, &monitor)).unwrap();
            });
        }
    });

    // Every request ran its own cycle and hit the same call site once
    assert_eq!(sink.diagnostics().len(), 8);
    let total: u64 = hits.lock().values().sum();
    assert_eq!(total, 8);
    assert!(!monitor.is_watching());
}

#[test]
fn test_nested_middleware_runs_inner_unwatched() {
    let (monitor, sink) = isolated();
    let hits = shared_hits(&monitor);
    let inner = WatchMiddleware::with_sink(counting_handler(hits), &monitor, sink.clone());
    let nested_monitor = Arc::clone(&monitor);
    let outer = WatchMiddleware::with_sink(
        move |req: &mut Request| -> Result<Response, BoxError> {
            let mut inner_req = Request::new_in("GET", req.path.clone(), &nested_monitor);
            inner.call(&mut inner_req)
        },
        &monitor,
        sink.clone(),
    );

    let response = outer.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();

    assert_eq!(response.status, 200);
    // Seen once, by the outer cycle
    assert_eq!(sink.diagnostics().len(), 1);
    assert!(!monitor.is_watching());
}

#[test]
fn test_nested_request_env_is_not_reported() {
    let (monitor, sink) = isolated();
    let inner = WatchMiddleware::with_sink(env_only_handler, &monitor, sink.clone());
    let nested_monitor = Arc::clone(&monitor);
    let outer = WatchMiddleware::with_sink(
        move |req: &mut Request| -> Result<Response, BoxError> {
            let mut inner_req = Request::new_in("GET", req.path.clone(), &nested_monitor);
            let response = inner.call(&mut inner_req)?;
            assert_eq!(inner_req.env.get("handled").map(String::as_str), Some("true"));
            Ok(response)
        },
        &monitor,
        sink.clone(),
    );

    outer.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();

    // Created mid-cycle, so never instrumented by the nested cycle either
    assert_eq!(sink.lines(), Vec::<String>::new());
    assert_eq!(outer.last_report().unwrap().emitted_count(), 0);
    assert!(!monitor.is_watching());
}
