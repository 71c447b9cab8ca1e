//! racewatch middleware
//!
//! Runs each request through one watch cycle. The request's own context map
//! (`Request::env`) is always ignored, configured paths can be skipped, and
//! streaming bodies are drained inside the cycle.
//!
//! # Example
//!
//! ```rust
//! use racewatch_core::{MemorySink, Monitor};
//! use racewatch_middleware::{BoxError, Handler, Request, Response, WatchMiddleware};
//! use std::sync::Arc;
//!
//! let monitor = Monitor::new();
//! let sink = Arc::new(MemorySink::new());
//! let app = WatchMiddleware::with_sink(
//!     |req: &mut Request| -> Result<Response, BoxError> {
//!         req.env.insert("seen".into(), "yes".into());
//!         Ok(Response::ok("hello"))
//!     },
//!     &monitor,
//!     sink.clone(),
//! );
//!
//! let response = app.call(&mut Request::new_in("GET", "/", &monitor)).unwrap();
//! assert_eq!(response.status, 200);
//! assert!(sink.diagnostics().is_empty());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;

pub use error::MiddlewareError;
pub use handler::Handler;
pub use http::{Body, BodyStream, BoxError, Request, Response};
pub use middleware::WatchMiddleware;
