//! Minimal request/response model

use racewatch_core::{Monitor, WatchedMap};
use std::fmt;
use std::sync::Arc;

/// Error type handlers may return; passed through the middleware untouched
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Incoming request
#[derive(Debug)]
pub struct Request {
    /// HTTP method
    pub method: String,
    /// Request path, matched against skip rules
    pub path: String,
    /// Per-request context; mutated freely by handlers and never reported
    pub env: WatchedMap<String, String>,
}

impl Request {
    /// Request whose context is tracked by the global monitor
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new_in(method, path, Monitor::global())
    }

    /// Request whose context is tracked by `monitor`
    #[must_use]
    pub fn new_in(method: impl Into<String>, path: impl Into<String>, monitor: &Arc<Monitor>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            env: WatchedMap::new_in(monitor),
        }
    }
}

/// Lazily produced body chunks
pub trait BodyStream: Send {
    /// Next chunk, or `None` once exhausted
    ///
    /// # Errors
    /// Returns error if producing the chunk failed
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BoxError>;

    /// Release resources held by the stream
    fn close(&mut self) {}
}

/// Response body
pub enum Body {
    /// Fully materialized chunks
    Fixed(Vec<Vec<u8>>),
    /// Chunks produced on demand
    Stream(Box<dyn BodyStream>),
}

impl Body {
    /// Body with a single chunk
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Fixed(vec![text.into().into_bytes()])
    }

    /// Pull every chunk of a streaming body, then close the stream
    ///
    /// The stream is closed whether or not draining succeeded. A fixed body is
    /// returned as is.
    ///
    /// # Errors
    /// Returns the first error the stream produced
    pub fn into_fixed(self) -> Result<Self, BoxError> {
        match self {
            Self::Fixed(chunks) => Ok(Self::Fixed(chunks)),
            Self::Stream(mut stream) => {
                let drained = drain(stream.as_mut());
                stream.close();
                drained.map(Self::Fixed)
            }
        }
    }

    /// Chunks of a fixed body
    #[must_use]
    pub fn chunks(&self) -> Option<&[Vec<u8>]> {
        match self {
            Self::Fixed(chunks) => Some(chunks),
            Self::Stream(_) => None,
        }
    }

    /// Whether the body is still a stream
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

fn drain(stream: &mut dyn BodyStream) -> Result<Vec<Vec<u8>>, BoxError> {
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next_chunk()? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(chunks) => f.debug_tuple("Fixed").field(&chunks.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Handler response
#[derive(Debug)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Header pairs in order
    pub headers: Vec<(String, String)>,
    /// Body
    pub body: Body,
}

impl Response {
    /// Response with no headers
    #[must_use]
    pub fn new(status: u16, body: Body) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// 200 with a text body
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self::new(200, Body::text(text))
    }

    /// With an additional header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Same response with a materialized body
    ///
    /// # Errors
    /// Returns error if the body stream failed
    pub fn into_fixed(self) -> Result<Self, BoxError> {
        Ok(Self {
            body: self.body.into_fixed()?,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Chunks {
        remaining: Vec<&'static str>,
        fail_at_end: bool,
        closed: Arc<AtomicBool>,
    }

    impl BodyStream for Chunks {
        fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BoxError> {
            if self.remaining.is_empty() {
                return if self.fail_at_end {
                    Err("stream broke".into())
                } else {
                    Ok(None)
                };
            }
            Ok(Some(self.remaining.remove(0).as_bytes().to_vec()))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn stream(fail_at_end: bool) -> (Body, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let body = Body::Stream(Box::new(Chunks {
            remaining: vec!["a", "b"],
            fail_at_end,
            closed: Arc::clone(&closed),
        }));
        (body, closed)
    }

    #[test]
    fn stream_is_drained_and_closed() {
        let (body, closed) = stream(false);
        let fixed = body.into_fixed().unwrap();
        assert_eq!(fixed.chunks().unwrap(), &[b"a".to_vec(), b"b".to_vec()][..]);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn failing_stream_is_still_closed() {
        let (body, closed) = stream(true);
        let err = body.into_fixed().unwrap_err();
        assert_eq!(err.to_string(), "stream broke");
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn fixed_body_passes_through() {
        let response = Response::ok("hi").with_header("content-type", "text/plain");
        let fixed = response.into_fixed().unwrap();
        assert_eq!(fixed.status, 200);
        assert_eq!(fixed.headers.len(), 1);
        assert_eq!(fixed.body.chunks().unwrap(), &[b"hi".to_vec()][..]);
    }
}
