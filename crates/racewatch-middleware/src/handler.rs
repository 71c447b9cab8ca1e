//! Handler trait

use crate::http::{BoxError, Request, Response};

/// Produces a response for a request
///
/// Implemented for any `Fn(&mut Request) -> Result<Response, BoxError>`
/// closure, and by [`WatchMiddleware`](crate::WatchMiddleware) itself so
/// layers compose.
pub trait Handler: Send + Sync {
    /// Handle the request
    ///
    /// # Errors
    /// Whatever the handler fails with
    fn call(&self, req: &mut Request) -> Result<Response, BoxError>;
}

impl<F> Handler for F
where
    F: Fn(&mut Request) -> Result<Response, BoxError> + Send + Sync,
{
    fn call(&self, req: &mut Request) -> Result<Response, BoxError> {
        self(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racewatch_core::Monitor;

    #[test]
    fn closures_are_handlers() {
        let handler = |req: &mut Request| -> Result<Response, BoxError> {
            Ok(Response::ok(req.path.clone()))
        };
        let handler: &dyn Handler = &handler;
        let mut req = Request::new_in("GET", "/users", &Monitor::new());

        let response = handler.call(&mut req).unwrap();
        assert_eq!(response.body.chunks().unwrap(), &[b"/users".to_vec()][..]);
    }
}
