//! Middleware errors

use racewatch_config::ConfigError;

/// Errors while building a [`WatchMiddleware`](crate::WatchMiddleware)
///
/// Handler failures are not wrapped; they reach the caller as the handler
/// returned them.
#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    /// Configuration could not be applied
    #[error("middleware configuration failed: {0}")]
    Config(#[from] ConfigError),
}
