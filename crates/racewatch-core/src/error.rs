//! Error types for racewatch core

/// Errors raised by the watch machinery itself
///
/// Failures of the watched unit of work never pass through this type; they
/// are returned to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A tracked type name did not match any known kind
    #[error("unknown tracked type: '{0}'")]
    UnknownTrackedType(String),

    /// A cycle was opened while another one is still armed on the same monitor
    #[error("a watch cycle is already active on this monitor")]
    AlreadyWatching,
}

/// Result type alias for core operations
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_display() {
        let err = WatchError::UnknownTrackedType("Queue".to_string());
        assert_eq!(err.to_string(), "unknown tracked type: 'Queue'");
    }

    #[test]
    fn already_watching_display() {
        assert!(WatchError::AlreadyWatching.to_string().contains("already active"));
    }
}
