//! Configuration errors

use racewatch_core::WatchError;
use std::path::PathBuf;

/// Errors while loading, validating or applying a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A skip pattern is not a valid regular expression
    #[error("invalid skip pattern '{pattern}': {source}")]
    InvalidSkipPattern {
        /// Offending pattern
        pattern: String,
        /// Regex compile error
        #[source]
        source: regex::Error,
    },

    /// A whitelist rule is not a valid path glob
    #[error("invalid whitelist rule '{rule}': {source}")]
    InvalidWhitelistRule {
        /// Offending rule
        rule: String,
        /// Glob compile error
        #[source]
        source: glob::PatternError,
    },

    /// A whitelist table key does not name a tracked type
    #[error(transparent)]
    UnknownType(#[from] WatchError),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = ConfigError::io_error(
            "/etc/racewatch.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "failed to read config /etc/racewatch.toml: missing");
    }

    #[test]
    fn unknown_type_is_transparent() {
        let err = ConfigError::from(WatchError::UnknownTrackedType("Deque".into()));
        assert_eq!(err.to_string(), WatchError::UnknownTrackedType("Deque".into()).to_string());
    }
}
