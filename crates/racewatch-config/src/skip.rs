//! Request-path skip rules

use crate::error::{ConfigError, ConfigResult};
use regex::RegexSet;

/// Compiled set of request-path regexes that bypass watching
#[derive(Debug, Clone)]
pub struct SkipRules {
    set: RegexSet,
}

impl SkipRules {
    /// Compile `patterns`
    ///
    /// # Errors
    /// Returns the first pattern that is not a valid regex
    pub fn new<I, S>(patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(|p| p.as_ref().to_string()).collect();
        // Compile one at a time so the error names the offending pattern
        for pattern in &patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidSkipPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        let set = RegexSet::new(&patterns).map_err(|source| ConfigError::InvalidSkipPattern {
            pattern: patterns.join("|"),
            source,
        })?;
        Ok(Self { set })
    }

    /// Rules that skip nothing
    #[must_use]
    pub fn none() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    /// Whether requests to `path` are left unwatched
    #[inline]
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    /// Number of patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether there are no patterns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self::none()
    }
}
