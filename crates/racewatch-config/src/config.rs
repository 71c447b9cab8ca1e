//! racewatch configuration model
//!
//! ```toml
//! enabled = true
//! capture_backtrace = true
//! search_path = ["", "src"]
//! skip_paths = ["^/health", "^/assets/"]
//!
//! [whitelist]
//! Map = ["src/cache/*.rs"]
//! Sequence = ["**/vendor/**"]
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::skip::SkipRules;
use racewatch_core::{Monitor, StackCapture, TrackedType, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceWatchConfig {
    /// Whether the middleware watches requests at all
    pub enabled: bool,
    /// Capture a full backtrace for each new call site
    pub capture_backtrace: bool,
    /// Roots whitelist rules are joined onto
    pub search_path: Vec<PathBuf>,
    /// Request-path regexes that are never watched
    pub skip_paths: Vec<String>,
    /// Tracked type name to path-glob rules
    pub whitelist: BTreeMap<String, Vec<String>>,
}

impl Default for RaceWatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_backtrace: true,
            search_path: vec![PathBuf::new()],
            skip_paths: Vec::new(),
            whitelist: BTreeMap::new(),
        }
    }
}

impl RaceWatchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With watching enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With an additional skip pattern
    #[must_use]
    pub fn with_skip_path(mut self, pattern: impl Into<String>) -> Self {
        self.skip_paths.push(pattern.into());
        self
    }

    /// With additional whitelist rules for `kind`
    #[must_use]
    pub fn with_whitelist<I, S>(mut self, kind: TrackedType, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .entry(kind.name().to_string())
            .or_default()
            .extend(rules.into_iter().map(Into::into));
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML or has unknown fields
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded racewatch config");
        Ok(config)
    }

    /// Check every skip pattern, whitelist key and whitelist rule
    ///
    /// # Errors
    /// Returns the first invalid pattern, key or rule found
    pub fn validate(&self) -> ConfigResult<()> {
        self.skip_rules()?;
        for (kind, rules) in self.whitelist_rules()? {
            for rule in rules {
                glob::Pattern::new(rule).map_err(|source| ConfigError::InvalidWhitelistRule {
                    rule: rule.clone(),
                    source,
                })?;
            }
            tracing::trace!(%kind, rules = rules.len(), "whitelist rules valid");
        }
        Ok(())
    }

    /// Compile the skip patterns
    ///
    /// # Errors
    /// Returns error if a pattern is not a valid regex
    pub fn skip_rules(&self) -> ConfigResult<SkipRules> {
        SkipRules::new(&self.skip_paths)
    }

    /// Whitelist rules keyed by parsed tracked type
    ///
    /// # Errors
    /// Returns error if a key does not name a tracked type
    pub fn whitelist_rules(&self) -> ConfigResult<Vec<(TrackedType, &[String])>> {
        self.whitelist
            .iter()
            .map(|(name, rules)| Ok((TrackedType::from_str(name)?, rules.as_slice())))
            .collect()
    }

    /// Install search path, capture mode and whitelist rules
    ///
    /// Rules are merged into the watcher of the matching type; existing rules
    /// are kept.
    ///
    /// # Errors
    /// Returns error if a whitelist key does not name a tracked type
    pub fn apply(&self, monitor: &Arc<Monitor>, watchers: &[Watcher]) -> ConfigResult<()> {
        let rules = self.whitelist_rules()?;

        monitor.set_search_path(self.search_path.iter().cloned());
        monitor.set_stack_capture(if self.capture_backtrace {
            StackCapture::Full
        } else {
            StackCapture::Disabled
        });

        for watcher in watchers {
            for (_, list) in rules.iter().filter(|(kind, _)| *kind == watcher.kind()) {
                watcher.whitelist(list.iter().cloned());
            }
        }

        tracing::info!(
            enabled = self.enabled,
            skip_paths = self.skip_paths.len(),
            whitelisted_types = rules.len(),
            "racewatch config applied"
        );
        Ok(())
    }
}
