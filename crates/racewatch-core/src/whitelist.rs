//! Whitelist of trusted call-site files
//!
//! Rules are path globs relative to "somewhere on the search path". They
//! are resolved once per report: every rule is joined onto every search
//! root, and each joined pattern selects the known source files it matches.

use crate::collections::WatchedVec;
use crate::monitor::Monitor;
use glob::Pattern;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Path-glob rules for one watcher
///
/// The rule list is itself a bookkeeping sequence of the monitor, so adding
/// rules while a cycle is running never shows up as an offender.
#[derive(Debug)]
pub struct Whitelist {
    rules: WatchedVec<String>,
}

impl Whitelist {
    /// Empty whitelist whose storage is registered as bookkeeping in `monitor`
    #[must_use]
    pub fn new_in(monitor: &Arc<Monitor>) -> Self {
        Self {
            rules: WatchedVec::bookkeeping_in(monitor),
        }
    }

    /// Merge rules in; existing rules are never removed
    pub fn extend<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for rule in rules {
            let rule = rule.into();
            if !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
    }

    /// Current rules in insertion order
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Identity of the rule storage
    #[must_use]
    pub fn storage(&self) -> &WatchedVec<String> {
        &self.rules
    }

    /// Resolve rules against `search_path` and the `known` source files
    ///
    /// A rule that does not form a valid glob on some root matches nothing
    /// there.
    #[must_use]
    pub fn resolve(&self, search_path: &[PathBuf], known: &[&'static str]) -> ResolvedWhitelist {
        let mut files = HashSet::new();
        for rule in self.rules.iter() {
            for root in search_path {
                let candidate = root.join(rule);
                let candidate = candidate.to_string_lossy();
                match Pattern::new(&candidate) {
                    Ok(pattern) => {
                        files.extend(known.iter().copied().filter(|file| pattern.matches(file)));
                    }
                    Err(err) => {
                        tracing::warn!(
                            rule = %rule,
                            pattern = %candidate,
                            error = %err,
                            "invalid whitelist pattern, rule matches nothing"
                        );
                    }
                }
            }
        }
        ResolvedWhitelist { files }
    }
}

/// Concrete file list a whitelist resolved to for one report
#[derive(Debug, Clone, Default)]
pub struct ResolvedWhitelist {
    files: HashSet<&'static str>,
}

impl ResolvedWhitelist {
    /// Whether call sites in `file` are trusted
    #[inline]
    #[must_use]
    pub fn covers(&self, file: &str) -> bool {
        self.files.contains(file)
    }

    /// Number of trusted files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is trusted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Tracked;

    const KNOWN: &[&str] = &[
        "src/handlers/users.rs",
        "src/handlers/orders.rs",
        "src/cache.rs",
        "/home/dev/.cargo/registry/src/index/serde-1.0.0/src/de.rs",
    ];

    fn whitelist(rules: &[&str]) -> Whitelist {
        let mut list = Whitelist::new_in(&Monitor::new());
        list.extend(rules.iter().copied());
        list
    }

    #[test]
    fn joins_rules_onto_each_root() {
        let list = whitelist(&["handlers/*.rs"]);
        let resolved = list.resolve(&[PathBuf::new(), PathBuf::from("src")], KNOWN);

        assert!(resolved.covers("src/handlers/users.rs"));
        assert!(resolved.covers("src/handlers/orders.rs"));
        assert!(!resolved.covers("src/cache.rs"));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn root_may_itself_be_a_glob() {
        let list = whitelist(&["serde-*/**/*.rs"]);
        let resolved = list.resolve(&[PathBuf::from("/home/dev/.cargo/registry/src/*")], KNOWN);
        assert!(resolved.covers("/home/dev/.cargo/registry/src/index/serde-1.0.0/src/de.rs"));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn empty_search_path_resolves_nothing() {
        let list = whitelist(&["**/*.rs"]);
        assert!(list.resolve(&[], KNOWN).is_empty());
    }

    #[test]
    fn invalid_glob_matches_nothing() {
        let list = whitelist(&["src/[.rs", "src/cache.rs"]);
        let resolved = list.resolve(&[PathBuf::new()], KNOWN);
        assert!(resolved.covers("src/cache.rs"));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn extend_is_additive_and_deduplicated() {
        let mut list = whitelist(&["a.rs"]);
        list.extend(["b.rs", "a.rs"]);
        assert_eq!(list.rules(), &["a.rs".to_string(), "b.rs".to_string()][..]);
    }

    #[test]
    fn rule_storage_is_bookkeeping() {
        let monitor = Monitor::new();
        let list = Whitelist::new_in(&monitor);
        assert!(monitor.is_internal(list.storage().instance().id()));
    }
}
