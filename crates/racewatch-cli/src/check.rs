//! `racewatch check`: validate a config file and summarize it

use anyhow::Context;
use racewatch_config::RaceWatchConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// What a valid config file configures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// File that was checked
    pub path: PathBuf,
    /// Whether watching is on
    pub enabled: bool,
    /// Whether backtraces are captured
    pub capture_backtrace: bool,
    /// Whitelist roots
    pub search_path: Vec<PathBuf>,
    /// Skip patterns
    pub skip_paths: Vec<String>,
    /// Rule count per tracked type
    pub whitelist: BTreeMap<String, usize>,
}

/// Load and validate `path`
///
/// # Errors
/// Returns error if the file cannot be read, parsed or validated
pub fn run_check(path: &Path) -> anyhow::Result<CheckSummary> {
    let config = RaceWatchConfig::load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;

    let whitelist = config
        .whitelist_rules()?
        .into_iter()
        .map(|(kind, rules)| (kind.name().to_string(), rules.len()))
        .collect();

    tracing::info!(path = %path.display(), "config is valid");
    Ok(CheckSummary {
        path: path.to_path_buf(),
        enabled: config.enabled,
        capture_backtrace: config.capture_backtrace,
        search_path: config.search_path,
        skip_paths: config.skip_paths,
        whitelist,
    })
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config: {}", self.path.display())?;
        writeln!(f, "  Enabled: {}", self.enabled)?;
        writeln!(f, "  Capture backtrace: {}", self.capture_backtrace)?;
        let roots: Vec<String> = self
            .search_path
            .iter()
            .map(|p| format!("{:?}", p.display().to_string()))
            .collect();
        writeln!(f, "  Search path: [{}]", roots.join(", "))?;
        writeln!(f, "  Skip patterns: {}", self.skip_paths.len())?;
        for (kind, rules) in &self.whitelist {
            writeln!(f, "  Whitelist {kind}: {rules} rule(s)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn summarizes_valid_config() {
        let file = config_file("skip_paths = [\"^/health\"]\n[whitelist]\nmap = [\"a.rs\", \"b.rs\"]\n");
        let summary = run_check(file.path()).unwrap();
        assert!(summary.enabled);
        assert_eq!(summary.skip_paths, vec!["^/health"]);
        assert_eq!(summary.whitelist.get("Map"), Some(&2));

        let text = summary.to_string();
        assert!(text.contains("Whitelist Map: 2 rule(s)"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["whitelist"]["Map"], 2);
    }

    #[test]
    fn invalid_rule_fails_with_context() {
        let file = config_file("[whitelist]\nSet = [\"src/[.rs\"]\n");
        let err = run_check(file.path()).unwrap_err();
        assert!(format!("{err:#}").starts_with("validating "));
    }
}
