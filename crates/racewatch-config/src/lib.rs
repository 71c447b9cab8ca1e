//! racewatch configuration
//!
//! Loads the TOML file that tells racewatch which call-site files to trust
//! per tracked type, which request paths to leave unwatched, and where
//! whitelist rules are rooted.
//!
//! # Example
//!
//! ```rust
//! use racewatch_config::RaceWatchConfig;
//! use racewatch_core::{Monitor, Watcher};
//!
//! let config = RaceWatchConfig::from_toml_str(r#"
//!     skip_paths = ["^/health"]
//!     [whitelist]
//!     Map = ["src/cache/*.rs"]
//! "#).unwrap();
//! config.validate().unwrap();
//!
//! let monitor = Monitor::new();
//! let watchers: Vec<Watcher> = racewatch_core::TrackedType::ALL
//!     .iter()
//!     .map(|&kind| Watcher::new(kind, &monitor))
//!     .collect();
//! config.apply(&monitor, &watchers).unwrap();
//! assert!(config.skip_rules().unwrap().matches("/health"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod skip;

pub use config::RaceWatchConfig;
pub use error::{ConfigError, ConfigResult};
pub use skip::SkipRules;
