//! racewatch command line
//!
//! - `racewatch check --config <file> [--json]`: validate and summarize a config
//! - `racewatch demo --requests N [--config <file>]`: run a concurrent sample
//!   workload through the watch middleware and print its diagnostics

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod check;
pub mod demo;
pub mod logging;

pub use check::{run_check, CheckSummary};
pub use demo::{run_demo, DemoOptions, DemoSummary};
pub use logging::init_logging;
