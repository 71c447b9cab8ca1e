//! `racewatch` binary

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use racewatch_cli::{init_logging, run_check, run_demo, DemoOptions};
use racewatch_core::StdoutSink;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("racewatch")
        .version(racewatch_core::VERSION)
        .about("Detect shared container mutation during a unit of work")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("check")
                .about("Validate a racewatch config file")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the TOML config"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Run a concurrent sample workload under the watch middleware")
                .arg(
                    Arg::new("requests")
                        .long("requests")
                        .default_value("16")
                        .value_parser(value_parser!(usize))
                        .help("Number of requests to issue"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Optional TOML config applied to the middleware"),
                ),
        );

    let matches = cli.get_matches();
    init_logging("info", matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("check", args)) => {
            let path = args
                .get_one::<PathBuf>("config")
                .context("--config is required")?;
            let summary = run_check(path)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
        }
        Some(("demo", args)) => {
            let options = DemoOptions {
                requests: args.get_one::<usize>("requests").copied().unwrap_or(16),
                config: args.get_one::<PathBuf>("config").cloned(),
            };
            let summary = run_demo(options, Arc::new(StdoutSink)).await?;

            println!();
            println!("Demo Summary:");
            println!("  Requests: {}", summary.requests);
            println!("  Failed: {}", summary.failed);
            println!("  Hits: {}", summary.hits);
            println!("  Audit entries: {}", summary.audit_entries);
        }
        Some((other, _)) => anyhow::bail!("unknown subcommand: {other}"),
        None => anyhow::bail!("a subcommand is required"),
    }
    Ok(())
}
