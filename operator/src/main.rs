//! CLI entry point for the basket operator.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use nanobskt_operator::config::Config;
use nanobskt_operator::error::Error;
use nanobskt_operator::runner::{self, RunOptions};
use nanobskt_operator::scenario::Scenario;

#[derive(Parser)]
#[command(name = "bsktctl")]
#[command(about = "Basket operator: scripted issue, redeem and rebalance auctions")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a scenario's steps, then save the event log and audit trail
    Run {
        /// Path to scenario.json
        scenario: PathBuf,

        /// Apply the steps in memory without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the basket's phase and state at a time
    Phase {
        /// Timestamp in seconds
        #[arg(long)]
        at: u64,
    },

    /// Validate the config and show the basket it describes
    Check,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { scenario, dry_run } => {
            let steps = match Scenario::load(&scenario) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error loading scenario: {e}");
                    process::exit(1);
                }
            };
            let opts = RunOptions {
                dry_run,
                scenario_file: scenario.display().to_string(),
            };
            runner::run(&config, &steps, &opts).map(|report| {
                println!(
                    "\n{} steps applied, {} rejected as expected, {} settlements",
                    report.applied,
                    report.rejected,
                    report.settlements.len()
                );
            })
        }
        Command::Phase { at } => runner::show_phase(&config, at).map(|_| ()),
        Command::Check => runner::check(&config),
    };

    if let Err(e) = result {
        match &e {
            Error::StepFailed { .. } | Error::UnexpectedSuccess { .. } => {
                eprintln!("\nScenario aborted: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
