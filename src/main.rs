//! Budget CSV Import CLI
//!
//! Command-line interface for mapping bank statement CSV files onto
//! transactions and importing them.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --mapping profile.json statement.csv > report.csv
//! cargo run -- --mapping profile.json --accounts accounts.csv statement.csv > report.csv
//! cargo run -- --strategy import --mapping profile.json --api-url http://localhost:8080/api statement.csv
//! cargo run -- --strategy import --mapping profile.json --api-url http://localhost:8080/api \
//!     --batch-size 50 --retry-attempts 2 --continue-on-error statement.csv
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad arguments, unreadable file or mapping, failed import, etc.)

use budget_csv_import::cli::{self, CliArgs};
use budget_csv_import::core::MappingOptions;
use budget_csv_import::io::read_accounts_csv;
use budget_csv_import::strategy::{self, StrategyOptions};
use budget_csv_import::ImportError;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_options(args: &CliArgs) -> Result<StrategyOptions, ImportError> {
    let csv = args.to_csv_options().ok_or_else(|| {
        ImportError::invalid_config(format!(
            "delimiter {:?} is not a single ASCII character",
            args.delimiter
        ))
    })?;

    let accounts = args
        .accounts
        .as_deref()
        .map(read_accounts_csv)
        .transpose()?;

    Ok(StrategyOptions {
        mapping: MappingOptions::from_json_file(&args.mapping)?,
        csv,
        config: args.to_import_config(),
        accounts,
        api_url: args.api_url.clone(),
        api_token: args.api_token.clone(),
    })
}

fn run(args: &CliArgs) -> Result<(), ImportError> {
    let options = build_options(args)?;
    let strategy = strategy::create_strategy(args.strategy, options)?;

    // Output goes to stdout
    let mut output = std::io::stdout();
    strategy.run(&args.input_file, &mut output)
}

fn main() {
    let args = cli::parse_args();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}
