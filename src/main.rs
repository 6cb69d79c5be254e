//! Ledger engine CLI
//!
//! Replays a CSV ledger script against an in-memory ledger and prints the final
//! account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledger.csv > accounts.csv
//! cargo run -- --strategy sync ledger.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 ledger.csv > accounts.csv
//! RUST_LOG=debug cargo run -- --log-json ledger.csv > accounts.csv
//! ```
//!
//! # Processing Strategies
//!
//! - **sync**: Sequential replay on the calling thread
//! - **async**: Batched reads with concurrent replay of unrelated accounts (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::logging;
use rust_ledger_engine::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();
    logging::init(&args.log_level, args.log_json);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), config, args.to_ledger_config())
    };

    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, "Replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
