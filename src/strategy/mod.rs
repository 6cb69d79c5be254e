//! Processing strategy module for ledger replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger processing. This allows different
//! processing implementations (synchronous, asynchronous batch) to be selected at runtime.

use crate::cli::StrategyType;
use crate::core::LedgerConfig;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads ledger commands from a CSV file, replays them against a
/// fresh ledger and writes the final account states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay commands from the input file and write results to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file containing ledger commands
    /// * `output` - Mutable reference to a writer for outputting account states
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all processing completed (possibly with rejected commands)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// Rejected commands and malformed rows are logged and skipped; they never
    /// cause this method to return an error.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Which pipeline to build
/// * `config` - Batch settings, only used by the async strategy
/// * `ledger_config` - Retry settings for the ledger the strategy replays into
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    ledger_config: LedgerConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger_config)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, ledger_config))
        }
    }
}
