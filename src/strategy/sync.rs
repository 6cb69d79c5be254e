//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. It orchestrates replay by coordinating between the
//! SyncReader (for CSV input) and the ReplayEngine (for ledger operations).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Label resolution and ledger calls to `ReplayEngine`
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! Commands are streamed one at a time; memory grows with the ledger itself,
//! not with the size of the input file.

use crate::core::{Ledger, LedgerConfig, ReplayEngine};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_ledger_engine::core::LedgerConfig;
/// use rust_ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("ledger.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the input file and write the final account states
    ///
    /// Rows that fail to parse and commands the ledger rejects are logged and
    /// skipped; only I/O failures abort processing.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let reader = SyncReader::new(input_path)?;
        let replay = ReplayEngine::new(Arc::new(Ledger::in_memory_with(self.config.clone())));

        let mut applied = 0usize;
        let mut rejected = 0usize;
        for command in reader {
            match command {
                Ok(command) => match replay.process(command.clone()) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        rejected += 1;
                        tracing::warn!(command = ?command, error = %e, "Command rejected");
                    }
                },
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(error = %e, "Skipping record");
                }
            }
        }
        tracing::info!(applied, rejected, "Replay finished");

        let accounts = replay
            .accounts()
            .map_err(|e| format!("Failed to read final account states: {}", e))?;
        write_accounts_csv(&accounts, output)
    }
}
