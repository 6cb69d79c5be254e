//! Asynchronous batch processing strategy
//!
//! Reads commands in batches with `csv-async` on a tokio runtime and hands each
//! batch to the `BatchProcessor`, which replays movements on disjoint groups of
//! accounts concurrently. Batches themselves are processed one after another,
//! so the final state matches a sequential replay of the same file.

use crate::core::{BatchProcessor, Ledger, LedgerConfig, ReplayEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of commands read per batch
    pub batch_size: usize,

    /// Worker threads available to concurrent groups
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a config, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    ledger_config: LedgerConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, ledger_config: LedgerConfig) -> Self {
        Self {
            config,
            ledger_config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let ledger = Arc::new(Ledger::in_memory_with(self.ledger_config.clone()));
            let replay = Arc::new(ReplayEngine::new(ledger));
            let processor = BatchProcessor::new(Arc::clone(&replay));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);

            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;

                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    match processed.result {
                        Ok(()) => applied += 1,
                        Err(_) => rejected += 1,
                    }
                }
            }
            tracing::info!(applied, rejected, "Replay finished");

            let accounts = replay
                .accounts()
                .map_err(|e| format!("Failed to read final account states: {}", e))?;

            write_accounts_csv(&accounts, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "type,account,name,currency,allow_negative,allow_positive,from,to,amount,batch,event_at,metadata\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_async_strategy_replays_transfers() {
        let file = create_temp_csv(&format!(
            "{}account,bank,Bank,USD\naccount,alice,Alice,USD,false\ntransfer,,,,,,bank,alice,50\n",
            HEADER
        ));

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), LedgerConfig::default());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,name,currency,balance,version,allow_negative_balance,allow_positive_balance\n\
             alice,Alice,USD,50,1,false,true\n\
             bank,Bank,USD,-50,1,true,true\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), LedgerConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        let file = create_temp_csv(&format!(
            "{}account,a,,USD,false\n\
             account,b,,USD\n\
             transfer,,,,,,b,a,100\n\
             transfer,,,,,,a,b,30\n\
             transfer,,,,,,a,b,20\n\
             transfer,,,,,,a,b,60\n",
            HEADER
        ));

        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, num_cpus::get()), LedgerConfig::default());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("\na,a,USD,50,3,false,true\n"), "got: {}", output_str);
        assert!(output_str.contains("\nb,b,USD,-50,3,true,true\n"), "got: {}", output_str);
    }

    #[rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_concurrency(10, 0, 10, num_cpus::get())]
    #[case::explicit(10, 4, 10, 4)]
    fn test_batch_config_zero_values_fallback(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = BatchConfig::new(batch_size, max_concurrent);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }
}
