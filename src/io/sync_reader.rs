//! Synchronous CSV reader
//!
//! Streams ledger commands from a CSV file one at a time. Consecutive rows of
//! the same batch are merged before they are yielded, so every item is a
//! complete command.

use crate::io::csv_format::{convert_csv_record, BatchAssembler, CsvRecord};
use crate::types::LedgerCommand;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    assembler: BatchAssembler,
    line_num: usize,
    exhausted: bool,
}

impl SyncReader {
    /// Open a CSV file for reading
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file was opened
    /// * `Err(String)` if the file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            assembler: BatchAssembler::new(),
            line_num: 0,
            exhausted: false,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerCommand, String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted {
                return self.assembler.finish();
            }

            let Some(parsed) = self.reader.deserialize::<CsvRecord>().next() else {
                self.exhausted = true;
                continue;
            };
            self.line_num += 1;

            // Line numbers count the header row
            let line = self.line_num + 1;
            let csv_record = match parsed {
                Ok(csv_record) => csv_record,
                Err(e) => return Some(Err(format!("Line {}: CSV parse error: {}", line, e))),
            };

            let batch = csv_record.batch_id();
            let complete = match (convert_csv_record(csv_record), batch) {
                (Ok(command), _) => self.assembler.push(command),
                // A bad batch row takes the rest of its batch down with it
                (Err(e), Some(batch)) => self.assembler.poison(batch, format!("line {}: {}", line, e)),
                (Err(e), None) => return Some(Err(format!("Line {}: {}", line, e))),
            };
            if complete.is_some() {
                return complete;
            }
        }
    }
}
