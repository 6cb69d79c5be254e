//! CSV format handling for ledger scripts and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to ledger commands
//! - Assembly of consecutive batch rows into one atomic batch
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, BatchEntry, LedgerCommand, Metadata};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `type,account,name,currency,allow_negative,allow_positive,from,to,amount,batch,event_at,metadata`
///
/// Every column except `type` is optional, and trailing columns may be omitted,
/// because account rows and transfer rows use disjoint sets of fields.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub account: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub allow_negative: Option<String>,
    pub allow_positive: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub batch: Option<String>,
    pub event_at: Option<String>,
    pub metadata: Option<String>,
}

impl CsvRecord {
    /// The trimmed `batch` column, read without converting the rest of the row
    pub fn batch_id(&self) -> Option<String> {
        present(self.batch.clone())
    }
}

/// Convert a CsvRecord to a LedgerCommand
///
/// This function:
/// - Parses the record type (`account` or `transfer`, case-insensitive)
/// - Defaults an account's name to its label and both allow flags to `true`
/// - Parses amounts, RFC 3339 event times and JSON object metadata
/// - Turns a transfer row with a `batch` id into a one-entry batch
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(LedgerCommand) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerCommand, String> {
    match csv_record.record_type.trim().to_lowercase().as_str() {
        "account" => convert_account(csv_record),
        "transfer" => convert_transfer(csv_record),
        _ => Err(format!(
            "Invalid record type: '{}'",
            csv_record.record_type
        )),
    }
}

fn convert_account(csv_record: CsvRecord) -> Result<LedgerCommand, String> {
    let label = required(csv_record.account, "account", "account")?;
    let name = present(csv_record.name).unwrap_or_else(|| label.clone());

    Ok(LedgerCommand::OpenAccount {
        name,
        currency: present(csv_record.currency).unwrap_or_default(),
        allow_negative_balance: parse_flag(csv_record.allow_negative, "allow_negative", &label)?,
        allow_positive_balance: parse_flag(csv_record.allow_positive, "allow_positive", &label)?,
        label,
    })
}

fn convert_transfer(csv_record: CsvRecord) -> Result<LedgerCommand, String> {
    let from = required(csv_record.from, "from", "transfer")?;
    let to = required(csv_record.to, "to", "transfer")?;
    let amount_str = required(csv_record.amount, "amount", "transfer")?;
    let amount = Decimal::from_str(&amount_str).map_err(|_| {
        format!(
            "Invalid amount '{}' for transfer {} -> {}",
            amount_str, from, to
        )
    })?;

    let event_at = present(csv_record.event_at)
        .map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| format!("Invalid event_at '{}': {}", value, e))
        })
        .transpose()?;

    let metadata = present(csv_record.metadata)
        .map(|value| {
            serde_json::from_str::<Metadata>(&value)
                .map_err(|e| format!("Invalid metadata '{}': expected a JSON object ({})", value, e))
        })
        .transpose()?;

    match present(csv_record.batch) {
        Some(batch) => {
            if event_at.is_some() || metadata.is_some() {
                return Err(format!(
                    "Batch '{}' entries are amount-only; event_at and metadata are not supported",
                    batch
                ));
            }
            Ok(LedgerCommand::Batch {
                batch,
                entries: vec![BatchEntry { from, to, amount }],
            })
        }
        None => Ok(LedgerCommand::Transfer {
            from,
            to,
            amount,
            event_at,
            metadata,
        }),
    }
}

/// Trimmed value, treating blank fields as absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str, record: &str) -> Result<String, String> {
    present(value).ok_or_else(|| format!("{} record requires '{}'", record, field))
}

/// Parse an allow flag; only a blank value falls back to `true`
fn parse_flag(value: Option<String>, field: &str, label: &str) -> Result<bool, String> {
    let Some(value) = present(value) else {
        return Ok(true);
    };
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!(
            "Invalid {} '{}' for account {}",
            field, value, label
        )),
    }
}

/// Merges consecutive single-entry batch commands that share a batch id
///
/// Commands come out one step behind the input, so the caller must drain
/// `finish` once the input is exhausted.
///
/// A batch with a malformed row is poisoned: every row of the group is
/// dropped and the whole group comes out as a single `Err`, so no part of it
/// ever reaches the ledger.
#[derive(Debug, Default)]
pub struct BatchAssembler {
    pending: Option<Pending>,
}

#[derive(Debug)]
enum Pending {
    Command(LedgerCommand),
    Poisoned { batch: String, reason: String },
}

impl Pending {
    fn batch_id(&self) -> Option<&str> {
        match self {
            Pending::Command(LedgerCommand::Batch { batch, .. }) => Some(batch),
            Pending::Command(_) => None,
            Pending::Poisoned { batch, .. } => Some(batch),
        }
    }

    fn into_result(self) -> Result<LedgerCommand, String> {
        match self {
            Pending::Command(command) => Ok(command),
            Pending::Poisoned { batch, reason } => {
                Err(format!("Batch '{}' rejected: {}", batch, reason))
            }
        }
    }
}

impl BatchAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next command and get back the previous one if it is complete
    pub fn push(&mut self, command: LedgerCommand) -> Option<Result<LedgerCommand, String>> {
        match (&mut self.pending, &command) {
            (
                Some(Pending::Command(LedgerCommand::Batch { batch, entries })),
                LedgerCommand::Batch {
                    batch: next_batch,
                    entries: next_entries,
                },
            ) if *batch == *next_batch => {
                entries.extend(next_entries.iter().cloned());
                return None;
            }
            (
                Some(Pending::Poisoned { batch, .. }),
                LedgerCommand::Batch {
                    batch: next_batch, ..
                },
            ) if *batch == *next_batch => return None,
            _ => {}
        }
        self.emit(Pending::Command(command))
    }

    /// Mark `batch` as containing a malformed row
    ///
    /// Rows of the batch already merged are discarded, and later consecutive
    /// rows with the same id are swallowed. The first `reason` is kept.
    pub fn poison(&mut self, batch: String, reason: String) -> Option<Result<LedgerCommand, String>> {
        if self.pending.as_ref().and_then(Pending::batch_id) == Some(batch.as_str()) {
            if !matches!(self.pending, Some(Pending::Poisoned { .. })) {
                self.pending = Some(Pending::Poisoned { batch, reason });
            }
            return None;
        }
        self.emit(Pending::Poisoned { batch, reason })
    }

    /// The last command still held back, if any
    pub fn finish(&mut self) -> Option<Result<LedgerCommand, String>> {
        self.pending.take().map(Pending::into_result)
    }

    fn emit(&mut self, next: Pending) -> Option<Result<LedgerCommand, String>> {
        self.pending.replace(next).map(Pending::into_result)
    }
}

/// Write labelled account states to CSV format
///
/// Writes accounts in CSV format with columns:
/// account, name, currency, balance, version, allow_negative_balance, allow_positive_balance.
/// Accounts are sorted by label for deterministic output, and balances are
/// written without trailing zeros.
///
/// # Arguments
///
/// * `accounts` - Slice of (label, account) pairs to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[(String, Account)], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "account",
            "name",
            "currency",
            "balance",
            "version",
            "allow_negative_balance",
            "allow_positive_balance",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&(String, Account)> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.0.cmp(&b.0));

    for (label, account) in sorted_accounts {
        writer
            .write_record(&[
                label.clone(),
                account.name.clone(),
                account.currency.clone(),
                account.balance.normalize().to_string(),
                account.version.to_string(),
                account.allow_negative_balance.to_string(),
                account.allow_positive_balance.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
