//! Replay commands
//!
//! A ledger script refers to accounts by caller-chosen labels rather than by
//! generated ids. These commands are what the CSV readers produce and what the
//! replay engine resolves against the ledger.

use super::transfer::Metadata;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One amount-only leg of a labelled batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// A single replayable ledger operation
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Open an account and bind it to `label`
    OpenAccount {
        label: String,
        name: String,
        currency: String,
        allow_negative_balance: bool,
        allow_positive_balance: bool,
    },

    /// Move `amount` from `from` to `to`
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        event_at: Option<DateTime<Utc>>,
        metadata: Option<Metadata>,
    },

    /// Apply every entry as one atomic batch
    Batch { batch: String, entries: Vec<BatchEntry> },
}

impl LedgerCommand {
    /// Labels of every account the command touches
    pub fn labels(&self) -> Vec<&str> {
        match self {
            LedgerCommand::OpenAccount { label, .. } => vec![label.as_str()],
            LedgerCommand::Transfer { from, to, .. } => vec![from.as_str(), to.as_str()],
            LedgerCommand::Batch { entries, .. } => entries
                .iter()
                .flat_map(|entry| [entry.from.as_str(), entry.to.as_str()])
                .collect(),
        }
    }

    pub fn is_movement(&self) -> bool {
        !matches!(self, LedgerCommand::OpenAccount { .. })
    }
}
