//! Transfer-related types for the ledger
//!
//! A transfer is an equal-and-opposite balance movement between two accounts.
//! `NewTransfer` is the full single-transfer form; `TransferRequest` is the
//! amount-only form accepted by batch creation.

use super::id::{AccountId, TransferId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key-value metadata attached to a transfer
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A committed transfer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,

    /// Always strictly positive
    pub amount: Decimal,

    /// Caller-supplied business time, defaulted to `created_at`
    pub event_at: DateTime<Utc>,

    /// System time of the attempt that persisted the record
    pub created_at: DateTime<Utc>,

    pub metadata: Option<Metadata>,
}

impl Transfer {
    /// Build the record for a single transfer under a pre-allocated id
    pub fn with_id(id: TransferId, new: &NewTransfer, now: DateTime<Utc>) -> Self {
        Transfer {
            id,
            from_account_id: new.from_account_id,
            to_account_id: new.to_account_id,
            amount: new.amount,
            event_at: new.event_at.unwrap_or(now),
            created_at: now,
            metadata: new.metadata.clone(),
        }
    }

    /// Build the record for a single transfer, allocating its id
    pub fn from_new(new: &NewTransfer, now: DateTime<Utc>) -> Self {
        Self::with_id(TransferId::new(), new, now)
    }

    /// Build the record for one batch entry, allocating its id
    pub fn from_request(request: &TransferRequest, now: DateTime<Utc>) -> Self {
        Self::from_new(&NewTransfer::from(*request), now)
    }

    /// Whether the account is either side of this transfer
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

/// Options for a single transfer
///
/// ```
/// use rust_ledger_engine::types::{AccountId, NewTransfer};
/// use rust_decimal::Decimal;
///
/// let (from, to) = (AccountId::new(), AccountId::new());
/// let transfer = NewTransfer::new(from, to, Decimal::new(50, 0))
///     .metadata_entry("invoice", "INV-7");
/// assert!(transfer.metadata.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub event_at: Option<DateTime<Utc>>,
    pub metadata: Option<Metadata>,
}

impl NewTransfer {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Decimal) -> Self {
        NewTransfer {
            from_account_id,
            to_account_id,
            amount,
            event_at: None,
            metadata: None,
        }
    }

    pub fn event_at(mut self, event_at: DateTime<Utc>) -> Self {
        self.event_at = Some(event_at);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn metadata_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }
}

/// One amount-only entry of a batch transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Decimal) -> Self {
        TransferRequest {
            from_account_id,
            to_account_id,
            amount,
        }
    }
}

impl From<TransferRequest> for NewTransfer {
    fn from(request: TransferRequest) -> Self {
        NewTransfer::new(request.from_account_id, request.to_account_id, request.amount)
    }
}
