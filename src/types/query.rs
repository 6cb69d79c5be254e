//! Query options for transfer history
//!
//! `TransferQuery` is the caller-facing options structure. It splits into a
//! `TransferFilter` (which rows match) and a `Page` (ordering and window), which
//! is the shape storage backends implement.

use super::id::AccountId;
use super::transfer::Transfer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of transfers returned by a query
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Ordering of query results by transfer id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    /// Accepts `ASC`, `DESC` and the legacy `DSC` spelling, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" | "DSC" => Ok(SortOrder::Desc),
            other => Err(format!("Invalid sort order '{}'", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

/// Conjunctive row predicate over transfers
///
/// A `None` field places no constraint on that dimension. Date bounds are
/// inclusive and apply to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferFilter {
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,

    /// Matches transfers where the account is either side
    pub involving: Option<AccountId>,

    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl TransferFilter {
    pub fn involving(account_id: AccountId) -> Self {
        TransferFilter {
            involving: Some(account_id),
            ..TransferFilter::default()
        }
    }

    pub fn matches(&self, transfer: &Transfer) -> bool {
        self.from_account_id
            .is_none_or(|id| transfer.from_account_id == id)
            && self.to_account_id.is_none_or(|id| transfer.to_account_id == id)
            && self.involving.is_none_or(|id| transfer.involves(id))
            && self.date_from.is_none_or(|from| transfer.created_at >= from)
            && self.date_to.is_none_or(|to| transfer.created_at <= to)
    }
}

/// Ordering and window applied after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub order: SortOrder,
    pub skip: usize,

    /// `None` returns every remaining row
    pub limit: Option<usize>,
}

/// Options for `query_transfers`
///
/// ```
/// use rust_ledger_engine::types::{AccountId, SortOrder, TransferQuery};
///
/// let account = AccountId::new();
/// let query = TransferQuery::new().from_account(account).limit(1).order(SortOrder::Asc);
/// assert_eq!(query.skip, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferQuery {
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: usize,
    pub skip: usize,
    pub order: SortOrder,
}

impl Default for TransferQuery {
    fn default() -> Self {
        TransferQuery {
            from_account_id: None,
            to_account_id: None,
            date_from: None,
            date_to: None,
            limit: DEFAULT_QUERY_LIMIT,
            skip: 0,
            order: SortOrder::Desc,
        }
    }
}

impl TransferQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_account(mut self, account_id: AccountId) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    pub fn to_account(mut self, account_id: AccountId) -> Self {
        self.to_account_id = Some(account_id);
        self
    }

    pub fn date_from(mut self, date_from: DateTime<Utc>) -> Self {
        self.date_from = Some(date_from);
        self
    }

    pub fn date_to(mut self, date_to: DateTime<Utc>) -> Self {
        self.date_to = Some(date_to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn filter(&self) -> TransferFilter {
        TransferFilter {
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            involving: None,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }

    pub fn page(&self) -> Page {
        Page {
            order: self.order,
            skip: self.skip,
            limit: Some(self.limit),
        }
    }
}
