//! Types module
//!
//! Contains core data structures used throughout the ledger:
//! - `id`: strongly-typed account and transfer identifiers
//! - `account`: account records and creation options
//! - `transfer`: transfer records and creation options
//! - `query`: transfer history filters and pagination
//! - `command`: label-based commands replayed by the CLI
//! - `error`: error taxonomy for ledger operations

pub mod account;
pub mod command;
pub mod error;
pub mod id;
pub mod query;
pub mod transfer;

pub use account::{Account, NewAccount};
pub use command::{BatchEntry, LedgerCommand};
pub use error::LedgerError;
pub use id::{AccountId, TransferId};
pub use query::{Page, SortOrder, TransferFilter, TransferQuery, DEFAULT_QUERY_LIMIT};
pub use transfer::{Metadata, NewTransfer, Transfer, TransferRequest};
