//! Rust Ledger Engine Library
//! # Overview
//!
//! This library provides a double-entry ledger core: accounts with sign
//! constraints, atomic transfers and batches under optimistic concurrency, and
//! read-only queries over the committed history. A CSV replay pipeline with a
//! sync and an async strategy sits on top of it.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transfer, queries, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - Storage backend abstraction and atomic scopes
//!   - [`core::account_store`] - Account creation and versioned balance mutation
//!   - [`core::transfer_engine`] - Atomic transfers with bounded conflict retries
//!   - [`core::query_layer`] - Committed reads
//!   - [`core::ledger`] - Facade over one backend
//! - [`io`] - CSV parsing and output
//! - [`strategy`] - Pluggable replay pipelines
//! - [`logging`] - Subscriber setup
//!
//! # Invariants
//!
//! - A negative balance requires `allow_negative_balance`, a positive balance
//!   requires `allow_positive_balance`; zero is always allowed
//! - Every transfer debits and credits the same amount, together or not at all
//! - Every balance change bumps the account version by exactly one
//!
//! ```
//! use rust_ledger_engine::{Ledger, NewAccount, NewTransfer};
//! use rust_decimal::Decimal;
//!
//! let ledger = Ledger::in_memory();
//! let a = ledger.create_account(NewAccount::new("A", "USD")).unwrap();
//! let b = ledger.create_account(NewAccount::new("B", "USD")).unwrap();
//! ledger.create_transfer(NewTransfer::new(a, b, Decimal::new(50, 0))).unwrap();
//!
//! let accounts = ledger.lookup_accounts(&[a, b]).unwrap();
//! let total: Decimal = accounts.iter().map(|account| account.balance).sum();
//! assert_eq!(total, Decimal::ZERO);
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{InMemoryBackend, Ledger, LedgerConfig, StorageBackend};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, LedgerError, NewAccount, NewTransfer, SortOrder, Transfer, TransferId,
    TransferQuery, TransferRequest,
};
