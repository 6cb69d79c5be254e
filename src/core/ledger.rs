//! Ledger facade
//!
//! `Ledger` is the single entry point callers use. It wires the account store,
//! the transfer engine and the query layer to one shared storage backend.
//!
//! # Architecture
//!
//! ```text
//! Ledger<B>
//!     ├── AccountStore<B>    (account creation)
//!     ├── TransferEngine<B>  (atomic transfers and batches)
//!     └── QueryLayer<B>      (committed reads)
//!            └── Arc<B: StorageBackend>
//! ```
//!
//! The ledger is `Send + Sync` whenever the backend is, and can be shared across
//! threads behind an `Arc`.

use crate::core::account_store::AccountStore;
use crate::core::config::LedgerConfig;
use crate::core::memory_backend::InMemoryBackend;
use crate::core::query_layer::QueryLayer;
use crate::core::traits::StorageBackend;
use crate::core::transfer_engine::TransferEngine;
use crate::types::{
    Account, AccountId, LedgerError, NewAccount, NewTransfer, Transfer, TransferId, TransferQuery,
    TransferRequest,
};
use std::sync::Arc;

pub struct Ledger<B: StorageBackend = InMemoryBackend> {
    accounts: AccountStore<B>,
    transfers: TransferEngine<B>,
    queries: QueryLayer<B>,
}

impl Ledger<InMemoryBackend> {
    /// A ledger over a fresh in-memory backend with default settings
    pub fn in_memory() -> Self {
        Self::in_memory_with(LedgerConfig::default())
    }

    pub fn in_memory_with(config: LedgerConfig) -> Self {
        Self::new(Arc::new(InMemoryBackend::new()), config)
    }
}

impl<B: StorageBackend> Ledger<B> {
    pub fn new(backend: Arc<B>, config: LedgerConfig) -> Self {
        Ledger {
            accounts: AccountStore::new(Arc::clone(&backend)),
            transfers: TransferEngine::new(Arc::clone(&backend), config),
            queries: QueryLayer::new(backend),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        self.transfers.config()
    }

    /// Open an account with a zero balance
    ///
    /// ```
    /// use rust_ledger_engine::{Ledger, NewAccount};
    ///
    /// let ledger = Ledger::in_memory();
    /// let id = ledger.create_account(NewAccount::new("Alice", "USD")).unwrap();
    /// let accounts = ledger.lookup_accounts(&[id]).unwrap();
    /// assert_eq!(accounts[0].balance.to_string(), "0");
    /// ```
    pub fn create_account(&self, new: NewAccount) -> Result<AccountId, LedgerError> {
        self.accounts.create_account(new)
    }

    pub fn create_accounts(&self, accounts: Vec<NewAccount>) -> Result<Vec<AccountId>, LedgerError> {
        self.accounts.create_accounts(accounts)
    }

    pub fn lookup_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, LedgerError> {
        self.queries.lookup_accounts(ids)
    }

    pub fn create_transfer(&self, new: NewTransfer) -> Result<TransferId, LedgerError> {
        self.transfers.create_transfer(new)
    }

    pub fn create_transfers(&self, requests: Vec<TransferRequest>) -> Result<Vec<TransferId>, LedgerError> {
        self.transfers.create_transfers(requests)
    }

    pub fn account_transfers(&self, account_id: AccountId) -> Result<Vec<Transfer>, LedgerError> {
        self.queries.account_transfers(account_id)
    }

    pub fn query_transfers(&self, query: &TransferQuery) -> Result<Vec<Transfer>, LedgerError> {
        self.queries.query_transfers(query)
    }

    pub fn lookup_transfers(&self, ids: &[TransferId]) -> Result<Vec<Transfer>, LedgerError> {
        self.queries.lookup_transfers(ids)
    }
}
