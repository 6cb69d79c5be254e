//! Storage backend abstraction
//!
//! The ledger core never touches persisted state directly. It drives a
//! `StorageBackend` through atomic scopes: writes made inside a scope are
//! invisible to everyone else until `commit`, and discarded by `rollback`.
//!
//! `AtomicScope` is the RAII wrapper the core actually uses. It rolls the scope
//! back on every exit path that does not reach `commit`, including early `?`
//! returns and unwinding.

use crate::types::{Account, AccountId, Page, Transfer, TransferFilter, TransferId};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A staged row was committed by someone else after this scope read it
    #[error("version conflict on account {account}")]
    VersionConflict { account: AccountId },
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("no active atomic scope {0}")]
    NoActiveScope(ScopeHandle),
    #[error("{0}")]
    Unavailable(String),
}

/// Handle to an open atomic scope
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeHandle(pub u64);

impl fmt::Display for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait StorageBackend: Send + Sync {
    // Atomic scopes
    fn begin_atomic(&self) -> Result<ScopeHandle, StorageError>;
    /// Publish every staged write at once, or none of them. The scope is
    /// released whether or not this succeeds.
    fn commit(&self, scope: ScopeHandle) -> Result<(), StorageError>;
    fn rollback(&self, scope: ScopeHandle) -> Result<(), StorageError>;

    // Scoped reads and writes, seeing the scope's own staged writes
    fn read_account(&self, scope: ScopeHandle, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Stage `new_balance` and bump the version, only if the account is at
    /// `expected_version` as seen from this scope. Returns `false` otherwise.
    fn write_account_if_version(
        &self,
        scope: ScopeHandle,
        id: AccountId,
        new_balance: Decimal,
        expected_version: u64,
    ) -> Result<bool, StorageError>;

    fn insert_transfer(&self, scope: ScopeHandle, transfer: Transfer) -> Result<(), StorageError>;

    // Single-row writes outside any scope
    fn insert_account(&self, account: Account) -> Result<(), StorageError>;

    // Committed reads
    fn query_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StorageError>;
    fn query_transfers(&self, filter: &TransferFilter, page: Page) -> Result<Vec<Transfer>, StorageError>;
    fn lookup_transfers(&self, ids: &[TransferId]) -> Result<Vec<Transfer>, StorageError>;
}

/// An open atomic scope that rolls back unless committed
pub struct AtomicScope<'a, B: StorageBackend + ?Sized> {
    backend: &'a B,
    handle: ScopeHandle,
    finished: bool,
}

impl<'a, B: StorageBackend + ?Sized> AtomicScope<'a, B> {
    pub fn begin(backend: &'a B) -> Result<Self, StorageError> {
        let handle = backend.begin_atomic()?;
        tracing::debug!(scope = %handle, "Atomic scope started");
        Ok(Self {
            backend,
            handle,
            finished: false,
        })
    }

    pub fn handle(&self) -> ScopeHandle {
        self.handle
    }

    pub fn read_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        self.backend.read_account(self.handle, id)
    }

    pub fn write_account_if_version(
        &self,
        id: AccountId,
        new_balance: Decimal,
        expected_version: u64,
    ) -> Result<bool, StorageError> {
        self.backend
            .write_account_if_version(self.handle, id, new_balance, expected_version)
    }

    pub fn insert_transfer(&self, transfer: Transfer) -> Result<(), StorageError> {
        self.backend.insert_transfer(self.handle, transfer)
    }

    pub fn commit(mut self) -> Result<(), StorageError> {
        // A failed commit has already released the scope on the backend side
        self.finished = true;
        self.backend.commit(self.handle)?;
        tracing::debug!(scope = %self.handle, "Atomic scope committed");
        Ok(())
    }
}

impl<B: StorageBackend + ?Sized> Drop for AtomicScope<'_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.backend.rollback(self.handle) {
            Ok(()) => tracing::debug!(scope = %self.handle, "Atomic scope rolled back"),
            Err(e) => tracing::warn!(scope = %self.handle, error = %e, "Rollback failed"),
        }
    }
}
