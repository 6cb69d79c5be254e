//! In-memory storage backend
//!
//! Committed rows live in id-ordered `BTreeMap`s behind `RwLock`s. Every open
//! atomic scope owns a `PendingScope` in a `DashMap`, holding its staged account
//! rows (with the committed version they were based on) and staged transfers.
//!
//! # Commit protocol
//!
//! `commit` removes the pending scope, takes the accounts write lock, checks that
//! every staged row's base version still matches the committed row, and only then
//! publishes all rows and transfers. A mismatch discards the scope and reports
//! `VersionConflict`, so a losing writer never leaves a partial write behind.
//!
//! Lock order is accounts before transfers. Readers take one lock at a time.

use crate::core::traits::{ScopeHandle, StorageBackend, StorageError};
use crate::types::{Account, AccountId, Page, SortOrder, Transfer, TransferFilter, TransferId};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StagedAccount {
    /// Committed version this scope first read
    base_version: u64,
    account: Account,
}

#[derive(Debug, Default)]
struct PendingScope {
    accounts: HashMap<AccountId, StagedAccount>,
    transfers: Vec<Transfer>,
}

/// Process-local backend with optimistic, all-or-nothing commits
#[derive(Debug)]
pub struct InMemoryBackend {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
    transfers: RwLock<BTreeMap<TransferId, Transfer>>,
    scopes: DashMap<ScopeHandle, PendingScope>,
    scope_counter: AtomicU64,
}

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::Unavailable("storage lock poisoned".to_string())
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            transfers: RwLock::new(BTreeMap::new()),
            scopes: DashMap::new(),
            scope_counter: AtomicU64::new(1),
        }
    }

    /// Number of scopes begun but not yet committed or rolled back
    pub fn open_scopes(&self) -> usize {
        self.scopes.len()
    }

    fn committed_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.get(&id).cloned())
    }

    fn staged_account(&self, scope: ScopeHandle, id: AccountId) -> Result<Option<StagedAccount>, StorageError> {
        let pending = self
            .scopes
            .get(&scope)
            .ok_or(StorageError::NoActiveScope(scope))?;
        Ok(pending.accounts.get(&id).cloned())
    }
}

impl StorageBackend for InMemoryBackend {
    fn begin_atomic(&self) -> Result<ScopeHandle, StorageError> {
        let handle = ScopeHandle(self.scope_counter.fetch_add(1, Ordering::SeqCst));
        self.scopes.insert(handle, PendingScope::default());
        Ok(handle)
    }

    fn commit(&self, scope: ScopeHandle) -> Result<(), StorageError> {
        let (_, pending) = self
            .scopes
            .remove(&scope)
            .ok_or(StorageError::NoActiveScope(scope))?;

        let mut accounts = self.accounts.write().map_err(poisoned)?;
        for (id, staged) in &pending.accounts {
            let committed = accounts.get(id).ok_or(StorageError::AccountNotFound(*id))?;
            if committed.version != staged.base_version {
                return Err(StorageError::VersionConflict { account: *id });
            }
        }

        let mut transfers = self.transfers.write().map_err(poisoned)?;
        for transfer in &pending.transfers {
            if transfers.contains_key(&transfer.id) {
                return Err(StorageError::DuplicateKey(transfer.id.to_string()));
            }
        }

        for (id, staged) in pending.accounts {
            accounts.insert(id, staged.account);
        }
        for transfer in pending.transfers {
            transfers.insert(transfer.id, transfer);
        }
        Ok(())
    }

    fn rollback(&self, scope: ScopeHandle) -> Result<(), StorageError> {
        self.scopes
            .remove(&scope)
            .map(|_| ())
            .ok_or(StorageError::NoActiveScope(scope))
    }

    fn read_account(&self, scope: ScopeHandle, id: AccountId) -> Result<Option<Account>, StorageError> {
        match self.staged_account(scope, id)? {
            Some(staged) => Ok(Some(staged.account)),
            None => self.committed_account(id),
        }
    }

    fn write_account_if_version(
        &self,
        scope: ScopeHandle,
        id: AccountId,
        new_balance: Decimal,
        expected_version: u64,
    ) -> Result<bool, StorageError> {
        let staged = match self.staged_account(scope, id)? {
            Some(staged) => staged,
            None => {
                let committed = self
                    .committed_account(id)?
                    .ok_or(StorageError::AccountNotFound(id))?;
                StagedAccount {
                    base_version: committed.version,
                    account: committed,
                }
            }
        };

        if staged.account.version != expected_version {
            return Ok(false);
        }

        let mut account = staged.account;
        account.balance = new_balance;
        account.version = expected_version + 1;
        account.updated_at = Utc::now();

        let mut pending = self
            .scopes
            .get_mut(&scope)
            .ok_or(StorageError::NoActiveScope(scope))?;
        pending.accounts.insert(
            id,
            StagedAccount {
                base_version: staged.base_version,
                account,
            },
        );
        Ok(true)
    }

    fn insert_transfer(&self, scope: ScopeHandle, transfer: Transfer) -> Result<(), StorageError> {
        let mut pending = self
            .scopes
            .get_mut(&scope)
            .ok_or(StorageError::NoActiveScope(scope))?;
        pending.transfers.push(transfer);
        Ok(())
    }

    fn insert_account(&self, account: Account) -> Result<(), StorageError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.contains_key(&account.id) {
            return Err(StorageError::DuplicateKey(account.id.to_string()));
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    fn query_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StorageError> {
        let wanted: BTreeSet<AccountId> = ids.iter().copied().collect();
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(wanted
            .into_iter()
            .filter_map(|id| accounts.get(&id).cloned())
            .collect())
    }

    fn query_transfers(&self, filter: &TransferFilter, page: Page) -> Result<Vec<Transfer>, StorageError> {
        let transfers = self.transfers.read().map_err(poisoned)?;
        let ordered: Box<dyn Iterator<Item = &Transfer> + '_> = match page.order {
            SortOrder::Asc => Box::new(transfers.values()),
            SortOrder::Desc => Box::new(transfers.values().rev()),
        };
        let matching = ordered
            .filter(|transfer| filter.matches(transfer))
            .skip(page.skip);

        Ok(match page.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }

    fn lookup_transfers(&self, ids: &[TransferId]) -> Result<Vec<Transfer>, StorageError> {
        let wanted: BTreeSet<TransferId> = ids.iter().copied().collect();
        let transfers = self.transfers.read().map_err(poisoned)?;
        Ok(wanted
            .into_iter()
            .filter_map(|id| transfers.get(&id).cloned())
            .collect())
    }
}
