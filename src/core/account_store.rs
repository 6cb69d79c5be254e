//! Account store
//!
//! The `AccountStore` owns every account mutation. It is responsible for:
//! - Validating and opening new accounts
//! - Resolving accounts inside an atomic scope
//! - Applying signed balance deltas with a version check and the sign invariant
//!
//! It never commits: the caller decides the extent of the atomic scope that the
//! deltas belong to.

use crate::core::traits::{AtomicScope, StorageBackend};
use crate::types::{Account, AccountId, LedgerError, NewAccount};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct AccountStore<B: StorageBackend> {
    backend: Arc<B>,
}

impl<B: StorageBackend> AccountStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        AccountStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open a new account with a zero balance at version 0
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name or the currency is blank.
    pub fn create_account(&self, new: NewAccount) -> Result<AccountId, LedgerError> {
        validate_new_account(&new)?;
        let account = Account::open(&new, Utc::now());
        let id = account.id;
        self.backend.insert_account(account)?;

        tracing::info!(
            account = %id,
            currency = %new.currency.trim(),
            allow_negative = new.allow_negative_balance,
            allow_positive = new.allow_positive_balance,
            "Account created"
        );
        Ok(id)
    }

    /// Open several accounts; nothing is created unless every entry is valid
    pub fn create_accounts(&self, accounts: Vec<NewAccount>) -> Result<Vec<AccountId>, LedgerError> {
        if accounts.is_empty() {
            return Err(LedgerError::validation("at least one account is required"));
        }
        for new in &accounts {
            validate_new_account(new)?;
        }
        accounts
            .into_iter()
            .map(|new| self.create_account(new))
            .collect()
    }

    /// Committed accounts matching `ids`; unknown ids are omitted
    pub fn get_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, LedgerError> {
        Ok(self.backend.query_accounts(ids)?)
    }

    /// Resolve an account as seen from inside `scope`
    pub fn read(&self, scope: &AtomicScope<'_, B>, id: AccountId) -> Result<Account, LedgerError> {
        scope
            .read_account(id)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Add `delta` to the account balance within `scope`
    ///
    /// The write only lands if the account is still at `expected_version`, and
    /// bumps the version by exactly one.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` if the version moved since it was read
    /// - `BalanceConstraintViolation` if the new balance has a forbidden sign
    /// - `Validation` if the new balance overflows
    /// - `NotFound` if the account does not exist
    pub fn apply_delta(
        &self,
        scope: &AtomicScope<'_, B>,
        id: AccountId,
        delta: Decimal,
        expected_version: u64,
    ) -> Result<Account, LedgerError> {
        let current = self.read(scope, id)?;
        if current.version != expected_version {
            return Err(LedgerError::conflict(id));
        }

        let new_balance = current
            .balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::validation(format!("balance overflow on account {}", id)))?;

        if !current.permits_balance(new_balance) {
            return Err(LedgerError::balance_constraint(id, new_balance));
        }

        if !scope.write_account_if_version(id, new_balance, expected_version)? {
            return Err(LedgerError::conflict(id));
        }

        self.read(scope, id)
    }
}

fn validate_new_account(new: &NewAccount) -> Result<(), LedgerError> {
    if new.name.trim().is_empty() {
        return Err(LedgerError::validation("account name must not be empty"));
    }
    if new.currency.trim().is_empty() {
        return Err(LedgerError::validation("account currency must not be empty"));
    }
    Ok(())
}
