//! Error types for the ledger
//!
//! Every ledger operation reports failure through `LedgerError`. The variants
//! mirror the failure classes a caller has to distinguish:
//!
//! - **Validation**: malformed input, never retried
//! - **NotFound**: a referenced account does not exist
//! - **BalanceConstraintViolation**: a balance would take a forbidden sign
//! - **ConcurrencyConflict**: a version check lost a race; retried internally
//!   and only surfaced once the retry budget is spent
//! - **BackendUnavailable**: the storage backend could not complete the scope

use crate::core::traits::StorageError;
use crate::types::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for ledger operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Malformed input (empty name or currency, non-positive amount,
    /// self-transfer, empty batch, ...)
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: String,
        /// The identifier (or caller label) that did not resolve
        id: String,
    },

    /// The resulting balance would violate the account's sign constraints
    #[error("Balance constraint violated for account {account}: resulting balance {balance}")]
    BalanceConstraintViolation {
        account: AccountId,
        /// The balance the mutation would have produced
        balance: Decimal,
    },

    /// The account was mutated by a concurrent writer since it was read
    #[error("Concurrent modification of account {account}")]
    ConcurrencyConflict { account: AccountId },

    /// The storage backend could not complete the atomic scope
    #[error("Storage backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }

    pub fn account_not_found(id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: "Account".to_string(),
            id: id.to_string(),
        }
    }

    pub fn balance_constraint(account: AccountId, balance: Decimal) -> Self {
        LedgerError::BalanceConstraintViolation { account, balance }
    }

    pub fn conflict(account: AccountId) -> Self {
        LedgerError::ConcurrencyConflict { account }
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        LedgerError::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Only version conflicts are retried by the transfer engine
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }
}

impl From<StorageError> for LedgerError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::VersionConflict { account } => LedgerError::conflict(account),
            StorageError::AccountNotFound(account) => LedgerError::account_not_found(account),
            other => LedgerError::backend_unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::validation(
        LedgerError::validation("amount must be positive"),
        "Validation failed: amount must be positive"
    )]
    #[case::not_found(
        LedgerError::account_not_found("alice"),
        "Account alice not found"
    )]
    #[case::backend(
        LedgerError::backend_unavailable("connection reset"),
        "Storage backend unavailable: connection reset"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_balance_constraint_display() {
        let account = AccountId::new();
        let error = LedgerError::balance_constraint(account, Decimal::new(-1050, 2));
        assert_eq!(
            error.to_string(),
            format!(
                "Balance constraint violated for account {}: resulting balance -10.50",
                account
            )
        );
    }

    #[rstest]
    #[case::conflict(LedgerError::conflict(AccountId::new()), true)]
    #[case::validation(LedgerError::validation("x"), false)]
    #[case::backend(LedgerError::backend_unavailable("x"), false)]
    #[case::balance(LedgerError::balance_constraint(AccountId::new(), Decimal::ONE), false)]
    fn test_is_retryable(#[case] error: LedgerError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn test_storage_error_conversion() {
        let account = AccountId::new();

        let error: LedgerError = StorageError::VersionConflict { account }.into();
        assert_eq!(error, LedgerError::conflict(account));

        let error: LedgerError = StorageError::AccountNotFound(account).into();
        assert!(matches!(error, LedgerError::NotFound { .. }));

        let error: LedgerError = StorageError::Unavailable("lock poisoned".to_string()).into();
        assert!(matches!(error, LedgerError::BackendUnavailable { .. }));
    }
}
