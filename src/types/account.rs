//! Account-related types for the ledger
//!
//! This module defines the Account record and the options structure used to
//! open a new account.

use super::id::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A balance-holding ledger account
///
/// Everything except `balance`, `version` and `updated_at` is fixed at creation.
/// Those three fields only move when a transfer touching the account commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    /// Display name, not required to be unique
    pub name: String,

    /// Currency code; transfers only move funds between accounts of one currency
    pub currency: String,

    /// Current balance, positive or negative depending on the allow flags
    pub balance: Decimal,

    /// Optimistic concurrency counter
    ///
    /// Starts at 0 and is bumped by exactly one for every balance mutation.
    pub version: u64,

    pub allow_negative_balance: bool,
    pub allow_positive_balance: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open an account from validated options with a zero balance at version 0
    pub fn open(new: &NewAccount, now: DateTime<Utc>) -> Self {
        Account {
            id: AccountId::new(),
            name: new.name.trim().to_string(),
            currency: new.currency.trim().to_string(),
            balance: Decimal::ZERO,
            version: 0,
            allow_negative_balance: new.allow_negative_balance,
            allow_positive_balance: new.allow_positive_balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `balance` is reachable under this account's sign constraints
    ///
    /// Zero is always permitted.
    pub fn permits_balance(&self, balance: Decimal) -> bool {
        if balance < Decimal::ZERO {
            self.allow_negative_balance
        } else if balance > Decimal::ZERO {
            self.allow_positive_balance
        } else {
            true
        }
    }
}

/// Options for opening an account
///
/// Both balance flags default to `true`; an explicit `false` is always kept.
///
/// ```
/// use rust_ledger_engine::types::NewAccount;
///
/// let cash = NewAccount::new("Cash", "USD").allow_negative_balance(false);
/// assert!(!cash.allow_negative_balance);
/// assert!(cash.allow_positive_balance);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub currency: String,
    pub allow_negative_balance: bool,
    pub allow_positive_balance: bool,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        NewAccount {
            name: name.into(),
            currency: currency.into(),
            allow_negative_balance: true,
            allow_positive_balance: true,
        }
    }

    pub fn allow_negative_balance(mut self, allow: bool) -> Self {
        self.allow_negative_balance = allow;
        self
    }

    pub fn allow_positive_balance(mut self, allow: bool) -> Self {
        self.allow_positive_balance = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn account(allow_negative: bool, allow_positive: bool) -> Account {
        let new = NewAccount::new("test", "USD")
            .allow_negative_balance(allow_negative)
            .allow_positive_balance(allow_positive);
        Account::open(&new, Utc::now())
    }

    #[test]
    fn test_open_starts_at_zero_and_version_zero() {
        let account = Account::open(&NewAccount::new("  Alice ", " USD"), Utc::now());

        assert_eq!(account.name, "Alice");
        assert_eq!(account.currency, "USD");
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.version, 0);
        assert!(account.allow_negative_balance);
        assert!(account.allow_positive_balance);
        assert_eq!(account.created_at, account.updated_at);
    }

    #[rstest]
    #[case::zero_always_allowed(false, false, Decimal::ZERO, true)]
    #[case::negative_allowed(true, false, Decimal::new(-5, 0), true)]
    #[case::negative_forbidden(false, true, Decimal::new(-5, 0), false)]
    #[case::positive_allowed(false, true, Decimal::new(5, 0), true)]
    #[case::positive_forbidden(true, false, Decimal::new(5, 0), false)]
    #[case::scaled_zero(false, false, Decimal::new(0, 4), true)]
    fn test_permits_balance(
        #[case] allow_negative: bool,
        #[case] allow_positive: bool,
        #[case] balance: Decimal,
        #[case] expected: bool,
    ) {
        assert_eq!(
            account(allow_negative, allow_positive).permits_balance(balance),
            expected
        );
    }
}
