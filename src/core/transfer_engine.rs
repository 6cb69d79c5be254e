//! Transfer processing engine
//!
//! The `TransferEngine` turns transfer requests into balance movements. It holds
//! no state of its own: every attempt opens one atomic scope, moves funds through
//! the `AccountStore`, records the transfers and commits.
//!
//! The engine enforces:
//! - Positive amounts and distinct endpoints
//! - Matching currencies on both sides of a transfer
//! - All-or-nothing application of single transfers and batches
//! - Bounded retries when a concurrent writer wins a version race

use crate::core::account_store::AccountStore;
use crate::core::config::LedgerConfig;
use crate::core::traits::{AtomicScope, StorageBackend};
use crate::types::{AccountId, LedgerError, NewTransfer, Transfer, TransferId, TransferRequest};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;

pub struct TransferEngine<B: StorageBackend> {
    accounts: AccountStore<B>,
    config: LedgerConfig,
}

impl<B: StorageBackend> TransferEngine<B> {
    pub fn new(backend: Arc<B>, config: LedgerConfig) -> Self {
        TransferEngine {
            accounts: AccountStore::new(backend),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Move `amount` from one account to another
    ///
    /// # Arguments
    ///
    /// * `new` - Endpoints, amount and the optional event time and metadata
    ///
    /// # Returns
    ///
    /// The id of the committed transfer
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive, the endpoints are equal or the currencies differ
    /// - Either account does not exist
    /// - The debit or credit would violate a sign constraint
    /// - Version conflicts outlast the retry budget
    /// - The storage backend fails
    pub fn create_transfer(&self, new: NewTransfer) -> Result<TransferId, LedgerError> {
        validate_movement(new.from_account_id, new.to_account_id, new.amount)?;

        let id = TransferId::new();
        let (from, to, amount) = (new.from_account_id, new.to_account_id, new.amount);
        self.commit_with_retry(&[(id, new)])?;

        tracing::info!(
            transfer = %id,
            from = %from,
            to = %to,
            amount = %amount,
            "Transfer committed"
        );
        Ok(id)
    }

    /// Apply every request as one atomic batch, in list order
    ///
    /// Later entries see the balances left by earlier ones. Either every
    /// transfer commits or none does. Returned ids follow the request order.
    pub fn create_transfers(&self, requests: Vec<TransferRequest>) -> Result<Vec<TransferId>, LedgerError> {
        if requests.is_empty() {
            return Err(LedgerError::validation("at least one transfer is required"));
        }
        for request in &requests {
            validate_movement(request.from_account_id, request.to_account_id, request.amount)?;
        }

        // Ids are fixed before the first attempt so retries reuse them
        let transfers: Vec<(TransferId, NewTransfer)> = requests
            .into_iter()
            .map(|request| (TransferId::new(), NewTransfer::from(request)))
            .collect();

        self.commit_with_retry(&transfers)?;

        tracing::info!(count = transfers.len(), "Transfer batch committed");
        Ok(transfers.iter().map(|(id, _)| *id).collect())
    }

    fn commit_with_retry(&self, transfers: &[(TransferId, NewTransfer)]) -> Result<(), LedgerError> {
        let mut retries = 0;
        loop {
            match self.apply(transfers) {
                Err(e) if e.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        retry = retries,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Version conflict, retrying"
                    );
                    thread::sleep(self.config.retry_backoff * retries);
                }
                result => return result,
            }
        }
    }

    /// One attempt: a fresh scope, fresh reads, commit or roll back
    fn apply(&self, transfers: &[(TransferId, NewTransfer)]) -> Result<(), LedgerError> {
        let scope = AtomicScope::begin(self.accounts.backend())?;

        // Records are stamped per attempt; only the ids survive a retry
        let now = Utc::now();
        let records: Vec<Transfer> = transfers
            .iter()
            .map(|(id, new)| Transfer::with_id(*id, new, now))
            .collect();

        // Unknown accounts abort before anything is staged
        for transfer in &records {
            self.accounts.read(&scope, transfer.from_account_id)?;
            self.accounts.read(&scope, transfer.to_account_id)?;
        }

        for transfer in records {
            self.apply_one(&scope, transfer)?;
        }

        scope.commit()?;
        Ok(())
    }

    fn apply_one(&self, scope: &AtomicScope<'_, B>, transfer: Transfer) -> Result<(), LedgerError> {
        let from = self.accounts.read(scope, transfer.from_account_id)?;
        let to = self.accounts.read(scope, transfer.to_account_id)?;

        if from.currency != to.currency {
            return Err(LedgerError::validation(format!(
                "currency mismatch: {} is {}, {} is {}",
                from.id, from.currency, to.id, to.currency
            )));
        }

        self.accounts
            .apply_delta(scope, from.id, -transfer.amount, from.version)?;
        self.accounts
            .apply_delta(scope, to.id, transfer.amount, to.version)?;
        scope.insert_transfer(transfer)?;
        Ok(())
    }
}

fn validate_movement(from: AccountId, to: AccountId, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "transfer amount must be positive, got {}",
            amount
        )));
    }
    if from == to {
        return Err(LedgerError::validation(format!(
            "cannot transfer from account {} to itself",
            from
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory_backend::InMemoryBackend;
    use crate::types::{Account, NewAccount};
    use rstest::rstest;
    use std::str::FromStr;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        store: AccountStore<InMemoryBackend>,
        engine: TransferEngine<InMemoryBackend>,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(InMemoryBackend::new());
            Fixture {
                store: AccountStore::new(Arc::clone(&backend)),
                engine: TransferEngine::new(Arc::clone(&backend), LedgerConfig::default()),
                backend,
            }
        }

        fn open(&self, new: NewAccount) -> AccountId {
            self.store.create_account(new).unwrap()
        }

        fn account(&self, id: AccountId) -> Account {
            self.store.get_accounts(&[id]).unwrap().remove(0)
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_transfer_moves_funds_and_bumps_versions() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD"));

        let id = fx.engine.create_transfer(NewTransfer::new(a, b, dec("50"))).unwrap();

        let (a, b) = (fx.account(a), fx.account(b));
        assert_eq!(a.balance, dec("-50"));
        assert_eq!(b.balance, dec("50"));
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 1);

        let stored = fx.backend.lookup_transfers(&[id]).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_at, stored[0].created_at);
        assert_eq!(fx.backend.open_scopes(), 0);
    }

    #[test]
    fn test_transfer_keeps_event_time_and_metadata() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD"));
        let event_at = chrono::DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);

        let id = fx
            .engine
            .create_transfer(
                NewTransfer::new(a, b, dec("1.25"))
                    .event_at(event_at)
                    .metadata_entry("invoice", "INV-1"),
            )
            .unwrap();

        let stored = fx.backend.lookup_transfers(&[id]).unwrap().remove(0);
        assert_eq!(stored.event_at, event_at);
        assert_eq!(
            stored.metadata.unwrap().get("invoice"),
            Some(&serde_json::json!("INV-1"))
        );
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-5")]
    fn test_non_positive_amount_is_rejected(#[case] amount: &str) {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD"));

        let result = fx.engine.create_transfer(NewTransfer::new(a, b, dec(amount)));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert_eq!(fx.account(a).version, 0);
    }

    #[test]
    fn test_self_transfer_is_rejected() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));

        let result = fx.engine.create_transfer(NewTransfer::new(a, a, dec("1")));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_unknown_account_aborts_without_mutation() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));

        let result = fx
            .engine
            .create_transfer(NewTransfer::new(a, AccountId::new(), dec("1")));
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));

        let a = fx.account(a);
        assert_eq!(a.balance, Decimal::ZERO);
        assert_eq!(a.version, 0);
    }

    #[test]
    fn test_currency_mismatch_is_rejected() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "EUR"));

        let result = fx.engine.create_transfer(NewTransfer::new(a, b, dec("1")));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert_eq!(fx.account(a).balance, Decimal::ZERO);
    }

    #[test]
    fn test_balance_constraint_leaves_both_sides_untouched() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD").allow_negative_balance(false));
        let b = fx.open(NewAccount::new("B", "USD"));

        let result = fx.engine.create_transfer(NewTransfer::new(a, b, dec("10")));
        assert_eq!(result, Err(LedgerError::balance_constraint(a, dec("-10"))));

        assert_eq!(fx.account(a).balance, Decimal::ZERO);
        assert_eq!(fx.account(b).balance, Decimal::ZERO);
        assert!(fx.backend.query_transfers(&Default::default(), Default::default()).unwrap().is_empty());
    }

    #[test]
    fn test_batch_is_atomic() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD").allow_negative_balance(false));
        let c = fx.open(NewAccount::new("C", "USD"));

        let result = fx.engine.create_transfers(vec![
            TransferRequest::new(a, b, dec("100")),
            TransferRequest::new(b, c, dec("1000000")),
        ]);
        assert!(matches!(
            result,
            Err(LedgerError::BalanceConstraintViolation { account, .. }) if account == b
        ));

        for id in [a, b, c] {
            let account = fx.account(id);
            assert_eq!(account.balance, Decimal::ZERO);
            assert_eq!(account.version, 0);
        }
    }

    #[test]
    fn test_batch_entries_see_earlier_entries() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD").allow_negative_balance(false));
        let c = fx.open(NewAccount::new("C", "USD"));

        let ids = fx
            .engine
            .create_transfers(vec![
                TransferRequest::new(a, b, dec("100")),
                TransferRequest::new(b, c, dec("60")),
            ])
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
        assert_eq!(fx.account(a).balance, dec("-100"));
        assert_eq!(fx.account(b).balance, dec("40"));
        assert_eq!(fx.account(b).version, 2);
        assert_eq!(fx.account(c).balance, dec("60"));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.engine.create_transfers(vec![]),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn test_malformed_batch_entry_rejects_whole_batch() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD"));

        let result = fx.engine.create_transfers(vec![
            TransferRequest::new(a, b, dec("5")),
            TransferRequest::new(b, b, dec("5")),
        ]);
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert_eq!(fx.account(a).balance, Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_balance_is_rejected() {
        let fx = Fixture::new();
        let a = fx.open(NewAccount::new("A", "USD"));
        let b = fx.open(NewAccount::new("B", "USD"));

        fx.engine
            .create_transfer(NewTransfer::new(a, b, Decimal::MAX))
            .unwrap();
        let result = fx.engine.create_transfer(NewTransfer::new(a, b, Decimal::MAX));

        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert_eq!(fx.account(b).balance, Decimal::MAX);
    }
}
