//! Label-based command replay
//!
//! Ledger scripts name accounts with caller-chosen labels. The `ReplayEngine`
//! binds each label to the id the ledger allocates when the account is opened,
//! and resolves labels for every later movement.

use crate::core::ledger::Ledger;
use crate::core::memory_backend::InMemoryBackend;
use crate::core::traits::StorageBackend;
use crate::types::{
    Account, AccountId, LedgerCommand, LedgerError, NewAccount, NewTransfer, TransferRequest,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ReplayEngine<B: StorageBackend = InMemoryBackend> {
    ledger: Arc<Ledger<B>>,
    labels: DashMap<String, AccountId>,
}

impl<B: StorageBackend> ReplayEngine<B> {
    pub fn new(ledger: Arc<Ledger<B>>) -> Self {
        ReplayEngine {
            ledger,
            labels: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger<B> {
        &self.ledger
    }

    /// Apply one command to the ledger
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An account label is opened twice (`Validation`)
    /// - A movement names a label that was never opened (`NotFound`)
    /// - The ledger rejects the operation
    pub fn process(&self, command: LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::OpenAccount {
                label,
                name,
                currency,
                allow_negative_balance,
                allow_positive_balance,
            } => match self.labels.entry(label) {
                Entry::Occupied(entry) => Err(LedgerError::validation(format!(
                    "account label '{}' is already in use",
                    entry.key()
                ))),
                Entry::Vacant(entry) => {
                    let id = self.ledger.create_account(
                        NewAccount::new(name, currency)
                            .allow_negative_balance(allow_negative_balance)
                            .allow_positive_balance(allow_positive_balance),
                    )?;
                    tracing::debug!(label = %entry.key(), account = %id, "Label bound");
                    entry.insert(id);
                    Ok(())
                }
            },
            LedgerCommand::Transfer {
                from,
                to,
                amount,
                event_at,
                metadata,
            } => {
                let mut transfer = NewTransfer::new(self.resolve(&from)?, self.resolve(&to)?, amount);
                transfer.event_at = event_at;
                transfer.metadata = metadata;
                self.ledger.create_transfer(transfer).map(|_| ())
            }
            LedgerCommand::Batch { batch, entries } => {
                let requests = entries
                    .iter()
                    .map(|entry| {
                        Ok(TransferRequest::new(
                            self.resolve(&entry.from)?,
                            self.resolve(&entry.to)?,
                            entry.amount,
                        ))
                    })
                    .collect::<Result<Vec<_>, LedgerError>>()?;
                let ids = self.ledger.create_transfers(requests)?;
                tracing::debug!(batch = %batch, transfers = ids.len(), "Batch applied");
                Ok(())
            }
        }
    }

    /// The account id bound to `label`
    pub fn resolve(&self, label: &str) -> Result<AccountId, LedgerError> {
        self.labels
            .get(label)
            .map(|entry| *entry.value())
            .ok_or_else(|| LedgerError::account_not_found(label))
    }

    /// Every labelled account, sorted by label
    pub fn accounts(&self) -> Result<Vec<(String, Account)>, LedgerError> {
        let mut labels: Vec<(String, AccountId)> = self
            .labels
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        labels.sort_by(|a, b| a.0.cmp(&b.0));

        let ids: Vec<AccountId> = labels.iter().map(|(_, id)| *id).collect();
        let mut by_id: HashMap<AccountId, Account> = self
            .ledger
            .lookup_accounts(&ids)?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        Ok(labels
            .into_iter()
            .filter_map(|(label, id)| by_id.remove(&id).map(|account| (label, account)))
            .collect())
    }
}
