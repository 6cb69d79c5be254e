//! Read-only views over committed ledger state
//!
//! The `QueryLayer` never mutates and never opens an atomic scope. Results
//! reflect committed data only, so a read racing an in-flight transfer sees the
//! state from before or after it, never a mix.

use crate::core::traits::StorageBackend;
use crate::types::{
    Account, AccountId, LedgerError, Page, SortOrder, Transfer, TransferFilter, TransferId,
    TransferQuery,
};
use std::sync::Arc;

pub struct QueryLayer<B: StorageBackend> {
    backend: Arc<B>,
}

impl<B: StorageBackend> QueryLayer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        QueryLayer { backend }
    }

    /// Existing accounts among `ids`, ordered by id
    ///
    /// Duplicates and unknown ids are tolerated and simply produce no extra rows.
    pub fn lookup_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, LedgerError> {
        Ok(self.backend.query_accounts(ids)?)
    }

    /// Every transfer where the account is either side, most recent first
    pub fn account_transfers(&self, account_id: AccountId) -> Result<Vec<Transfer>, LedgerError> {
        let page = Page {
            order: SortOrder::Desc,
            skip: 0,
            limit: None,
        };
        Ok(self
            .backend
            .query_transfers(&TransferFilter::involving(account_id), page)?)
    }

    /// Transfers matching every provided filter, ordered and windowed by id
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the limit is zero.
    pub fn query_transfers(&self, query: &TransferQuery) -> Result<Vec<Transfer>, LedgerError> {
        if query.limit == 0 {
            return Err(LedgerError::validation("query limit must be at least 1"));
        }
        tracing::debug!(
            from = ?query.from_account_id,
            to = ?query.to_account_id,
            limit = query.limit,
            skip = query.skip,
            order = %query.order,
            "Querying transfers"
        );
        Ok(self.backend.query_transfers(&query.filter(), query.page())?)
    }

    /// Existing transfers among `ids`, ordered by id
    pub fn lookup_transfers(&self, ids: &[TransferId]) -> Result<Vec<Transfer>, LedgerError> {
        Ok(self.backend.lookup_transfers(ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::AccountStore;
    use crate::core::config::LedgerConfig;
    use crate::core::memory_backend::InMemoryBackend;
    use crate::core::transfer_engine::TransferEngine;
    use crate::types::{NewAccount, NewTransfer};
    use rust_decimal::Decimal;

    struct Fixture {
        queries: QueryLayer<InMemoryBackend>,
        a: AccountId,
        b: AccountId,
        c: AccountId,
    }

    /// Three accounts and transfers a->b, b->c, a->c, c->a, in that order
    fn fixture() -> (Fixture, Vec<TransferId>) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = AccountStore::new(Arc::clone(&backend));
        let ids = store
            .create_accounts(vec![
                NewAccount::new("A", "USD"),
                NewAccount::new("B", "USD"),
                NewAccount::new("C", "USD"),
            ])
            .unwrap();
        let engine = TransferEngine::new(Arc::clone(&backend), LedgerConfig::default());
        let fx = Fixture {
            queries: QueryLayer::new(backend),
            a: ids[0],
            b: ids[1],
            c: ids[2],
        };

        let transfers = [(fx.a, fx.b), (fx.b, fx.c), (fx.a, fx.c), (fx.c, fx.a)]
            .into_iter()
            .map(|(from, to)| {
                engine
                    .create_transfer(NewTransfer::new(from, to, Decimal::ONE))
                    .unwrap()
            })
            .collect();
        (fx, transfers)
    }

    #[test]
    fn test_lookup_accounts_is_idempotent() {
        let (fx, _) = fixture();
        let ids = [fx.c, fx.a, fx.a, AccountId::new()];

        let first = fx.queries.lookup_accounts(&ids).unwrap();
        let second = fx.queries.lookup_accounts(&ids).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(first[0].id < first[1].id);
    }

    #[test]
    fn test_account_transfers_newest_first() {
        let (fx, t) = fixture();

        let transfers = fx.queries.account_transfers(fx.a).unwrap();
        let ids: Vec<_> = transfers.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![t[3], t[2], t[0]]);
        assert!(transfers.iter().all(|transfer| transfer.involves(fx.a)));
    }

    #[test]
    fn test_query_by_from_account_ascending_limit_one() {
        let (fx, t) = fixture();

        let query = TransferQuery::new()
            .from_account(fx.a)
            .limit(1)
            .order(SortOrder::Asc);
        let transfers = fx.queries.query_transfers(&query).unwrap();

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].id, t[0]);
    }

    #[test]
    fn test_query_filters_are_conjunctive() {
        let (fx, t) = fixture();

        let query = TransferQuery::new().from_account(fx.a).to_account(fx.c);
        let transfers = fx.queries.query_transfers(&query).unwrap();

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].id, t[2]);

        let none = TransferQuery::new().from_account(fx.b).to_account(fx.a);
        assert!(fx.queries.query_transfers(&none).unwrap().is_empty());
    }

    #[test]
    fn test_query_defaults_to_descending() {
        let (fx, t) = fixture();

        let transfers = fx.queries.query_transfers(&TransferQuery::new()).unwrap();
        let ids: Vec<_> = transfers.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![t[3], t[2], t[1], t[0]]);
    }

    #[test]
    fn test_query_skip_and_limit() {
        let (fx, t) = fixture();

        let query = TransferQuery::new().skip(1).limit(2).order(SortOrder::Asc);
        let ids: Vec<_> = fx
            .queries
            .query_transfers(&query)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(ids, vec![t[1], t[2]]);
    }

    #[test]
    fn test_query_date_bounds_are_inclusive() {
        let (fx, t) = fixture();
        let second = fx.queries.lookup_transfers(&[t[1]]).unwrap().remove(0);

        let query = TransferQuery::new()
            .date_from(second.created_at)
            .date_to(second.created_at)
            .order(SortOrder::Asc);
        let transfers = fx.queries.query_transfers(&query).unwrap();

        assert!(transfers.iter().any(|transfer| transfer.id == second.id));
        assert!(transfers
            .iter()
            .all(|transfer| transfer.created_at == second.created_at));
    }

    #[test]
    fn test_query_rejects_zero_limit() {
        let (fx, _) = fixture();
        let result = fx.queries.query_transfers(&TransferQuery::new().limit(0));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_lookup_transfers_tolerates_unknown_and_duplicate_ids() {
        let (fx, t) = fixture();

        let found = fx
            .queries
            .lookup_transfers(&[t[2], TransferId::new(), t[2], t[0]])
            .unwrap();

        let ids: Vec<_> = found.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![t[0], t[2]]);
    }
}
