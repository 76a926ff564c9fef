//! Storage seam for accounts and the action ledger

use async_trait::async_trait;
use thiserror::Error;

use crate::karma::{Account, AccountId, LedgerEvent, NewAccount, PendingEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Unique constraint hit; carries the offending field name
    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence for accounts and their ledger.
///
/// `append_event` is the only mutation of an existing account. It must apply
/// the score delta, recompute the tier, refresh `last_active` and append the
/// event as one atomic unit: either all of it is visible to readers or none.
#[async_trait]
pub trait KarmaStore: Send + Sync {
    async fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError>;

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Apply one event and return the updated account and the stored event
    async fn append_event(&self, event: PendingEvent) -> Result<(Account, LedgerEvent), StoreError>;

    /// Most recent first, at most `limit` events
    async fn recent_events(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, StoreError>;
}
