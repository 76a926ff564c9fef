//! In-memory store, used when PostgreSQL is disabled and in tests

use async_trait::async_trait;
use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::store::{KarmaStore, StoreError};
use crate::karma::{Account, AccountId, LedgerEvent, NewAccount, PendingEvent, Tier};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    /// Per-account ledger in append order
    events: HashMap<AccountId, Vec<LedgerEvent>>,
    next_event_id: i64,
}

/// Account table and ledger behind a single lock, so an account update and
/// its event become visible together.
#[derive(Default)]
pub struct MemoryKarmaStore {
    state: RwLock<MemoryState>,
    #[cfg(test)]
    fail_next_append: AtomicBool,
}

impl MemoryKarmaStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KarmaStore for MemoryKarmaStore {
    async fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.write().await;

        if state.accounts.values().any(|a| a.username == new.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        if state.accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let account = Account::new(new);
        state.accounts.insert(account.id, account.clone());
        state.events.insert(account.id, Vec::new());

        debug!(account_id = %account.id, "Account inserted");
        Ok(account)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&account_id).cloned())
    }

    async fn append_event(&self, event: PendingEvent) -> Result<(Account, LedgerEvent), StoreError> {
        let mut state = self.state.write().await;

        let mut account = state
            .accounts
            .get(&event.account_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(event.account_id))?;

        let new_score = account
            .score
            .checked_add(event.points)
            .ok_or_else(|| StoreError::Backend("score out of range".to_string()))?;

        #[cfg(test)]
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected append failure".to_string()));
        }

        // Never stamp an event earlier than the one before it
        let recorded_at = event.recorded_at.max(account.last_active);

        account.score = new_score;
        account.tier = Tier::for_score(new_score);
        account.last_active = recorded_at;

        state.next_event_id += 1;
        let stored = LedgerEvent {
            id: state.next_event_id,
            account_id: event.account_id,
            action_type: event.action_type,
            points_earned: event.points,
            details: event.details,
            recorded_at,
        };

        // Nothing below can fail: account and ledger change together
        state.accounts.insert(account.id, account.clone());
        state
            .events
            .entry(account.id)
            .or_default()
            .push(stored.clone());

        Ok((account, stored))
    }

    async fn recent_events(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .get(&account_id)
            .map(|events| events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_account(name: &str) -> NewAccount {
        NewAccount {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            credential_hash: "hash".to_string(),
        }
    }

    fn pending(account_id: AccountId, points: i64) -> PendingEvent {
        PendingEvent {
            account_id,
            action_type: "backup_created".to_string(),
            points,
            details: None,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = MemoryKarmaStore::new();
        store.insert_account(new_account("alice")).await.unwrap();

        let dup_name = NewAccount {
            email: "other@example.com".to_string(),
            ..new_account("alice")
        };
        assert!(matches!(
            store.insert_account(dup_name).await,
            Err(StoreError::Duplicate(field)) if field == "username"
        ));

        let dup_email = NewAccount {
            username: "alice2".to_string(),
            ..new_account("alice")
        };
        assert!(matches!(
            store.insert_account(dup_email).await,
            Err(StoreError::Duplicate(field)) if field == "email"
        ));
    }

    #[tokio::test]
    async fn test_append_updates_score_and_tier_together() {
        let store = MemoryKarmaStore::new();
        let account = store.insert_account(new_account("bob")).await.unwrap();

        let (updated, event) = store.append_event(pending(account.id, 55)).await.unwrap();
        assert_eq!(updated.score, 55);
        assert_eq!(updated.tier, Tier::Guardian);
        assert_eq!(event.points_earned, 55);

        let stored = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_state_untouched() {
        let store = MemoryKarmaStore::new();
        let account = store.insert_account(new_account("carol")).await.unwrap();
        store.append_event(pending(account.id, 15)).await.unwrap();

        store.fail_next_append();
        assert!(store.append_event(pending(account.id, 15)).await.is_err());

        let stored = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(stored.score, 15);
        assert_eq!(store.recent_events(account.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_events_newest_first() {
        let store = MemoryKarmaStore::new();
        let account = store.insert_account(new_account("dave")).await.unwrap();
        for points in [1, 2, 3] {
            store.append_event(pending(account.id, points)).await.unwrap();
        }

        let events = store.recent_events(account.id, 2).await.unwrap();
        let points: Vec<i64> = events.iter().map(|e| e.points_earned).collect();
        assert_eq!(points, vec![3, 2]);

        let unknown = store.recent_events(AccountId::new_v4(), 10).await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_clock_skew_does_not_reorder_history() {
        let store = MemoryKarmaStore::new();
        let account = store.insert_account(new_account("erin")).await.unwrap();
        let (after_first, first) = store.append_event(pending(account.id, 5)).await.unwrap();

        // A stamp taken before the previous write, as after a wall-clock step back
        let mut stale = pending(account.id, 5);
        stale.recorded_at = first.recorded_at - Duration::seconds(30);
        let (after_second, second) = store.append_event(stale).await.unwrap();

        assert!(second.recorded_at >= first.recorded_at);
        assert!(after_second.last_active >= after_first.last_active);

        let events = store.recent_events(account.id, 10).await.unwrap();
        assert_eq!(events[0].id, second.id);
        assert!(events[0].recorded_at >= events[1].recorded_at);
    }
}
