//! Karma Ledger - Main Orchestrator
//!
//! Validates actions against the catalog, serializes mutations per account and
//! delegates the atomic score/tier/ledger write to the store.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::database::{KarmaStore, MemoryKarmaStore, StoreError};
use crate::karma::{
    Account, AccountId, ActionOutcome, ActionType, KarmaError, LedgerEvent, NewAccount,
    PasswordCheckOutcome, PendingEvent, assess, points_for,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 100;
pub const MAX_DETAILS_LEN: usize = 500;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_CREDENTIAL_HASH_LEN: usize = 255;

/// Main karma ledger
pub struct KarmaLedger {
    store: Arc<dyn KarmaStore>,

    /// One mutex per account with a mutation in flight
    account_locks: DashMap<AccountId, Arc<Mutex<()>>>,

    max_history_limit: usize,
}

impl KarmaLedger {
    pub fn new(store: Arc<dyn KarmaStore>) -> Self {
        Self {
            store,
            account_locks: DashMap::new(),
            max_history_limit: MAX_HISTORY_LIMIT,
        }
    }

    /// Ledger over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKarmaStore::new()))
    }

    pub fn with_max_history_limit(mut self, limit: usize) -> Self {
        self.max_history_limit = limit;
        self
    }

    /// Create an account at score 0 / Rookie
    pub async fn register_account(&self, new: NewAccount) -> Result<Account, KarmaError> {
        let new = NewAccount {
            username: new.username.trim().to_string(),
            email: new.email.trim().to_string(),
            credential_hash: new.credential_hash,
        };
        validate_new_account(&new)?;

        let account = self.store.insert_account(new).await.map_err(|e| match e {
            StoreError::Duplicate(field) => KarmaError::AccountExists(field),
            other => persistence_error(other),
        })?;

        info!(account_id = %account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    /// Record one action and return the resulting score and tier
    pub async fn record_action(
        &self,
        account_id: AccountId,
        action_type: &str,
        details: Option<String>,
    ) -> Result<ActionOutcome, KarmaError> {
        let points = points_for(action_type)?;

        if let Some(ref text) = details {
            if text.chars().count() > MAX_DETAILS_LEN {
                return Err(KarmaError::InvalidInput(format!(
                    "details must be at most {} characters",
                    MAX_DETAILS_LEN
                )));
            }
        }

        let lock = self.account_lock(account_id);
        let result = {
            let _guard = lock.lock().await;
            self.store
                .append_event(PendingEvent {
                    account_id,
                    action_type: action_type.to_string(),
                    points,
                    details,
                    recorded_at: Utc::now(),
                })
                .await
        };
        drop(lock);
        self.release_lock(account_id);

        let (account, event) = result.map_err(|e| match e {
            StoreError::AccountNotFound(id) => KarmaError::AccountNotFound(id),
            other => persistence_error(other),
        })?;

        debug!(
            account_id = %account_id,
            action = %action_type,
            points = points,
            new_score = account.score,
            tier = %account.tier,
            "Recorded action"
        );

        Ok(ActionOutcome {
            points_earned: event.points_earned,
            new_score: account.score,
            new_tier: account.tier,
            event,
        })
    }

    /// Score a password and record the matching password-check action.
    /// The password itself is neither stored nor logged.
    pub async fn check_password(
        &self,
        account_id: AccountId,
        password: &str,
    ) -> Result<PasswordCheckOutcome, KarmaError> {
        if password.is_empty() {
            return Err(KarmaError::InvalidInput("password is required".to_string()));
        }

        let strength = assess(password);
        let outcome = self
            .record_action(account_id, strength.action.key(), Some(strength.details()))
            .await?;

        Ok(PasswordCheckOutcome { strength, outcome })
    }

    /// Convenience for callers holding a typed action
    pub async fn record(
        &self,
        account_id: AccountId,
        action: ActionType,
        details: Option<String>,
    ) -> Result<ActionOutcome, KarmaError> {
        self.record_action(account_id, action.key(), details).await
    }

    pub async fn current_profile(&self, account_id: AccountId) -> Result<Account, KarmaError> {
        self.store
            .get_account(account_id)
            .await
            .map_err(persistence_error)?
            .ok_or(KarmaError::AccountNotFound(account_id))
    }

    /// Most recent first. `limit` is clamped to the configured maximum; an
    /// unknown account has an empty history.
    pub async fn recent_actions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, KarmaError> {
        let limit = limit.min(self.max_history_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.store
            .recent_events(account_id, limit)
            .await
            .map_err(persistence_error)
    }

    fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no task holds or waits on it
    fn release_lock(&self, account_id: AccountId) {
        self.account_locks
            .remove_if(&account_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.account_locks.len()
    }
}

fn persistence_error(e: StoreError) -> KarmaError {
    warn!(error = %e, "Karma store operation failed");
    KarmaError::PersistenceFailure(e.to_string())
}

fn validate_new_account(new: &NewAccount) -> Result<(), KarmaError> {
    if new.username.is_empty() || new.email.is_empty() || new.credential_hash.is_empty() {
        return Err(KarmaError::InvalidInput(
            "username, email and credential_hash are required".to_string(),
        ));
    }
    if new.username.chars().count() > MAX_USERNAME_LEN {
        return Err(KarmaError::InvalidInput(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if new.email.chars().count() > MAX_EMAIL_LEN {
        return Err(KarmaError::InvalidInput(format!(
            "email must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    if new.credential_hash.chars().count() > MAX_CREDENTIAL_HASH_LEN {
        return Err(KarmaError::InvalidInput(format!(
            "credential_hash must be at most {} characters",
            MAX_CREDENTIAL_HASH_LEN
        )));
    }
    match new.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(KarmaError::InvalidInput("email is not valid".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karma::Tier;

    fn new_account(name: &str) -> NewAccount {
        NewAccount {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            credential_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mfa_progression() {
        let ledger = KarmaLedger::in_memory();
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        let first = ledger.record_action(account.id, "mfa_enabled", None).await.unwrap();
        assert_eq!((first.new_score, first.new_tier), (20, Tier::Rookie));

        let second = ledger.record_action(account.id, "mfa_enabled", None).await.unwrap();
        assert_eq!((second.new_score, second.new_tier), (40, Tier::Rookie));

        let third = ledger.record_action(account.id, "mfa_enabled", None).await.unwrap();
        assert_eq!((third.new_score, third.new_tier), (60, Tier::Guardian));
        assert_eq!(third.points_earned, 20);
    }

    #[tokio::test]
    async fn test_unknown_action_records_nothing() {
        let ledger = KarmaLedger::in_memory();
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        let err = ledger
            .record_action(account.id, "not_a_real_action", None)
            .await
            .unwrap_err();
        assert!(matches!(err, KarmaError::UnknownAction(_)));

        assert!(ledger.recent_actions(account.id, 10).await.unwrap().is_empty());
        assert_eq!(ledger.current_profile(account.id).await.unwrap().score, 0);
    }

    #[tokio::test]
    async fn test_missing_account() {
        let ledger = KarmaLedger::in_memory();
        let missing = AccountId::new_v4();

        assert!(matches!(
            ledger.record_action(missing, "mfa_enabled", None).await,
            Err(KarmaError::AccountNotFound(id)) if id == missing
        ));
        assert!(matches!(
            ledger.current_profile(missing).await,
            Err(KarmaError::AccountNotFound(_))
        ));
        assert!(ledger.recent_actions(missing, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_atomic() {
        let store = Arc::new(MemoryKarmaStore::new());
        let ledger = KarmaLedger::new(store.clone());
        let account = ledger.register_account(new_account("user_1")).await.unwrap();
        ledger.record_action(account.id, "backup_created", None).await.unwrap();

        let before = ledger.current_profile(account.id).await.unwrap();

        store.fail_next_append();
        let err = ledger
            .record_action(account.id, "two_factor_setup", None)
            .await
            .unwrap_err();
        assert!(matches!(err, KarmaError::PersistenceFailure(_)));

        let after = ledger.current_profile(account.id).await.unwrap();
        assert_eq!(after, before);
        assert_eq!(ledger.recent_actions(account.id, 10).await.unwrap().len(), 1);

        // The account is still writable afterwards
        let next = ledger.record_action(account.id, "two_factor_setup", None).await.unwrap();
        assert_eq!(next.new_score, 35);
    }

    #[tokio::test]
    async fn test_risky_behavior_lowers_tier() {
        let ledger = KarmaLedger::in_memory();
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        for _ in 0..3 {
            ledger.record(account.id, ActionType::PasswordCheckStrong, None).await.unwrap();
        }
        ledger.record(account.id, ActionType::MfaEnabled, None).await.unwrap();
        let profile = ledger.current_profile(account.id).await.unwrap();
        assert_eq!((profile.score, profile.tier), (50, Tier::Guardian));

        let outcome = ledger.record(account.id, ActionType::RiskyBehavior, None).await.unwrap();
        assert_eq!((outcome.new_score, outcome.new_tier), (40, Tier::Rookie));
    }

    #[tokio::test]
    async fn test_concurrent_actions_do_not_lose_updates() {
        let ledger = Arc::new(KarmaLedger::in_memory());
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger.record_action(account.id, "security_update", None).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let profile = ledger.current_profile(account.id).await.unwrap();
        assert_eq!(profile.score, 250);
        assert_eq!(profile.tier, Tier::Sentinel);
        assert_eq!(ledger.recent_actions(account.id, 100).await.unwrap().len(), 50);
        assert_eq!(ledger.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let ledger = KarmaLedger::in_memory().with_max_history_limit(3);
        let account = ledger.register_account(new_account("user_1")).await.unwrap();
        for _ in 0..5 {
            ledger.record_action(account.id, "security_update", None).await.unwrap();
        }

        assert_eq!(ledger.recent_actions(account.id, 10).await.unwrap().len(), 3);
        assert!(ledger.recent_actions(account.id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_details_length_is_bounded() {
        let ledger = KarmaLedger::in_memory();
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        let long = "x".repeat(MAX_DETAILS_LEN + 1);
        assert!(matches!(
            ledger.record_action(account.id, "mfa_enabled", Some(long)).await,
            Err(KarmaError::InvalidInput(_))
        ));

        let outcome = ledger
            .record_action(account.id, "mfa_enabled", Some("Authenticator app".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.event.details.as_deref(), Some("Authenticator app"));
    }

    #[tokio::test]
    async fn test_check_password_records_matching_action() {
        let ledger = KarmaLedger::in_memory();
        let account = ledger.register_account(new_account("user_1")).await.unwrap();

        let result = ledger.check_password(account.id, "Sup3r$ecretPass").await.unwrap();
        assert_eq!(result.strength.action, ActionType::PasswordCheckStrong);
        assert_eq!(result.outcome.points_earned, 10);
        assert_eq!(result.outcome.event.action_type, "password_check_strong");
        assert_eq!(
            result.outcome.event.details.as_deref(),
            Some("Password strength: 13/13")
        );

        assert!(matches!(
            ledger.check_password(account.id, "").await,
            Err(KarmaError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let ledger = KarmaLedger::in_memory();

        let padded = NewAccount {
            username: "  spaced  ".to_string(),
            email: " spaced@example.com ".to_string(),
            credential_hash: "hash".to_string(),
        };
        let account = ledger.register_account(padded).await.unwrap();
        assert_eq!(account.username, "spaced");
        assert_eq!(account.email, "spaced@example.com");

        let bad_email = NewAccount {
            email: "no-at-sign".to_string(),
            ..new_account("user_1")
        };
        assert!(matches!(
            ledger.register_account(bad_email).await,
            Err(KarmaError::InvalidInput(_))
        ));

        let account = ledger.register_account(new_account("user_1")).await.unwrap();
        assert_eq!((account.score, account.tier), (0, Tier::Rookie));

        assert!(matches!(
            ledger.register_account(new_account("user_1")).await,
            Err(KarmaError::AccountExists(_))
        ));
    }

    #[tokio::test]
    async fn test_credential_hash_length_is_bounded() {
        let ledger = KarmaLedger::in_memory();

        let oversized = NewAccount {
            credential_hash: "h".repeat(MAX_CREDENTIAL_HASH_LEN + 1),
            ..new_account("user_1")
        };
        assert!(matches!(
            ledger.register_account(oversized).await,
            Err(KarmaError::InvalidInput(_))
        ));

        let at_limit = NewAccount {
            credential_hash: "h".repeat(MAX_CREDENTIAL_HASH_LEN),
            ..new_account("user_1")
        };
        assert!(ledger.register_account(at_limit).await.is_ok());
    }
}
