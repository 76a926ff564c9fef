//! Account and ledger data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::karma::Tier;
use crate::karma::strength::StrengthReport;

pub type AccountId = Uuid;

/// Account snapshot. `tier` always equals `Tier::for_score(score)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// Opaque hash from the identity provider, never serialized
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub score: i64,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Account {
    pub fn new(new: NewAccount) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            credential_hash: new.credential_hash,
            score: 0,
            tier: Tier::Rookie,
            created_at: now,
            last_active: now,
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub credential_hash: String,
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: i64,
    pub account_id: AccountId,
    pub action_type: String,
    pub points_earned: i64,
    pub details: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// An event about to be appended, before the store assigns its id
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub account_id: AccountId,
    pub action_type: String,
    pub points: i64,
    pub details: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Result of one committed `record_action`
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub points_earned: i64,
    pub new_score: i64,
    pub new_tier: Tier,
    pub event: LedgerEvent,
}

/// Result of a password check: the strength report plus the recorded action
#[derive(Debug, Clone, Serialize)]
pub struct PasswordCheckOutcome {
    pub strength: StrengthReport,
    pub outcome: ActionOutcome,
}
