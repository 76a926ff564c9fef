//! Karma Repository - PostgreSQL persistence for accounts and the action ledger
//!
//! `append_event` runs inside one transaction and locks the account row, so
//! concurrent writers (including other processes) serialize per account and
//! readers only ever see committed score/tier/ledger states. Event ids are
//! assigned under that lock, so history is ordered by id.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::database::store::{KarmaStore, StoreError};
use crate::karma::{Account, AccountId, LedgerEvent, NewAccount, PendingEvent, Tier};

#[derive(Clone)]
pub struct KarmaRepository {
    pool: PgPool,
}

impl KarmaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize karma schema and tables
    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing karma schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS karma")
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to create karma schema: {}", e))?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS karma.accounts (
                id UUID PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(100) NOT NULL UNIQUE,
                credential_hash VARCHAR(255) NOT NULL,
                score BIGINT NOT NULL DEFAULT 0,
                tier VARCHAR(20) NOT NULL DEFAULT 'Rookie',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                last_active TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create accounts table: {}", e))?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS karma.actions (
                id BIGSERIAL PRIMARY KEY,
                account_id UUID NOT NULL REFERENCES karma.accounts(id),
                action_type VARCHAR(50) NOT NULL,
                points_earned BIGINT NOT NULL,
                details TEXT,
                recorded_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create actions table: {}", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actions_account_id ON karma.actions(account_id, id DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to create actions index: {}", e))?;

        info!("Karma schema initialized");
        Ok(())
    }
}

fn backend(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| StoreError::Backend(format!("{}: {}", context, e))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let tier: String = row.get("tier");
    let tier = tier.parse::<Tier>().map_err(StoreError::Backend)?;

    Ok(Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        credential_hash: row.get("credential_hash"),
        score: row.get("score"),
        tier,
        created_at: row.get("created_at"),
        last_active: row.get("last_active"),
    })
}

fn event_from_row(row: &PgRow) -> LedgerEvent {
    LedgerEvent {
        id: row.get("id"),
        account_id: row.get("account_id"),
        action_type: row.get("action_type"),
        points_earned: row.get("points_earned"),
        details: row.get("details"),
        recorded_at: row.get("recorded_at"),
    }
}

#[async_trait]
impl KarmaStore for KarmaRepository {
    async fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let account = Account::new(new);

        sqlx::query(r#"
            INSERT INTO karma.accounts
                (id, username, email, credential_hash, score, tier, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#)
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.credential_hash)
        .bind(account.score)
        .bind(account.tier.as_str())
        .bind(account.created_at)
        .bind(account.last_active)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                let field = match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => "email",
                    _ => "username",
                };
                StoreError::Duplicate(field.to_string())
            }
            other => StoreError::Backend(format!("Failed to insert account: {}", other)),
        })?;

        debug!(account_id = %account.id, "Account inserted");
        Ok(account)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(r#"
            SELECT id, username, email, credential_hash, score, tier, created_at, last_active
            FROM karma.accounts
            WHERE id = $1
        "#)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend("Failed to get account"))?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn append_event(&self, event: PendingEvent) -> Result<(Account, LedgerEvent), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(backend("Failed to begin transaction"))?;

        // Row lock: concurrent writers on this account wait here
        let current = sqlx::query("SELECT score FROM karma.accounts WHERE id = $1 FOR UPDATE")
            .bind(event.account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend("Failed to lock account"))?;

        let Some(current) = current else {
            return Err(StoreError::AccountNotFound(event.account_id));
        };

        let score: i64 = current.get("score");
        let new_score = score
            .checked_add(event.points)
            .ok_or_else(|| StoreError::Backend("score out of range".to_string()))?;
        let new_tier = Tier::for_score(new_score);

        let account_row = sqlx::query(r#"
            UPDATE karma.accounts
            SET score = $2, tier = $3, last_active = GREATEST(last_active, clock_timestamp())
            WHERE id = $1
            RETURNING id, username, email, credential_hash, score, tier, created_at, last_active
        "#)
        .bind(event.account_id)
        .bind(new_score)
        .bind(new_tier.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(backend("Failed to update account"))?;
        let account = account_from_row(&account_row)?;

        // Stamped under the row lock so history time never runs backwards
        let event_row = sqlx::query(r#"
            INSERT INTO karma.actions (account_id, action_type, points_earned, details, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, action_type, points_earned, details, recorded_at
        "#)
        .bind(event.account_id)
        .bind(&event.action_type)
        .bind(event.points)
        .bind(&event.details)
        .bind(account.last_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend("Failed to insert action"))?;

        let stored = event_from_row(&event_row);

        tx.commit()
            .await
            .map_err(backend("Failed to commit action"))?;

        Ok((account, stored))
    }

    async fn recent_events(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, StoreError> {
        let rows = sqlx::query(r#"
            SELECT id, account_id, action_type, points_earned, details, recorded_at
            FROM karma.actions
            WHERE account_id = $1
            ORDER BY id DESC
            LIMIT $2
        "#)
        .bind(account_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(backend("Failed to get recent actions"))?;

        Ok(rows.iter().map(event_from_row).collect())
    }
}
