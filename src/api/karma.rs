//! Karma API Endpoints
//!
//! Account registration, action recording, profile and history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::karma::{
    Account, AccountId, CatalogEntry, KarmaError, KarmaLedger, LedgerEvent, NewAccount,
    StrengthReport, Tier, TierProgress, catalog, progress,
};

/// API state for karma endpoints
#[derive(Clone)]
pub struct KarmaApiState {
    pub ledger: Arc<KarmaLedger>,
    pub default_history_limit: usize,
}

// Request types

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub credential_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordActionRequest {
    pub action_type: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordCheckRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub account: Account,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub account: Account,
    pub progress: TierProgress,
}

#[derive(Debug, Serialize)]
pub struct RecordActionResponse {
    pub message: String,
    pub action_type: String,
    pub points_earned: i64,
    pub new_score: i64,
    pub new_tier: Tier,
    pub event_id: i64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub account_id: AccountId,
    pub total: usize,
    pub actions: Vec<LedgerEvent>,
}

#[derive(Debug, Serialize)]
pub struct PasswordCheckResponse {
    pub strength: StrengthReport,
    pub result: RecordActionResponse,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub actions: Vec<CatalogEntry>,
}

fn karma_message(points: i64) -> String {
    if points >= 0 {
        format!("Great job! You earned {} karma points!", points)
    } else {
        format!("Careful! You lost {} karma points.", -points)
    }
}

// Endpoints

/// POST /accounts - Register an account
pub async fn register_account(
    State(state): State<KarmaApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), KarmaError> {
    let (Some(username), Some(email), Some(credential_hash)) =
        (payload.username, payload.email, payload.credential_hash)
    else {
        return Err(KarmaError::InvalidInput(
            "username, email and credential_hash are required".to_string(),
        ));
    };

    let account = state
        .ledger
        .register_account(NewAccount {
            username,
            email,
            credential_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created! Welcome to Security Karma!".to_string(),
            account,
        }),
    ))
}

/// GET /karma/catalog - List scored actions
pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse { actions: catalog() })
}

/// GET /karma/{account_id}/profile - Score, tier and progress
pub async fn get_profile(
    State(state): State<KarmaApiState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<ProfileResponse>, KarmaError> {
    let account = state.ledger.current_profile(account_id).await?;
    let progress = progress(account.score);

    Ok(Json(ProfileResponse { account, progress }))
}

/// POST /karma/{account_id}/actions - Record a security action
pub async fn record_action(
    State(state): State<KarmaApiState>,
    Path(account_id): Path<AccountId>,
    Json(payload): Json<RecordActionRequest>,
) -> Result<Json<RecordActionResponse>, KarmaError> {
    let action_type = payload
        .action_type
        .filter(|a| !a.is_empty())
        .ok_or_else(|| KarmaError::InvalidInput("action_type is required".to_string()))?;

    let outcome = state
        .ledger
        .record_action(account_id, &action_type, payload.details)
        .await?;

    info!(
        account_id = %account_id,
        action = %action_type,
        new_score = outcome.new_score,
        "Karma updated"
    );

    Ok(Json(RecordActionResponse {
        message: karma_message(outcome.points_earned),
        action_type,
        points_earned: outcome.points_earned,
        new_score: outcome.new_score,
        new_tier: outcome.new_tier,
        event_id: outcome.event.id,
    }))
}

/// GET /karma/{account_id}/actions - Recent actions, newest first
pub async fn get_actions(
    State(state): State<KarmaApiState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, KarmaError> {
    let limit = query.limit.unwrap_or(state.default_history_limit);
    let actions = state.ledger.recent_actions(account_id, limit).await?;

    Ok(Json(HistoryResponse {
        account_id,
        total: actions.len(),
        actions,
    }))
}

/// POST /karma/{account_id}/password-check - Score a password and record the check
pub async fn password_check(
    State(state): State<KarmaApiState>,
    Path(account_id): Path<AccountId>,
    Json(payload): Json<PasswordCheckRequest>,
) -> Result<Json<PasswordCheckResponse>, KarmaError> {
    let checked = state
        .ledger
        .check_password(account_id, &payload.password)
        .await?;

    let outcome = checked.outcome;
    Ok(Json(PasswordCheckResponse {
        strength: checked.strength,
        result: RecordActionResponse {
            message: karma_message(outcome.points_earned),
            action_type: outcome.event.action_type.clone(),
            points_earned: outcome.points_earned,
            new_score: outcome.new_score,
            new_tier: outcome.new_tier,
            event_id: outcome.event.id,
        },
    }))
}

/// Create the account registration router
pub fn create_accounts_router(state: KarmaApiState) -> Router {
    Router::new()
        .route("/accounts", post(register_account))
        .with_state(state)
}

/// Create the karma API router
pub fn create_karma_router(state: KarmaApiState) -> Router {
    Router::new()
        .route("/catalog", get(get_catalog))
        .route("/{account_id}/profile", get(get_profile))
        .route("/{account_id}/actions", get(get_actions).post(record_action))
        .route("/{account_id}/password-check", post(password_check))
        .with_state(state)
}
