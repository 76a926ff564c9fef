//! Security Karma Ledger
//!
//! Records scored security actions and keeps each account's karma score and
//! security tier in step.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ Action Catalog  │────►│   KarmaLedger    │────►│   KarmaStore    │
//! │ (point deltas)  │     │ (per-account     │     │ (Postgres or    │
//! └─────────────────┘     │  serialization)  │     │  in-memory)     │
//!                         └──────────────────┘     └─────────────────┘
//!                                  │
//!                                  ▼
//!                          ┌──────────────────┐
//!                          │   Tier Rule      │
//!                          │ (score → level)  │
//!                          └──────────────────┘
//! ```
//!
//! ## Score Model
//!
//! - Accounts start at 0 (Rookie)
//! - Each action adds its catalog delta; risky behavior subtracts
//! - Tier is recomputed from the score in the same atomic write, so it can
//!   go down as well as up

mod catalog;
mod ledger;
mod models;
pub mod strength;
mod tier;

pub use catalog::{ActionType, CatalogEntry, catalog, points_for, valid_actions};
pub use ledger::{DEFAULT_HISTORY_LIMIT, KarmaLedger, MAX_HISTORY_LIMIT};
pub use models::{
    Account, AccountId, ActionOutcome, LedgerEvent, NewAccount, PasswordCheckOutcome,
    PendingEvent,
};
pub use strength::{StrengthRating, StrengthReport, assess};
pub use tier::{Tier, TierProgress, progress, tier_for};

use thiserror::Error;

/// Errors surfaced by the karma ledger
#[derive(Debug, Error)]
pub enum KarmaError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Account already exists with this {0}")]
    AccountExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}
