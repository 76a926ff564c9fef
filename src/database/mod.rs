//! Account & Ledger Persistence
//!
//! PostgreSQL via sqlx, with an in-memory fallback behind the same
//! [`KarmaStore`] trait.

pub mod karma;
pub mod memory;
pub mod pool;
pub mod store;

pub use karma::KarmaRepository;
pub use memory::MemoryKarmaStore;
pub use pool::DatabasePool;
pub use store::{KarmaStore, StoreError};
