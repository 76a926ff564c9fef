//! Security Karma
//!
//! Gamified security-behavior ledger: accounts earn or lose karma points for
//! security actions and climb through security tiers.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── karma/         - Ledger domain
//! │   ├── catalog.rs  - Action catalog (point deltas)
//! │   ├── tier.rs     - Score → tier rule and progress
//! │   ├── strength.rs - Password strength scoring
//! │   ├── models.rs   - Accounts and ledger events
//! │   └── ledger.rs   - Orchestrator with per-account serialization
//! ├── api/           - HTTP API endpoints
//! │   ├── karma.rs      - Account and karma routes
//! │   ├── error.rs      - Error → HTTP response mapping
//! │   └── middleware.rs - Auth, rate limiting, headers, logging
//! └── database/      - Persistence
//!     ├── store.rs   - Store trait
//!     ├── memory.rs  - In-memory store
//!     ├── karma.rs   - PostgreSQL store
//!     └── pool.rs    - Connection pool
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod karma;

// Re-export main types for convenience
pub use config::KarmaConfig;
pub use database::{DatabasePool, KarmaRepository, KarmaStore, MemoryKarmaStore, StoreError};
pub use karma::{
    Account, AccountId, ActionOutcome, ActionType, KarmaError, KarmaLedger, LedgerEvent,
    NewAccount, Tier, TierProgress,
};

// Re-export API types
pub use api::{KarmaApiState, SecurityMiddlewareConfig, SecurityState, create_app};
