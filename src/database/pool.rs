//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::karma::KarmaRepository;

pub struct DatabasePool {
    pool: PgPool,
    karma: KarmaRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, String> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

        info!("Connected to PostgreSQL");

        let karma = KarmaRepository::new(pool.clone());

        Ok(Self { pool, karma })
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing database schema...");
        self.karma.init_schema().await?;
        info!("Database schema initialized");
        Ok(())
    }

    pub fn karma(&self) -> &KarmaRepository {
        &self.karma
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
