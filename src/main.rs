use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use security_karma::{
    DatabasePool, KarmaConfig, KarmaLedger, KarmaStore, MemoryKarmaStore, api::create_app,
    config::sanitize_for_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = KarmaConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check KARMA_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting Security Karma server");
    if !config.security.enable_auth {
        warn!("API authentication is disabled - every caller can modify any account");
    }

    // Storage: PostgreSQL when enabled, otherwise the in-memory fallback
    let (store, db_pool): (Arc<dyn KarmaStore>, Option<DatabasePool>) =
        if config.database.postgres_enabled {
            info!(
                "Connecting to PostgreSQL at {}",
                sanitize_for_logging(&config.database.postgres_url)
            );
            let db = DatabasePool::new(
                &config.database.postgres_url,
                config.database.max_connections,
            )
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
            db.init_schema().await.map_err(|e| anyhow::anyhow!(e))?;
            let store: Arc<dyn KarmaStore> = Arc::new(db.karma().clone());
            (store, Some(db))
        } else {
            warn!("PostgreSQL disabled - karma data will be lost on restart");
            let store: Arc<dyn KarmaStore> = Arc::new(MemoryKarmaStore::new());
            (store, None)
        };

    let ledger = Arc::new(
        KarmaLedger::new(store).with_max_history_limit(config.ledger.max_history_limit),
    );

    let app = create_app(ledger, &config, get_api_keys_from_env())?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Security Karma server listening on {}", bind_addr);
    info!(
        "Security middleware: Auth={}, Rate limit={}/min, Max body={}KB, CORS={}",
        config.security.enable_auth,
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024,
        config.security.enable_cors
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(db) = db_pool {
        db.pool().close().await;
        info!("PostgreSQL pool closed");
    }

    info!("Security Karma server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging(config: &KarmaConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

/// Load API keys from environment variables
fn get_api_keys_from_env() -> Vec<String> {
    let mut keys = Vec::new();

    if let Ok(key) = std::env::var("KARMA_API_KEY") {
        if !key.is_empty() {
            keys.push(key);
        }
    }

    // Additional keys, comma-separated
    if let Ok(extra_keys) = std::env::var("KARMA_API_KEYS") {
        for key in extra_keys.split(',') {
            let key = key.trim();
            if !key.is_empty() {
                keys.push(key.to_string());
            }
        }
    }

    if keys.is_empty() {
        warn!("No API keys configured - authentication will fail if enabled");
    } else {
        info!("Loaded {} API key(s) for authentication", keys.len());
    }

    keys
}
