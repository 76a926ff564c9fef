//! HTTP API for the security karma ledger
//!
//! Provides:
//! - Account registration
//! - Karma endpoints (catalog, profile, action recording, history, password check)
//! - Security middleware (auth, rate limiting, headers, logging)

pub mod error;
pub mod karma;
pub mod middleware;

pub use karma::{KarmaApiState, create_accounts_router, create_karma_router};
pub use middleware::{
    RateLimiter, SecurityMiddlewareConfig, SecurityState, auth_middleware, body_size_middleware,
    logging_middleware, rate_limit_middleware, security_headers_middleware,
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::KarmaConfig;
use crate::karma::KarmaLedger;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "security-karma",
    }))
}

/// Build the full application router with security layers applied
pub fn create_app(
    ledger: Arc<KarmaLedger>,
    config: &KarmaConfig,
    api_keys: Vec<String>,
) -> Result<Router> {
    let state = KarmaApiState {
        ledger,
        default_history_limit: config.ledger.default_history_limit,
    };
    let security_state = SecurityState::new(SecurityMiddlewareConfig::from_config(
        config, api_keys,
    ));

    let mut app = Router::new()
        .merge(create_accounts_router(state.clone()))
        .nest("/karma", create_karma_router(state))
        .route("/health", get(health))
        // Enforced while extracting, so bodies without Content-Length are capped too
        .layer(DefaultBodyLimit::max(config.security.max_request_size))
        // Layers run outermost-last; auth sees requests before body checks
        .layer(axum_middleware::from_fn_with_state(
            security_state.clone(),
            body_size_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security_state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security_state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security_state,
            logging_middleware,
        ))
        .layer(axum_middleware::from_fn(security_headers_middleware));

    if config.security.enable_cors {
        let origin = HeaderValue::from_str(&config.security.cors_origin)
            .with_context(|| format!("Invalid CORS origin: {}", config.security.cors_origin))?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    HeaderName::from_static("x-api-key"),
                ]),
        );
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}
