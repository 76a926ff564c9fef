//! Security Middleware for the Karma API
//!
//! Provides:
//! - API key authentication
//! - Rate limiting per client IP
//! - Request body size limits
//! - Security headers
//! - Request logging with sanitization

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::KarmaConfig;

/// Tracked clients before stale windows are swept
const RATE_LIMIT_SWEEP_THRESHOLD: usize = 10_000;

/// Security configuration for middleware
#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    /// Enable API key authentication
    pub enable_auth: bool,
    /// Accepted service API keys
    pub api_keys: Vec<String>,
    /// Rate limit: requests per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    /// Enable request logging
    pub log_requests: bool,
    /// Mask client IPs in logs
    pub sanitize_logs: bool,
    /// Read the client IP from proxy headers instead of the socket
    pub trust_proxy_headers: bool,
    /// Paths that don't require authentication
    pub public_paths: Vec<String>,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            enable_auth: true,
            api_keys: Vec::new(),
            rate_limit_per_minute: 120,
            max_request_size: 64 * 1024,
            log_requests: true,
            sanitize_logs: true,
            trust_proxy_headers: false,
            public_paths: vec!["/health".to_string()],
        }
    }
}

impl SecurityMiddlewareConfig {
    pub fn from_config(config: &KarmaConfig, api_keys: Vec<String>) -> Self {
        Self {
            enable_auth: config.security.enable_auth,
            api_keys,
            rate_limit_per_minute: config.security.rate_limit_per_minute,
            max_request_size: config.security.max_request_size,
            log_requests: config.logging.log_requests,
            sanitize_logs: config.logging.sanitize_logs,
            trust_proxy_headers: config.security.trust_proxy_headers,
            ..Self::default()
        }
    }
}

/// Rate limiter state - tracks requests per IP
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of IP -> (request count, window start)
    requests: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Check if request is allowed and update counter.
    /// Returns (allowed, remaining, reset_after_secs)
    pub fn check_request(&self, ip: &str) -> (bool, u32, u64) {
        if self.requests.len() > RATE_LIMIT_SWEEP_THRESHOLD {
            self.cleanup();
        }

        let now = Instant::now();

        let mut entry = self.requests.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let remaining = self.limit.saturating_sub(*count);
        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, remaining.saturating_sub(1), reset_after)
    }

    /// Drop clients whose window expired
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

/// Shared state for security middleware
#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// Client IP from the socket address. Proxy headers are client-controlled
/// and only consulted when `trust_proxy_headers` is set.
fn get_client_ip(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let headers = request.headers();

        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
        {
            return ip.trim().to_string();
        }

        if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            return ip.trim().to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Mask a value for logging
pub fn sanitize_for_log(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|p| path.starts_with(p))
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").to_string())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path();

    if !state.config.enable_auth || is_public_path(path, &state.config.public_paths) {
        return Ok(next.run(request).await);
    }

    match extract_api_key(&headers) {
        Some(key) if state.config.api_keys.contains(&key) => {
            debug!("API key authenticated for path: {}", path);
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!("Invalid API key attempt for path: {}", path);
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            warn!("Missing API key for path: {}", path);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_ip = get_client_ip(&request, state.config.trust_proxy_headers);
    let (allowed, remaining, reset_after) = state.rate_limiter.check_request(&client_ip);
    let limit = HeaderValue::from(state.config.rate_limit_per_minute);

    if !allowed {
        let log_ip = if state.config.sanitize_logs {
            sanitize_for_log(&client_ip)
        } else {
            client_ip
        };
        warn!(
            "Rate limit exceeded for IP: {} on path: {}",
            log_ip,
            request.uri().path()
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", limit);
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));
        headers.insert("Retry-After", HeaderValue::from(reset_after));

        return Err(response);
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", limit);
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));

    Ok(response)
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Karma data is per-account and must not be cached by intermediaries
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.remove("Server");

    response
}

/// Request logging middleware with sanitization
pub async fn logging_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = get_client_ip(&request, state.config.trust_proxy_headers);

    let log_ip = if state.config.sanitize_logs {
        sanitize_for_log(&client_ip)
    } else {
        client_ip
    };

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Request failed"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Client error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            client_ip = %log_ip,
            "Request completed"
        );
    }

    response
}

/// Reject bodies whose declared length exceeds the limit
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let declared = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > state.config.max_request_size {
            warn!(
                "Request body too large: {} bytes (max: {})",
                length, state.config.max_request_size
            );
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}
