//! Per-client rate limiting for RSVP submissions.
//!
//! Clients are keyed by the socket peer address. When the service runs
//! behind a trusted proxy, the first `X-Forwarded-For` hop and then
//! `X-Real-IP` take precedence.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use serde_json::json;

use crate::app::AppState;

/// Key used when no client address can be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Idle client entries are swept once every this many checks.
const EVICT_EVERY: u64 = 1024;

/// Rate limiter state shared across all requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    rate_limit_per_minute: u32,
    trust_proxy_headers: bool,
    checks: AtomicU64,
}

impl RateLimiterState {
    /// Creates limiter state allowing `rate_limit_per_minute` requests per
    /// client. Returns `None` when the limit is 0 (disabled).
    pub fn new(rate_limit_per_minute: u32, trust_proxy_headers: bool) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::dashmap(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
            trust_proxy_headers,
            checks: AtomicU64::new(0),
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    /// Checks whether `client` may make another request.
    /// Returns Err with retry-after seconds if rate limited.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.evict_idle();
        }

        match self.limiter.check_key(&client.to_string()) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait_time.as_secs().max(1))
            }
        }
    }

    /// Drops clients whose quota has fully replenished.
    pub fn evict_idle(&self) {
        self.limiter.retain_recent();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// Resolves the client key for a request.
///
/// Forwarding headers are client-controlled unless a proxy rewrites them, so
/// they are read only when `trust_proxy_headers` is set.
pub fn client_key(req: &Request<Body>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let headers = req.headers();

        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return forwarded.to_string();
        }

        if let Some(real_ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return real_ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware that applies the per-client RSVP rate limit.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ref rate_limiter) = state.rate_limiter {
        let client = client_key(&req, rate_limiter.trust_proxy_headers());
        if let Err(retry_after) = rate_limiter.check(&client) {
            tracing::warn!(client = %client, retry_after, "RSVP rate limit exceeded");
            return rate_limited_response(rate_limiter.rate_limit_per_minute(), retry_after);
        }
    }

    next.run(req).await
}

/// Create a rate limited response with proper headers and body.
fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

    response
}
