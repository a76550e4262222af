//! HTTP middleware for the calling web server
//!
//! The crate does not own an HTTP server; it ships the axum glue a host
//! application layers onto its router. The host classifies routes by
//! inserting a [`Tier`] extension (and a [`CallerIdentity`] once its auth
//! middleware has run); everything downstream of that is handled here.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::RateLimiterService;
use crate::domain::decision::RequestContext;
use crate::domain::key::Tier;
use crate::domain::policy::PlanTier;
use crate::presentation::models::ErrorResponse;

/// Shared state for rate limiting middleware
#[derive(Clone)]
pub struct RateLimitState {
    /// The rate limiter service
    pub service: Arc<RateLimiterService>,
}

impl RateLimitState {
    /// Create a new rate limiter state
    pub fn new(service: Arc<RateLimiterService>) -> Self {
        Self { service }
    }
}

impl std::fmt::Debug for RateLimitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitState")
            .field("enabled", &self.service.is_enabled())
            .finish()
    }
}

/// Caller info extracted before rate limiting.
///
/// Inserted into request extensions by the host's auth middleware, which
/// must run before `rate_limit_middleware` for authenticated callers to be
/// counted per user instead of per IP.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub user_id: Option<Uuid>,
    pub plan: Option<PlanTier>,
    /// Target identity for auth-shaped requests (submitted email)
    pub identity: Option<String>,
}

/// Extract the client IP from the proxy header chain
pub fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
}

/// Add rate limit headers to a response
fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset_at_ms: u64) {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));

    // Decisions carry epoch milliseconds; the header carries epoch seconds
    let reset_val = (reset_at_ms / 1000).to_string();
    if let Ok(val) = HeaderValue::from_str(&reset_val) {
        headers.insert("x-ratelimit-reset", val);
    } else {
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("0"));
    }
}

/// Rate limiting middleware
///
/// Builds a [`RequestContext`] from the request (tier extension, caller
/// identity extension, proxy IP chain), asks the service for a decision and
/// either forwards the request with quota headers or answers 429 itself.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    // Skip rate limiting if disabled
    if !state.service.is_enabled() {
        return next.run(request).await;
    }

    let tier = request
        .extensions()
        .get::<Tier>()
        .copied()
        .unwrap_or_default();
    let caller = request
        .extensions()
        .get::<CallerIdentity>()
        .cloned()
        .unwrap_or_default();
    let ip = extract_client_ip(request.headers());

    let ctx = RequestContext {
        tier,
        ip,
        user_id: caller.user_id,
        plan: caller.plan,
        identity: caller.identity,
    };

    let decision = state.service.classify_and_check(&ctx).await;

    if decision.allowed {
        // Rate limit passed, continue with request
        let mut response = next.run(request).await;

        add_rate_limit_headers(
            &mut response,
            decision.limit,
            decision.remaining,
            decision.reset_at,
        );

        response
    } else {
        // Rate limit exceeded
        let retry_after = decision.retry_after.unwrap_or(60);

        tracing::warn!(
            ip = %ctx.ip.as_deref().unwrap_or("unknown"),
            tier = %decision.tier,
            retry_after = retry_after,
            "Rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                code: "RATE_LIMIT_EXCEEDED".to_string(),
                message: format!(
                    "Rate limit exceeded. Please retry after {} seconds.",
                    retry_after
                ),
                details: Some(serde_json::json!({
                    "retry_after": retry_after,
                    "limit": decision.limit,
                    "remaining": decision.remaining,
                    "tier": decision.tier.as_str(),
                })),
                request_id: Uuid::new_v4(),
                timestamp: Utc::now(),
            }),
        )
            .into_response();

        add_rate_limit_headers(&mut response, decision.limit, 0, decision.reset_at);

        let retry_after_val = retry_after.to_string();
        let headers = response.headers_mut();
        if let Ok(val) = HeaderValue::from_str(&retry_after_val) {
            headers.insert("retry-after", val);
        } else {
            headers.insert("retry-after", HeaderValue::from_static("60"));
        }

        response
    }
}
