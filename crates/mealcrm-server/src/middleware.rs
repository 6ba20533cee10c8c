//! Request plumbing for the CRM API: request correlation, operator API keys,
//! and a global request budget.
//!
//! Only the `/api/v1` CRM routes sit behind [`require_bearer_auth`] and
//! [`enforce_rate_limit`]. The health check and the WooCommerce webhook stay
//! public; the webhook proves itself with its HMAC signature instead.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

const API_KEYS_VAR: &str = "MEALCRM_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one API call, echoed back as `x-request-id` and
/// reported in every response's `meta.request_id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Operator API keys for the CRM routes.
///
/// Only SHA-256 digests of the configured keys are kept in memory.
#[derive(Debug, Clone)]
pub struct AuthState {
    key_digests: Arc<Vec<[u8; 32]>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads operator keys from `MEALCRM_API_KEYS`, a comma-separated list.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// A blank key list leaves the CRM open in development and refuses to
    /// start anywhere else.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let key_digests: Vec<[u8; 32]> = raw
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(sha256)
            .collect();

        if !key_digests.is_empty() {
            return Ok(Self {
                key_digests: Arc::new(key_digests),
                enabled: true,
            });
        }

        if !is_development {
            anyhow::bail!("{API_KEYS_VAR} must list at least one operator key outside development");
        }

        tracing::warn!("{API_KEYS_VAR} is empty; CRM routes are open (development only)");
        Ok(Self {
            key_digests: Arc::new(Vec::new()),
            enabled: false,
        })
    }

    /// Checks every configured key so the time taken does not depend on
    /// which key matched.
    fn allows(&self, key: &str) -> bool {
        let presented = sha256(key);
        self.key_digests.iter().fold(false, |matched, known| {
            matched | bool::from(known[..].ct_eq(&presented[..]))
        })
    }
}

fn sha256(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[derive(Debug, Clone)]
struct Budget {
    opened_at: Instant,
    used: usize,
}

/// Shared request budget for the CRM routes: at most `max_requests` per
/// `window`, counted across all callers.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    budget: Arc<Mutex<Budget>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            budget: Arc::new(Mutex::new(Budget {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct Rejection {
    error: RejectionDetail,
}

#[derive(Debug, Serialize)]
struct RejectionDetail {
    code: &'static str,
    message: &'static str,
}

/// Same `{"error": {code, message}}` shape the handlers use for `ApiError`.
fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(Rejection {
            error: RejectionDetail { code, message },
        }),
    )
        .into_response()
}

/// Tags each call with a [`RequestId`], reusing the caller's `x-request-id`
/// when present.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

/// Rejects CRM calls without a configured operator key as 401.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(key) if auth.allows(key) => next.run(req).await,
        _ => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or unknown API key",
        ),
    }
}

/// Answers 429 once the current window's budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut budget = limit.budget.lock().await;

    if budget.opened_at.elapsed() >= limit.window {
        budget.opened_at = Instant::now();
        budget.used = 0;
    }

    if budget.used >= limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many CRM requests; retry shortly",
        );
    }

    budget.used += 1;
    drop(budget);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn auth_state_disables_when_no_keys_in_dev() {
        let state = AuthState::from_keys(" , ", true).expect("dev should allow missing keys");
        assert!(!state.enabled);
    }

    #[test]
    fn auth_state_requires_keys_outside_dev() {
        assert!(AuthState::from_keys("", false).is_err());
    }

    #[test]
    fn auth_state_matches_configured_tokens_only() {
        let state = AuthState::from_keys("alpha, beta", false).expect("keys");
        assert!(state.enabled);
        assert!(state.allows("alpha"));
        assert!(state.allows("beta"));
        assert!(!state.allows("gamma"));
        assert!(!state.allows("alpha "));
    }
}
