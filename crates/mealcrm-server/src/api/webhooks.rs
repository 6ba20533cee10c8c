//! `POST /api/v1/webhooks/woocommerce`: incremental cache updates pushed by
//! the store.
//!
//! WooCommerce expects a bare acknowledgement rather than the API envelope,
//! so replies here are `{ success, outcome }` or `{ success, error }`.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use mealcrm_sync::{SyncError, WebhookOutcome};
use serde::Serialize;

use crate::middleware::RequestId;

use super::AppState;

const TOPIC_HEADER: &str = "x-wc-webhook-topic";
const SIGNATURE_HEADER: &str = "x-wc-webhook-signature";
const WEBHOOK_ID_HEADER: &str = "x-wc-webhook-id";

#[derive(Debug, Serialize)]
pub(super) struct WebhookReply {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WebhookReply {
    fn applied(outcome: WebhookOutcome) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                outcome: Some(outcome.as_str()),
                error: None,
            }),
        )
    }

    fn rejected(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: false,
                outcome: None,
                error: Some(error.into()),
            }),
        )
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Checks the delivery signature. `Err` carries the rejection message.
fn authenticate(secret: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Result<(), &'static str> {
    let Some(secret) = secret else {
        tracing::warn!("webhook secret not configured; accepting unsigned delivery");
        return Ok(());
    };
    let signature = header_str(headers, SIGNATURE_HEADER).ok_or("missing webhook signature")?;
    if mealcrm_sync::verify_signature(secret.as_bytes(), body, signature) {
        Ok(())
    } else {
        Err("invalid webhook signature")
    }
}

pub(super) async fn receive_woocommerce(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookReply>) {
    let topic = header_str(&headers, TOPIC_HEADER);
    let webhook_id = header_str(&headers, WEBHOOK_ID_HEADER);

    if let Err(reason) = authenticate(state.settings.webhook_secret.as_deref(), &headers, &body) {
        tracing::warn!(
            request_id = %req_id.0,
            ?webhook_id,
            ?topic,
            reason,
            "rejected webhook delivery"
        );
        return WebhookReply::rejected(StatusCode::UNAUTHORIZED, reason);
    }

    match mealcrm_sync::handle_delivery(&state.pool, topic, &body).await {
        Ok(outcome) => WebhookReply::applied(outcome),
        Err(SyncError::InvalidPayload(e)) => {
            tracing::warn!(request_id = %req_id.0, ?webhook_id, ?topic, error = %e, "unparsable webhook payload");
            WebhookReply::rejected(StatusCode::BAD_REQUEST, format!("invalid payload: {e}"))
        }
        Err(e) => {
            tracing::error!(request_id = %req_id.0, ?webhook_id, ?topic, error = %e, "webhook processing failed");
            WebhookReply::rejected(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to apply webhook delivery",
            )
        }
    }
}
