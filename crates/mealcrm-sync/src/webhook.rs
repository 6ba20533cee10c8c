//! Incremental reconciliation from WooCommerce order webhooks.
//!
//! WooCommerce signs each delivery with
//! `base64(HMAC-SHA256(secret, raw_body))` in `X-WC-Webhook-Signature`.
//! Signature checking happens before [`handle_delivery`] is called.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use mealcrm_core::{normalize_email, parse_order_date};
use mealcrm_db::{OrderEvent, OrderEventOutcome};
use mealcrm_woo::{WcOrder, GUEST_CUSTOMER_ID};
use serde::Serialize;
use sha2::Sha256;

use crate::{ClientStore, SyncError};

type HmacSha256 = Hmac<Sha256>;

const ORDER_TOPICS: [&str; 2] = ["order.created", "order.updated"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// First delivery of this order; the client's count went up by one.
    Counted,
    /// Order id already recorded; nothing was counted.
    Duplicate,
    /// Ping, unrelated topic, or an order without a billing email.
    Ignored,
}

impl WebhookOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counted => "counted",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
        }
    }
}

impl From<OrderEventOutcome> for WebhookOutcome {
    fn from(outcome: OrderEventOutcome) -> Self {
        match outcome {
            OrderEventOutcome::Counted { .. } => Self::Counted,
            OrderEventOutcome::Duplicate { .. } => Self::Duplicate,
        }
    }
}

/// Base64 HMAC-SHA256 of `body`, as WooCommerce sends it.
#[must_use]
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Checks a delivery signature in constant time. Malformed base64 fails.
#[must_use]
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[must_use]
pub fn is_order_topic(topic: &str) -> bool {
    ORDER_TOPICS.contains(&topic.trim())
}

/// Converts an order payload into a cache event. `None` when the order has
/// no billing email and cannot be linked to a client.
#[must_use]
pub fn order_event<'a>(order: &'a WcOrder, email: &'a str) -> Option<OrderEvent<'a>> {
    if email.is_empty() {
        return None;
    }
    let billing = &order.billing;
    Some(OrderEvent {
        order_id: order.id,
        email,
        phone: non_empty(&billing.phone),
        first_name: billing.first_name.trim(),
        last_name: billing.last_name.trim(),
        address: non_empty(&billing.address_1),
        city: non_empty(&billing.city),
        wc_customer_id: (order.customer_id != GUEST_CUSTOMER_ID).then_some(order.customer_id),
        date_created: order.created_at_raw().and_then(parse_order_date),
    })
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Applies one authenticated webhook delivery.
///
/// Topics other than `order.created` / `order.updated` (including the ping
/// WooCommerce sends when a webhook is created, whose topic header is absent)
/// are ignored without parsing the body.
///
/// # Errors
///
/// Returns [`SyncError::InvalidPayload`] if an order topic carries a body
/// that is not an order, or [`SyncError::Store`] if the cache update fails.
pub async fn handle_delivery(
    store: &dyn ClientStore,
    topic: Option<&str>,
    body: &[u8],
) -> Result<WebhookOutcome, SyncError> {
    let Some(topic) = topic.filter(|t| is_order_topic(t)) else {
        tracing::debug!(?topic, "ignoring non-order webhook delivery");
        return Ok(WebhookOutcome::Ignored);
    };

    let order: WcOrder = serde_json::from_slice(body).map_err(SyncError::InvalidPayload)?;
    let email = normalize_email(&order.billing.email);
    let Some(event) = order_event(&order, &email) else {
        tracing::info!(order_id = order.id, topic, "webhook order has no billing email; ignored");
        return Ok(WebhookOutcome::Ignored);
    };

    let outcome = store.apply_order_event(&event).await?;
    tracing::info!(
        order_id = order.id,
        topic,
        email = %email,
        order_count = outcome.order_count(),
        outcome = WebhookOutcome::from(outcome).as_str(),
        "applied webhook order"
    );
    Ok(outcome.into())
}
