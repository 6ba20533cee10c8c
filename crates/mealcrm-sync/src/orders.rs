//! Merged order list for a single client.

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use mealcrm_core::{
    parse_order_date, ClientOrderItem, ClientSource, Identifier, OrderOrigin, EPOCH,
};
use mealcrm_db::ManualOrderRow;
use mealcrm_woo::WcOrder;
use regex::Regex;

use crate::resolve::orders_matching_any;
use crate::{resolve_client, ClientStore, OrderSource, SyncError};

const UNKNOWN_DURATION: &str = "n/a";

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:days?|dana|dan)\b").expect("valid duration regex")
});

/// All orders of the client behind `identifier`, newest start date first.
///
/// CRM clients contribute their manual orders. WooCommerce orders are those
/// whose billing matches the contact identifier, or for a key, either the
/// client's email or phone; each order appears once. Returns `Ok(None)` when
/// the client cannot be resolved.
///
/// # Errors
///
/// Returns [`SyncError`] if WooCommerce or the database fails.
pub async fn client_orders(
    source: &dyn OrderSource,
    store: &dyn ClientStore,
    identifier: &Identifier,
    search_window: u32,
) -> Result<Option<Vec<ClientOrderItem>>, SyncError> {
    let Some(client) = resolve_client(source, store, identifier, search_window).await? else {
        return Ok(None);
    };

    let mut items = Vec::new();

    if let (ClientSource::Crm, Identifier::ByKey(id)) = (client.source, identifier) {
        let rows = store.manual_orders_for_client(*id).await?;
        items.extend(rows.iter().map(manual_item));
    }

    let needles: Vec<&str> = match identifier {
        Identifier::ByContact(contact) => vec![contact.as_str()],
        Identifier::ByKey(_) => [client.email.as_deref(), client.phone.as_deref()]
            .into_iter()
            .flatten()
            .filter(|n| !n.trim().is_empty())
            .collect(),
    };
    let orders = orders_matching_any(source, &needles, search_window).await?;
    items.extend(orders.iter().map(woo_item));

    sort_by_start_date_desc(&mut items);
    Ok(Some(items))
}

fn manual_item(row: &ManualOrderRow) -> ClientOrderItem {
    ClientOrderItem {
        id: row.id.to_string(),
        product: row.product_name.clone(),
        start_date: row.start_date.format("%Y-%m-%d").to_string(),
        duration: format!("{} days", row.duration_days),
        status: row.status.clone(),
        payment_method: row.payment_method.clone(),
        origin: OrderOrigin::Crm,
    }
}

fn woo_item(order: &WcOrder) -> ClientOrderItem {
    // Store-local date, so an order placed late in the evening keeps its day.
    let raw = order
        .date_created
        .as_deref()
        .or(order.date_created_gmt.as_deref())
        .unwrap_or_default();
    let start_date = parse_order_date(raw).map_or_else(
        || raw.to_owned(),
        |dt| dt.date_naive().format("%Y-%m-%d").to_string(),
    );

    let duration = order
        .line_items
        .first()
        .and_then(|item| parse_duration(&item.name))
        .map_or_else(|| UNKNOWN_DURATION.to_owned(), |days| format!("{days} days"));

    let payment_method = if order.payment_method_title.trim().is_empty() {
        order.payment_method.clone()
    } else {
        order.payment_method_title.clone()
    };

    ClientOrderItem {
        id: order.id.to_string(),
        product: order.product_summary(),
        start_date,
        duration,
        status: order.status.clone(),
        payment_method,
        origin: OrderOrigin::WooCommerce,
    }
}

/// Extracts a day count from a product name such as `Fit plan 20 dana`.
#[must_use]
pub fn parse_duration(product_name: &str) -> Option<u32> {
    DURATION_RE
        .captures(product_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn sort_key(start_date: &str) -> DateTime<Utc> {
    parse_order_date(start_date).unwrap_or(EPOCH)
}

/// Stable sort, newest first. Unparsable dates sort as the Unix epoch.
pub fn sort_by_start_date_desc(items: &mut [ClientOrderItem]) {
    items.sort_by_key(|item| Reverse(sort_key(&item.start_date)));
}
