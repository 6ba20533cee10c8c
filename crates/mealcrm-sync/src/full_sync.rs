//! Full reconciliation: replay a bounded window of WooCommerce orders into
//! the `cached_clients` aggregate.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mealcrm_core::{normalize_email, parse_order_date, AppConfig, ClientSource};
use mealcrm_db::{CachedClientUpsert, SyncRunStats};
use mealcrm_woo::{OrderQuery, WcOrder, GUEST_CUSTOMER_ID, MAX_PER_PAGE};
use serde::Serialize;

use crate::{ClientStore, OrderSource};

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_PAGES: u32 = 50;
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_STATUS: &str = "any";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    /// Hard ceiling on pages fetched per run.
    pub max_pages: u32,
    pub batch_size: usize,
    pub status: String,
    pub inter_page_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            batch_size: DEFAULT_BATCH_SIZE,
            status: DEFAULT_STATUS.to_owned(),
            inter_page_delay: Duration::ZERO,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.sync_page_size.min(MAX_PER_PAGE),
            max_pages: config.sync_max_pages,
            batch_size: config.sync_batch_size,
            status: DEFAULT_STATUS.to_owned(),
            inter_page_delay: Duration::from_millis(config.sync_inter_page_delay_ms),
        }
    }
}

/// Outcome of one full sync. Partial failures are recorded, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pages_fetched: u32,
    pub orders_seen: usize,
    pub orders_skipped_no_email: usize,
    pub clients_upserted: u64,
    pub failed_batches: u32,
    /// The page fetch error that stopped pagination early, if any.
    pub fetch_error: Option<String>,
}

impl SyncReport {
    #[must_use]
    pub fn run_stats(&self) -> SyncRunStats {
        SyncRunStats {
            pages_fetched: saturating_i32(u64::from(self.pages_fetched)),
            orders_seen: saturating_i32(u64::try_from(self.orders_seen).unwrap_or(u64::MAX)),
            clients_upserted: saturating_i32(self.clients_upserted),
            failed_batches: saturating_i32(u64::from(self.failed_batches)),
        }
    }
}

fn saturating_i32(n: u64) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Per-email aggregates in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub clients: Vec<CachedClientUpsert>,
    pub orders_skipped_no_email: usize,
}

/// Groups orders by normalised billing email.
///
/// Names, phone, address and city take the first non-empty value in
/// iteration order. `wc_customer_id` is the first non-guest customer id and
/// `source` is `registered` as soon as any order has one. Orders without an
/// email are counted in `orders_skipped_no_email` and otherwise ignored.
#[must_use]
pub fn aggregate_orders(orders: &[WcOrder]) -> Aggregation {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out = Aggregation::default();

    for order in orders {
        let email = normalize_email(&order.billing.email);
        if email.is_empty() {
            out.orders_skipped_no_email += 1;
            continue;
        }

        let slot = *index.entry(email.clone()).or_insert_with(|| {
            out.clients.push(CachedClientUpsert {
                email,
                phone: None,
                first_name: String::new(),
                last_name: String::new(),
                address: None,
                city: None,
                wc_customer_id: None,
                source: ClientSource::Guest,
                order_count: 0,
                last_order_date: None,
                order_ids: Vec::new(),
            });
            out.clients.len() - 1
        });
        fold_order(&mut out.clients[slot], order);
    }

    out
}

fn fold_order(client: &mut CachedClientUpsert, order: &WcOrder) {
    let billing = &order.billing;

    fill_string(&mut client.first_name, &billing.first_name);
    fill_string(&mut client.last_name, &billing.last_name);
    fill_option(&mut client.phone, &billing.phone);
    fill_option(&mut client.address, &billing.address_1);
    fill_option(&mut client.city, &billing.city);

    if order.customer_id != GUEST_CUSTOMER_ID {
        client.source = ClientSource::Registered;
        client.wc_customer_id.get_or_insert(order.customer_id);
    }

    client.order_count = client.order_count.saturating_add(1);
    client.order_ids.push(order.id);

    let created = order.created_at_raw().and_then(parse_order_date);
    client.last_order_date = later(client.last_order_date, created);
}

fn fill_string(slot: &mut String, value: &str) {
    let value = value.trim();
    if slot.is_empty() && !value.is_empty() {
        value.clone_into(slot);
    }
}

fn fill_option(slot: &mut Option<String>, value: &str) {
    let value = value.trim();
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value.to_owned());
    }
}

fn later(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Fetches orders page by page, aggregates them per email and upserts the
/// aggregates in batches.
///
/// Pagination stops at the last page reported by WooCommerce, at an empty
/// page, or after `max_pages`. A failed page fetch stops pagination but the
/// orders fetched so far are still written. A failed batch is logged and
/// counted; later batches still run.
pub async fn full_sync(
    source: &dyn OrderSource,
    store: &dyn ClientStore,
    options: &SyncOptions,
) -> SyncReport {
    let mut report = SyncReport::default();
    let mut orders: Vec<WcOrder> = Vec::new();

    for page in 1..=options.max_pages {
        if page > 1 && !options.inter_page_delay.is_zero() {
            tokio::time::sleep(options.inter_page_delay).await;
        }

        let query = OrderQuery::page(page, options.page_size).with_status(options.status.as_str());
        let fetched = match source.list_orders(&query).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(page, error = %e, "order page fetch failed; stopping pagination");
                report.fetch_error = Some(e.to_string());
                break;
            }
        };

        report.pages_fetched += 1;
        let fetched_count = fetched.orders.len();
        let is_last = fetched.is_last_page(page, query.per_page);

        tracing::debug!(page, orders = fetched_count, "fetched order page");
        orders.extend(fetched.orders);

        if is_last {
            break;
        }
    }

    report.orders_seen = orders.len();
    let aggregation = aggregate_orders(&orders);
    report.orders_skipped_no_email = aggregation.orders_skipped_no_email;

    for (batch_no, batch) in aggregation
        .clients
        .chunks(options.batch_size.max(1))
        .enumerate()
    {
        match store.upsert_cached_clients(batch).await {
            Ok(written) => report.clients_upserted += written,
            Err(e) => {
                tracing::error!(batch = batch_no, size = batch.len(), error = %e, "cached client batch upsert failed");
                report.failed_batches += 1;
            }
        }
    }

    tracing::info!(
        pages = report.pages_fetched,
        orders = report.orders_seen,
        skipped = report.orders_skipped_no_email,
        clients = report.clients_upserted,
        failed_batches = report.failed_batches,
        "full sync finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealcrm_woo::WcBilling;

    fn order(id: i64, email: &str, customer_id: i64, date: &str) -> WcOrder {
        WcOrder {
            id,
            customer_id,
            billing: WcBilling {
                email: email.to_owned(),
                ..WcBilling::default()
            },
            date_created: Some(date.to_owned()),
            ..WcOrder::default()
        }
    }

    #[test]
    fn first_non_empty_field_wins() {
        let mut first = order(1, "a@x.com", 0, "2024-01-01T00:00:00");
        first.billing.phone = "  ".to_owned();
        first.billing.first_name = "Ana".to_owned();
        let mut second = order(2, "A@X.com ", 0, "2024-02-01T00:00:00");
        second.billing.phone = "064 307-3023".to_owned();
        second.billing.first_name = "Anica".to_owned();
        second.billing.city = "Novi Sad".to_owned();

        let agg = aggregate_orders(&[first, second]);
        assert_eq!(agg.clients.len(), 1);
        let client = &agg.clients[0];
        assert_eq!(client.first_name, "Ana");
        assert_eq!(client.phone.as_deref(), Some("064 307-3023"));
        assert_eq!(client.city.as_deref(), Some("Novi Sad"));
        assert_eq!(client.order_ids, vec![1, 2]);
    }

    #[test]
    fn last_order_date_is_the_maximum() {
        let agg = aggregate_orders(&[
            order(1, "a@x.com", 0, "2024-03-01T00:00:00"),
            order(2, "a@x.com", 0, "2024-01-01T00:00:00"),
            order(3, "a@x.com", 0, "garbage"),
        ]);
        assert_eq!(
            agg.clients[0].last_order_date,
            parse_order_date("2024-03-01")
        );
    }

    #[test]
    fn orders_without_email_are_skipped() {
        let agg = aggregate_orders(&[
            order(1, "", 7, "2024-03-01T00:00:00"),
            order(2, "   ", 0, "2024-03-01T00:00:00"),
        ]);
        assert!(agg.clients.is_empty());
        assert_eq!(agg.orders_skipped_no_email, 2);
    }

    #[test]
    fn run_stats_saturate() {
        let report = SyncReport {
            clients_upserted: u64::MAX,
            ..SyncReport::default()
        };
        assert_eq!(report.run_stats().clients_upserted, i32::MAX);
    }
}
