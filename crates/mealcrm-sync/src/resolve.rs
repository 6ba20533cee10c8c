//! Identity resolution: turn an [`Identifier`] into a unified [`ClientView`].

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mealcrm_core::{
    contact_matches, normalize_email, parse_order_date, ClientSource, ClientView, Identifier,
};
use mealcrm_db::{CachedClientRow, ManualClientRow};
use mealcrm_woo::{WcCustomer, WcOrder, GUEST_CUSTOMER_ID};

use crate::{ClientStore, OrderSource, SyncError};

/// Resolves a client identifier.
///
/// Keys are looked up in `manual_clients`, then `cached_clients`. Contact
/// strings go through WooCommerce order search (at most `search_window`
/// results) filtered to exact phone/email matches; an email with no matching
/// order gets one more try against the customer directory.
///
/// Returns `Ok(None)` once every strategy has come up empty.
///
/// # Errors
///
/// Returns [`SyncError`] if WooCommerce or the database fails. A failed
/// registered-customer fetch is not an error; the order billing is used.
pub async fn resolve_client(
    source: &dyn OrderSource,
    store: &dyn ClientStore,
    identifier: &Identifier,
    search_window: u32,
) -> Result<Option<ClientView>, SyncError> {
    match identifier {
        Identifier::ByKey(id) => {
            if let Some(manual) = store.manual_client(*id).await? {
                let cached = store.cached_client_by_email(&manual.email).await?;
                let mut view = manual_view(&manual);
                if let Some(cached) = cached {
                    enrich_from_cache(&mut view, &cached);
                }
                return Ok(Some(view));
            }
            Ok(store.cached_client(*id).await?.map(|row| cached_view(&row)))
        }
        Identifier::ByContact(needle) => resolve_contact(source, needle, search_window).await,
    }
}

async fn resolve_contact(
    source: &dyn OrderSource,
    needle: &str,
    search_window: u32,
) -> Result<Option<ClientView>, SyncError> {
    let matches = matching_orders(source, needle, search_window).await?;

    if let Some(first) = matches.first() {
        let mut view = view_from_billing(needle, first);
        if first.customer_id != GUEST_CUSTOMER_ID {
            match source.get_customer(first.customer_id).await {
                Ok(customer) => apply_customer(&mut view, &customer),
                Err(e) => tracing::warn!(
                    customer_id = first.customer_id,
                    error = %e,
                    "customer fetch failed; using order billing"
                ),
            }
        }
        view.order_count = i64::try_from(matches.len()).unwrap_or(i64::MAX);
        view.last_order_date = matches
            .iter()
            .filter_map(|o| o.created_at_raw().and_then(parse_order_date))
            .max();
        return Ok(Some(view));
    }

    if needle.contains('@') {
        let email = normalize_email(needle);
        let customers = source.find_customers_by_email(&email).await?;
        if let Some(customer) = customers.first() {
            let mut view = empty_view(needle, ClientSource::Registered);
            apply_customer(&mut view, customer);
            return Ok(Some(view));
        }
    }

    Ok(None)
}

/// Orders from a free-text search whose billing phone or email matches
/// `needle` exactly. WooCommerce search is fuzzy, so results are filtered
/// locally.
pub(crate) async fn matching_orders(
    source: &dyn OrderSource,
    needle: &str,
    search_window: u32,
) -> Result<Vec<WcOrder>, SyncError> {
    let orders = source.search_orders(needle, search_window).await?;
    Ok(orders
        .into_iter()
        .filter(|o| contact_matches(&o.billing.phone, &o.billing.email, needle))
        .collect())
}

/// Union of [`matching_orders`] over several needles, deduplicated by order
/// id in first-seen order.
pub(crate) async fn orders_matching_any(
    source: &dyn OrderSource,
    needles: &[&str],
    search_window: u32,
) -> Result<Vec<WcOrder>, SyncError> {
    let mut seen = HashSet::new();
    let mut orders = Vec::new();
    for needle in needles {
        for order in matching_orders(source, needle, search_window).await? {
            if seen.insert(order.id) {
                orders.push(order);
            }
        }
    }
    Ok(orders)
}

fn empty_view(id: &str, source: ClientSource) -> ClientView {
    ClientView {
        id: id.to_owned(),
        first_name: String::new(),
        last_name: String::new(),
        email: None,
        phone: None,
        address: None,
        city: None,
        postcode: None,
        source,
        wc_customer_id: None,
        order_count: 0,
        last_order_date: None,
    }
}

fn view_from_billing(needle: &str, order: &WcOrder) -> ClientView {
    let billing = &order.billing;
    let registered = order.customer_id != GUEST_CUSTOMER_ID;
    ClientView {
        id: needle.to_owned(),
        first_name: billing.first_name.trim().to_owned(),
        last_name: billing.last_name.trim().to_owned(),
        email: non_empty(&normalize_email(&billing.email)),
        phone: non_empty(&billing.phone),
        address: non_empty(&billing.address_1),
        city: non_empty(&billing.city),
        postcode: non_empty(&billing.postcode),
        source: if registered {
            ClientSource::Registered
        } else {
            ClientSource::Guest
        },
        wc_customer_id: registered.then_some(order.customer_id),
        order_count: 0,
        last_order_date: None,
    }
}

/// Overlays registered-customer fields; blanks keep what is already there.
fn apply_customer(view: &mut ClientView, customer: &WcCustomer) {
    let billing = &customer.billing;
    let first = first_non_empty(&customer.first_name, &billing.first_name);
    let last = first_non_empty(&customer.last_name, &billing.last_name);
    if let Some(first) = first {
        view.first_name = first;
    }
    if let Some(last) = last {
        view.last_name = last;
    }
    if let Some(email) = first_non_empty(&customer.email, &billing.email) {
        view.email = Some(normalize_email(&email));
    }
    overlay(&mut view.phone, &billing.phone);
    overlay(&mut view.address, &billing.address_1);
    overlay(&mut view.city, &billing.city);
    overlay(&mut view.postcode, &billing.postcode);
    view.source = ClientSource::Registered;
    view.wc_customer_id = Some(customer.id);
}

fn overlay(slot: &mut Option<String>, value: &str) {
    if let Some(value) = non_empty(value) {
        *slot = Some(value);
    }
}

fn first_non_empty(a: &str, b: &str) -> Option<String> {
    non_empty(a).or_else(|| non_empty(b))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

pub(crate) fn manual_view(row: &ManualClientRow) -> ClientView {
    ClientView {
        id: row.id.to_string(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        email: Some(row.email.clone()),
        phone: row.phone.clone(),
        address: row.address.clone(),
        city: row.city.clone(),
        postcode: row.postcode.clone(),
        source: ClientSource::Crm,
        wc_customer_id: None,
        order_count: 0,
        last_order_date: None,
    }
}

pub(crate) fn cached_view(row: &CachedClientRow) -> ClientView {
    ClientView {
        id: row.id.to_string(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        email: Some(row.email.clone()),
        phone: row.phone.clone(),
        address: row.address.clone(),
        city: row.city.clone(),
        postcode: None,
        source: ClientSource::from_str(&row.source).unwrap_or(ClientSource::Guest),
        wc_customer_id: row.wc_customer_id,
        order_count: i64::from(row.order_count),
        last_order_date: row.last_order_date,
    }
}

/// Folds a cached aggregate into a CRM view. CRM identity fields stay.
pub(crate) fn enrich_from_cache(view: &mut ClientView, cached: &CachedClientRow) {
    view.order_count += i64::from(cached.order_count);
    view.last_order_date = later(view.last_order_date, cached.last_order_date);
    if view.wc_customer_id.is_none() {
        view.wc_customer_id = cached.wc_customer_id;
    }
}

fn later(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
