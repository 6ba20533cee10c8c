//! The client directory: CRM clients and cached WooCommerce clients merged
//! into one deduplicated, searchable list.

use std::cmp::Ordering;
use std::collections::HashMap;

use mealcrm_core::{normalize_email, normalize_phone, ClientSource, ClientView};
use mealcrm_db::{CachedClientRow, ManualClientRow};
use serde::Serialize;

use crate::resolve::{cached_view, enrich_from_cache, manual_view};
use crate::{ClientStore, SyncError};

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Case-insensitive substring over name, email and phone.
    pub search: Option<String>,
    pub source: Option<ClientSource>,
    /// 1-based.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPage {
    pub items: Vec<ClientView>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

/// Merges CRM and cached clients.
///
/// A cached client whose normalised email or phone matches a CRM client is
/// folded into that CRM entry: CRM identity wins and the cached order count
/// and last order date enrich it. Other cached clients are kept as they are.
#[must_use]
pub fn merge_clients(manual: &[ManualClientRow], cached: &[CachedClientRow]) -> Vec<ClientView> {
    let mut views: Vec<ClientView> = manual.iter().map(manual_view).collect();

    let mut by_email: HashMap<String, usize> = HashMap::new();
    let mut by_phone: HashMap<String, usize> = HashMap::new();
    for (i, row) in manual.iter().enumerate() {
        by_email.entry(normalize_email(&row.email)).or_insert(i);
        if let Some(phone) = row.phone.as_deref().map(normalize_phone) {
            if !phone.is_empty() {
                by_phone.entry(phone).or_insert(i);
            }
        }
    }

    for row in cached {
        let phone = row.phone.as_deref().map(normalize_phone).unwrap_or_default();
        let target = by_email.get(&normalize_email(&row.email)).copied().or_else(|| {
            if phone.is_empty() {
                None
            } else {
                by_phone.get(&phone).copied()
            }
        });

        match target {
            Some(i) => enrich_from_cache(&mut views[i], row),
            None => views.push(cached_view(row)),
        }
    }

    views
}

fn matches_search(view: &ClientView, needle: &str) -> bool {
    let name = view.display_name().to_lowercase();
    if name.contains(needle) {
        return true;
    }
    if view
        .email
        .as_deref()
        .is_some_and(|e| e.to_lowercase().contains(needle))
    {
        return true;
    }
    let needle_phone = normalize_phone(needle);
    !needle_phone.is_empty()
        && view
            .phone
            .as_deref()
            .is_some_and(|p| normalize_phone(p).contains(&needle_phone))
}

/// Most recent order first (clients without orders last), then by name.
fn directory_order(a: &ClientView, b: &ClientView) -> Ordering {
    let by_date = match (a.last_order_date, b.last_order_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| {
        a.display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase())
    })
}

/// Filters, sorts and paginates merged views.
#[must_use]
pub fn filter_and_page(mut views: Vec<ClientView>, filter: &ClientFilter) -> ClientPage {
    if let Some(source) = filter.source {
        views.retain(|v| v.source == source);
    }
    if let Some(needle) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = needle.to_lowercase();
        views.retain(|v| matches_search(v, &needle));
    }
    views.sort_by(directory_order);

    let page = filter.page.unwrap_or(1).max(1);
    let per_page = filter
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let total = views.len();
    let skip = (page as usize - 1).saturating_mul(per_page as usize);
    let items = views.into_iter().skip(skip).take(per_page as usize).collect();

    ClientPage {
        items,
        total,
        page,
        per_page,
    }
}

/// Loads, merges, filters and paginates the client directory.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if either table cannot be read.
pub async fn list_clients(
    store: &dyn ClientStore,
    filter: &ClientFilter,
) -> Result<ClientPage, SyncError> {
    let manual = store.manual_clients().await?;
    let cached = store.cached_clients().await?;
    Ok(filter_and_page(merge_clients(&manual, &cached), filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn manual(email: &str, phone: Option<&str>, first: &str) -> ManualClientRow {
        let now = Utc::now();
        ManualClientRow {
            id: Uuid::new_v4(),
            first_name: first.to_owned(),
            last_name: "Crm".to_owned(),
            email: email.to_owned(),
            phone: phone.map(str::to_owned),
            address: None,
            city: None,
            postcode: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn cached(email: &str, phone: Option<&str>, count: i32, day: u32) -> CachedClientRow {
        CachedClientRow {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            phone: phone.map(str::to_owned),
            first_name: "Cached".to_owned(),
            last_name: "Client".to_owned(),
            address: None,
            city: None,
            wc_customer_id: None,
            source: "guest".to_owned(),
            order_count: count,
            last_order_date: Some(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cached_client_folds_into_crm_by_email_or_phone() {
        let crm = vec![
            manual("ana@example.com", None, "Ana"),
            manual("marko@example.com", Some("064 111-2222"), "Marko"),
        ];
        let cache = vec![
            cached("ANA@example.com", None, 3, 5),
            cached("marko.other@example.com", Some("0641112222"), 2, 6),
            cached("new@example.com", None, 1, 7),
        ];

        let views = merge_clients(&crm, &cache);
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].source, ClientSource::Crm);
        assert_eq!(views[0].first_name, "Ana");
        assert_eq!(views[0].order_count, 3);
        assert_eq!(views[1].first_name, "Marko");
        assert_eq!(views[1].order_count, 2);
        assert_eq!(views[2].email.as_deref(), Some("new@example.com"));
        assert_eq!(views[2].source, ClientSource::Guest);
    }

    #[test]
    fn directory_sorts_by_recent_order_then_name_and_paginates() {
        let crm = vec![
            manual("zed@example.com", None, "Zed"),
            manual("amy@example.com", None, "Amy"),
        ];
        let cache = vec![
            cached("c1@example.com", None, 1, 1),
            cached("c2@example.com", None, 1, 9),
        ];
        let views = merge_clients(&crm, &cache);

        let page = filter_and_page(
            views,
            &ClientFilter {
                page: Some(1),
                per_page: Some(3),
                ..ClientFilter::default()
            },
        );
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].email.as_deref(), Some("c2@example.com"));
        assert_eq!(page.items[1].email.as_deref(), Some("c1@example.com"));
        assert_eq!(page.items[2].first_name, "Amy");
    }

    #[test]
    fn search_and_source_filters_apply() {
        let crm = vec![manual("ana@example.com", Some("064 307-3023"), "Ana")];
        let cache = vec![cached("other@example.com", None, 1, 1)];
        let views = merge_clients(&crm, &cache);

        let by_phone = filter_and_page(
            views.clone(),
            &ClientFilter {
                search: Some("0643073023".to_owned()),
                ..ClientFilter::default()
            },
        );
        assert_eq!(by_phone.total, 1);
        assert_eq!(by_phone.items[0].first_name, "Ana");

        let guests = filter_and_page(
            views,
            &ClientFilter {
                source: Some(ClientSource::Guest),
                ..ClientFilter::default()
            },
        );
        assert_eq!(guests.total, 1);
        assert_eq!(guests.items[0].email.as_deref(), Some("other@example.com"));
    }

    #[test]
    fn per_page_is_clamped() {
        let page = filter_and_page(
            Vec::new(),
            &ClientFilter {
                page: Some(0),
                per_page: Some(10_000),
                ..ClientFilter::default()
            },
        );
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, MAX_PER_PAGE);
    }
}
