use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::pagination::PageMeta;

/// WooCommerce sometimes sends `null` where the schema promises a string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Billing contact block shared by orders and customers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBilling {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address_1: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address_2: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub postcode: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcLineItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub total: Option<Decimal>,
}

/// An order as returned by `GET /orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WcOrder {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    /// `0` for guest checkouts.
    #[serde(default)]
    pub customer_id: i64,
    #[serde(default)]
    pub billing: WcBilling,
    /// Store-local timestamp without offset, e.g. `2024-03-01T10:15:00`.
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_created_gmt: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payment_method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payment_method_title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub customer_note: String,
    #[serde(default)]
    pub line_items: Vec<WcLineItem>,
}

impl WcOrder {
    /// Line item names joined with `", "`, with quantities above one noted.
    #[must_use]
    pub fn product_summary(&self) -> String {
        self.line_items
            .iter()
            .map(|item| {
                if item.quantity > 1 {
                    format!("{} x{}", item.name, item.quantity)
                } else {
                    item.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The GMT timestamp when present, otherwise the store-local one.
    #[must_use]
    pub fn created_at_raw(&self) -> Option<&str> {
        self.date_created_gmt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.date_created.as_deref())
    }
}

/// A registered customer as returned by `GET /customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcCustomer {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default)]
    pub billing: WcBilling,
    #[serde(default)]
    pub date_created: Option<String>,
}

/// One page of orders plus the pagination headers that came with it.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<WcOrder>,
    pub meta: PageMeta,
}

impl OrderPage {
    /// Whether a walk requesting `per_page` orders should stop after `page`.
    ///
    /// An empty page always ends the walk. Otherwise the `X-WP-TotalPages`
    /// header decides, and a short page stands in for it when absent.
    #[must_use]
    pub fn is_last_page(&self, page: u32, per_page: u32) -> bool {
        self.orders.is_empty()
            || self.meta.is_last_page(page)
            || (self.meta.total_pages.is_none() && self.orders.len() < per_page as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_tolerates_nulls_and_missing_fields() {
        let order: WcOrder = serde_json::from_value(serde_json::json!({
            "id": 42,
            "status": "processing",
            "customer_id": 0,
            "billing": { "email": null, "phone": "064 307-3023", "first_name": "Ana" },
            "date_created": "2024-03-01T10:15:00",
            "total": "1250.00",
            "line_items": [{ "id": 1, "name": "Keto plan 20 dana", "quantity": 1 }]
        }))
        .expect("order should deserialize");

        assert_eq!(order.id, 42);
        assert_eq!(order.billing.email, "");
        assert_eq!(order.billing.last_name, "");
        assert_eq!(order.total, Some(Decimal::new(125_000, 2)));
        assert_eq!(order.product_summary(), "Keto plan 20 dana");
    }

    #[test]
    fn product_summary_notes_quantities() {
        let order: WcOrder = serde_json::from_value(serde_json::json!({
            "id": 1,
            "line_items": [
                { "name": "Lunch box", "quantity": 2 },
                { "name": "Salad", "quantity": 1 }
            ]
        }))
        .unwrap();
        assert_eq!(order.product_summary(), "Lunch box x2, Salad");
    }

    #[test]
    fn created_at_prefers_gmt() {
        let order: WcOrder = serde_json::from_value(serde_json::json!({
            "id": 1,
            "date_created": "2024-03-01T11:00:00",
            "date_created_gmt": "2024-03-01T10:00:00"
        }))
        .unwrap();
        assert_eq!(order.created_at_raw(), Some("2024-03-01T10:00:00"));
    }

    fn page_of(len: usize, total_pages: Option<u32>) -> OrderPage {
        OrderPage {
            orders: vec![WcOrder::default(); len],
            meta: PageMeta {
                total: None,
                total_pages,
            },
        }
    }

    #[test]
    fn last_page_follows_total_pages_header() {
        assert!(!page_of(2, Some(3)).is_last_page(2, 2));
        assert!(page_of(2, Some(3)).is_last_page(3, 2));
        assert!(!page_of(1, Some(3)).is_last_page(1, 2));
    }

    #[test]
    fn last_page_without_header_uses_short_or_empty_page() {
        assert!(!page_of(2, None).is_last_page(5, 2));
        assert!(page_of(1, None).is_last_page(5, 2));
        assert!(page_of(0, Some(9)).is_last_page(1, 2));
    }
}
