//! Order endpoints: paginated listing, free-text search, single fetch.

use crate::error::WooError;
use crate::types::{OrderPage, WcOrder};

use super::{WooClient, MAX_PER_PAGE};

/// Query for `GET /orders`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    /// WooCommerce status slug (`any`, `processing`, `completed`, ...).
    pub status: Option<String>,
    /// Free-text search. WooCommerce matches it loosely against billing and
    /// shipping fields, so results must be filtered by the caller.
    pub search: Option<String>,
}

impl OrderQuery {
    #[must_use]
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            status: None,
            search: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub(super) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status", status.to_owned()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_owned()));
        }
        pairs
    }
}

impl WooClient {
    /// Fetches one page of orders.
    ///
    /// # Errors
    ///
    /// - [`WooError::RateLimited`]: HTTP 429 after all retries.
    /// - [`WooError::Unauthorized`]: bad consumer key/secret.
    /// - [`WooError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`WooError::Http`]: network or TLS failure after all retries.
    /// - [`WooError::Deserialize`]: body is not a list of orders.
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, WooError> {
        let (orders, meta) = self
            .get_json::<Vec<WcOrder>>(
                "orders",
                &query.to_pairs(),
                &format!("orders page {}", query.page),
            )
            .await?;
        Ok(OrderPage { orders, meta })
    }

    /// Runs a free-text order search, returning at most `limit` orders
    /// (newest first, WooCommerce's default ordering).
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_orders`].
    pub async fn search_orders(&self, search: &str, limit: u32) -> Result<Vec<WcOrder>, WooError> {
        let query = OrderQuery::page(1, limit)
            .with_status("any")
            .with_search(search);
        Ok(self.list_orders(&query).await?.orders)
    }

    /// Fetches a single order by id.
    ///
    /// # Errors
    ///
    /// Returns [`WooError::NotFound`] for an unknown id, otherwise as
    /// [`Self::list_orders`].
    pub async fn get_order(&self, order_id: i64) -> Result<WcOrder, WooError> {
        let (order, _) = self
            .get_json::<WcOrder>(
                &format!("orders/{order_id}"),
                &[],
                &format!("order {order_id}"),
            )
            .await?;
        Ok(order)
    }
}
