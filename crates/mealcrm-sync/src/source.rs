//! The WooCommerce side of reconciliation.

use async_trait::async_trait;
use mealcrm_core::AppConfig;
use mealcrm_woo::{
    OrderPage, OrderQuery, WcCustomer, WcOrder, WooClient, WooCredentials, WooError,
};

/// Read-only access to store orders and customers.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// One page of orders plus the pagination headers.
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, WooError>;

    /// Free-text order search, any status, at most `limit` results.
    async fn search_orders(&self, search: &str, limit: u32) -> Result<Vec<WcOrder>, WooError>;

    async fn get_customer(&self, customer_id: i64) -> Result<WcCustomer, WooError>;

    /// Customers whose account email equals `email` exactly.
    async fn find_customers_by_email(&self, email: &str) -> Result<Vec<WcCustomer>, WooError>;
}

#[async_trait]
impl OrderSource for WooClient {
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, WooError> {
        WooClient::list_orders(self, query).await
    }

    async fn search_orders(&self, search: &str, limit: u32) -> Result<Vec<WcOrder>, WooError> {
        WooClient::search_orders(self, search, limit).await
    }

    async fn get_customer(&self, customer_id: i64) -> Result<WcCustomer, WooError> {
        WooClient::get_customer(self, customer_id).await
    }

    async fn find_customers_by_email(&self, email: &str) -> Result<Vec<WcCustomer>, WooError> {
        WooClient::find_customers_by_email(self, email).await
    }
}

/// Builds the WooCommerce client from application config.
///
/// # Errors
///
/// Returns [`WooError`] if the store URL is invalid or the HTTP client
/// cannot be built.
pub fn woo_client_from_config(config: &AppConfig) -> Result<WooClient, WooError> {
    WooClient::new(
        &config.woo_base_url,
        WooCredentials {
            consumer_key: config.woo_consumer_key.clone(),
            consumer_secret: config.woo_consumer_secret.clone(),
        },
        config.woo_request_timeout_secs,
        &config.woo_user_agent,
        config.woo_max_retries,
        config.woo_retry_backoff_base_secs,
    )
}
