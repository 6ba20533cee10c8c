//! Typed client for the WooCommerce REST API (`/wp-json/wc/v3`).

pub mod client;
pub mod error;
pub mod pagination;
pub(crate) mod retry;
pub mod types;

pub use client::{OrderQuery, WooClient, WooCredentials, GUEST_CUSTOMER_ID, MAX_PER_PAGE};
pub use error::WooError;
pub use pagination::PageMeta;
pub use types::{OrderPage, WcBilling, WcCustomer, WcLineItem, WcOrder};
