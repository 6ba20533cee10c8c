//! Client/order reconciliation between WooCommerce and the CRM database.
//!
//! Every operation takes its collaborators as trait objects: an
//! [`OrderSource`] (implemented for [`mealcrm_woo::WooClient`]) and a
//! [`ClientStore`] (implemented for [`sqlx::PgPool`]).

pub mod directory;
pub mod error;
pub mod full_sync;
pub mod orders;
pub mod resolve;
pub mod runs;
pub mod source;
pub mod store;
pub mod webhook;

pub use directory::{filter_and_page, list_clients, merge_clients, ClientFilter, ClientPage};
pub use error::SyncError;
pub use full_sync::{aggregate_orders, full_sync, Aggregation, SyncOptions, SyncReport};
pub use orders::{client_orders, parse_duration, sort_by_start_date_desc};
pub use resolve::resolve_client;
pub use runs::{recorded_full_sync, RecordedSync};
pub use source::{woo_client_from_config, OrderSource};
pub use store::ClientStore;
pub use webhook::{
    handle_delivery, is_order_topic, order_event, sign_payload, verify_signature, WebhookOutcome,
};
