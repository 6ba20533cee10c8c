//! The database side of reconciliation.

use async_trait::async_trait;
use mealcrm_db::{
    CachedClientRow, CachedClientUpsert, DbError, ManualClientRow, ManualOrderRow, OrderEvent,
    OrderEventOutcome,
};
use sqlx::PgPool;
use uuid::Uuid;

/// CRM clients, their manual orders, and the cached WooCommerce aggregate.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Overwrites a batch of aggregates; returns the number of rows written.
    async fn upsert_cached_clients(&self, batch: &[CachedClientUpsert]) -> Result<u64, DbError>;

    /// Idempotent per order id; see [`mealcrm_db::apply_order_event`].
    async fn apply_order_event(
        &self,
        event: &OrderEvent<'_>,
    ) -> Result<OrderEventOutcome, DbError>;

    async fn manual_client(&self, id: Uuid) -> Result<Option<ManualClientRow>, DbError>;

    async fn cached_client(&self, id: Uuid) -> Result<Option<CachedClientRow>, DbError>;

    async fn cached_client_by_email(&self, email: &str)
        -> Result<Option<CachedClientRow>, DbError>;

    async fn manual_orders_for_client(&self, client_id: Uuid)
        -> Result<Vec<ManualOrderRow>, DbError>;

    async fn manual_clients(&self) -> Result<Vec<ManualClientRow>, DbError>;

    async fn cached_clients(&self) -> Result<Vec<CachedClientRow>, DbError>;
}

#[async_trait]
impl ClientStore for PgPool {
    async fn upsert_cached_clients(&self, batch: &[CachedClientUpsert]) -> Result<u64, DbError> {
        mealcrm_db::upsert_cached_clients(self, batch).await
    }

    async fn apply_order_event(
        &self,
        event: &OrderEvent<'_>,
    ) -> Result<OrderEventOutcome, DbError> {
        mealcrm_db::apply_order_event(self, event).await
    }

    async fn manual_client(&self, id: Uuid) -> Result<Option<ManualClientRow>, DbError> {
        mealcrm_db::get_manual_client(self, id).await
    }

    async fn cached_client(&self, id: Uuid) -> Result<Option<CachedClientRow>, DbError> {
        mealcrm_db::get_cached_client(self, id).await
    }

    async fn cached_client_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CachedClientRow>, DbError> {
        mealcrm_db::get_cached_client_by_email(self, email).await
    }

    async fn manual_orders_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ManualOrderRow>, DbError> {
        mealcrm_db::list_manual_orders_for_client(self, client_id).await
    }

    async fn manual_clients(&self) -> Result<Vec<ManualClientRow>, DbError> {
        mealcrm_db::list_manual_clients(self).await
    }

    async fn cached_clients(&self) -> Result<Vec<CachedClientRow>, DbError> {
        mealcrm_db::list_cached_clients(self).await
    }
}
