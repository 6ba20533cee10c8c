//! Database operations for `cached_clients` and the `synced_orders` ledger.
//!
//! `cached_clients` is a per-email aggregate derived from WooCommerce orders.
//! Full syncs overwrite rows wholesale; webhook events go through
//! [`apply_order_event`], which only increments `order_count` the first time
//! an order id is recorded in `synced_orders`.

use chrono::{DateTime, Utc};
use mealcrm_core::ClientSource;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `cached_clients` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CachedClientRow {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub wc_customer_id: Option<i64>,
    /// `guest` or `registered`.
    pub source: String,
    pub order_count: i32,
    pub last_order_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One aggregate produced by a full sync. Every column is overwritten on
/// conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClientUpsert {
    /// Normalised email; the conflict key.
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub wc_customer_id: Option<i64>,
    pub source: ClientSource,
    pub order_count: i32,
    pub last_order_date: Option<DateTime<Utc>>,
    /// WooCommerce order ids folded into `order_count`; recorded in the ledger.
    pub order_ids: Vec<i64>,
}

/// A single WooCommerce order as delivered by a webhook.
#[derive(Debug, Clone, Copy)]
pub struct OrderEvent<'a> {
    pub order_id: i64,
    /// Normalised billing email.
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    /// `None` for guest orders.
    pub wc_customer_id: Option<i64>,
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventOutcome {
    /// First delivery of this order id; the count was incremented.
    Counted { order_count: i32 },
    /// The order id was already in the ledger; the count is unchanged.
    Duplicate { order_count: i32 },
}

impl OrderEventOutcome {
    #[must_use]
    pub fn order_count(self) -> i32 {
        match self {
            Self::Counted { order_count } | Self::Duplicate { order_count } => order_count,
        }
    }
}

const COLUMNS: &str = "id, email, phone, first_name, last_name, address, city, \
                       wc_customer_id, source, order_count, last_order_date, updated_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Upserts a batch of aggregates keyed by email, overwriting existing rows,
/// and records their order ids in `synced_orders`. The batch commits or
/// rolls back as a unit.
///
/// Returns the number of client rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_cached_clients(
    pool: &PgPool,
    batch: &[CachedClientUpsert],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut written = 0_u64;

    for client in batch {
        let result = sqlx::query(
            "INSERT INTO cached_clients \
                 (email, phone, first_name, last_name, address, city, \
                  wc_customer_id, source, order_count, last_order_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (email) DO UPDATE SET \
                 phone           = EXCLUDED.phone, \
                 first_name      = EXCLUDED.first_name, \
                 last_name       = EXCLUDED.last_name, \
                 address         = EXCLUDED.address, \
                 city            = EXCLUDED.city, \
                 wc_customer_id  = EXCLUDED.wc_customer_id, \
                 source          = EXCLUDED.source, \
                 order_count     = EXCLUDED.order_count, \
                 last_order_date = EXCLUDED.last_order_date, \
                 updated_at      = NOW()",
        )
        .bind(&client.email)
        .bind(client.phone.as_deref())
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(client.address.as_deref())
        .bind(client.city.as_deref())
        .bind(client.wc_customer_id)
        .bind(client.source.as_str())
        .bind(client.order_count)
        .bind(client.last_order_date)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();

        if !client.order_ids.is_empty() {
            sqlx::query(
                "INSERT INTO synced_orders (order_id, email) \
                 SELECT order_id, $2 FROM UNNEST($1::BIGINT[]) AS t(order_id) \
                 ON CONFLICT (order_id) DO NOTHING",
            )
            .bind(&client.order_ids)
            .bind(&client.email)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(written)
}

/// Applies one webhook order to the cache.
///
/// Inside one transaction the order id is inserted into `synced_orders`; only
/// when that insert is new does the database increment `order_count`. A new
/// email starts at 1. Either way `last_order_date` keeps the later of the two
/// dates and blank contact fields are filled from the event.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed.
pub async fn apply_order_event(
    pool: &PgPool,
    event: &OrderEvent<'_>,
) -> Result<OrderEventOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let ledger = sqlx::query(
        "INSERT INTO synced_orders (order_id, email, date_created) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (order_id) DO NOTHING",
    )
    .bind(event.order_id)
    .bind(event.email)
    .bind(event.date_created)
    .execute(&mut *tx)
    .await?;
    let first_delivery = ledger.rows_affected() == 1;

    let source = if event.wc_customer_id.is_some() {
        ClientSource::Registered
    } else {
        ClientSource::Guest
    };

    let order_count: i32 = sqlx::query_scalar(
        "INSERT INTO cached_clients \
             (email, phone, first_name, last_name, address, city, \
              wc_customer_id, source, order_count, last_order_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9) \
         ON CONFLICT (email) DO UPDATE SET \
             order_count     = cached_clients.order_count + $10, \
             last_order_date = GREATEST(cached_clients.last_order_date, EXCLUDED.last_order_date), \
             phone           = COALESCE(NULLIF(cached_clients.phone, ''), EXCLUDED.phone), \
             first_name      = COALESCE(NULLIF(cached_clients.first_name, ''), EXCLUDED.first_name), \
             last_name       = COALESCE(NULLIF(cached_clients.last_name, ''), EXCLUDED.last_name), \
             address         = COALESCE(NULLIF(cached_clients.address, ''), EXCLUDED.address), \
             city            = COALESCE(NULLIF(cached_clients.city, ''), EXCLUDED.city), \
             wc_customer_id  = COALESCE(cached_clients.wc_customer_id, EXCLUDED.wc_customer_id), \
             source          = CASE WHEN EXCLUDED.source = 'registered' \
                                    THEN 'registered' ELSE cached_clients.source END, \
             updated_at      = NOW() \
         RETURNING order_count",
    )
    .bind(event.email)
    .bind(event.phone)
    .bind(event.first_name)
    .bind(event.last_name)
    .bind(event.address)
    .bind(event.city)
    .bind(event.wc_customer_id)
    .bind(source.as_str())
    .bind(event.date_created)
    .bind(i32::from(first_delivery))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(if first_delivery {
        OrderEventOutcome::Counted { order_count }
    } else {
        OrderEventOutcome::Duplicate { order_count }
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_client(pool: &PgPool, id: Uuid) -> Result<Option<CachedClientRow>, DbError> {
    let row = sqlx::query_as::<_, CachedClientRow>(&format!(
        "SELECT {COLUMNS} FROM cached_clients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Looks up a cached client by normalised email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_client_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<CachedClientRow>, DbError> {
    let row = sqlx::query_as::<_, CachedClientRow>(&format!(
        "SELECT {COLUMNS} FROM cached_clients WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every cached client, most recent order first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cached_clients(pool: &PgPool) -> Result<Vec<CachedClientRow>, DbError> {
    let rows = sqlx::query_as::<_, CachedClientRow>(&format!(
        "SELECT {COLUMNS} FROM cached_clients \
         ORDER BY last_order_date DESC NULLS LAST, email"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
