//! Database operations for the `manual_orders` table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `manual_orders` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ManualOrderRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub product_name: String,
    pub start_date: NaiveDate,
    /// The schema enforces `duration_days > 0`.
    pub duration_days: i32,
    pub address: String,
    pub payment_method: String,
    pub status: String,
    pub customer_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewManualOrder<'a> {
    pub client_id: Uuid,
    pub product_name: &'a str,
    pub start_date: NaiveDate,
    pub duration_days: i32,
    pub address: &'a str,
    pub payment_method: &'a str,
    /// `None` uses the column default (`pending`).
    pub status: Option<&'a str>,
    pub customer_note: Option<&'a str>,
}

/// Filters for [`list_manual_orders`]. `limit` is applied as given; callers
/// clamp it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualOrderFilters<'a> {
    pub client_id: Option<Uuid>,
    pub status: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

const COLUMNS: &str = "id, client_id, product_name, start_date, duration_days, address, \
                       payment_method, status, customer_note, created_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a manual order for an existing CRM client.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if `client_id` does not reference a CRM
/// client, or [`DbError::Sqlx`] if the insert fails.
pub async fn create_manual_order(
    pool: &PgPool,
    order: &NewManualOrder<'_>,
) -> Result<ManualOrderRow, DbError> {
    let result = sqlx::query_as::<_, ManualOrderRow>(&format!(
        "INSERT INTO manual_orders \
             (id, client_id, product_name, start_date, duration_days, address, \
              payment_method, status, customer_note) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'pending'), $9) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(order.client_id)
    .bind(order.product_name)
    .bind(order.start_date)
    .bind(order.duration_days)
    .bind(order.address)
    .bind(order.payment_method)
    .bind(order.status)
    .bind(order.customer_note)
    .fetch_one(pool)
    .await
    .map_err(DbError::from);

    match result {
        Err(e) if e.is_foreign_key_violation() => Err(DbError::NotFound),
        other => other,
    }
}

/// Returns a manual order by id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_manual_order(pool: &PgPool, id: Uuid) -> Result<Option<ManualOrderRow>, DbError> {
    let row = sqlx::query_as::<_, ManualOrderRow>(&format!(
        "SELECT {COLUMNS} FROM manual_orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists manual orders, newest start date first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_manual_orders(
    pool: &PgPool,
    filters: &ManualOrderFilters<'_>,
) -> Result<Vec<ManualOrderRow>, DbError> {
    let rows = sqlx::query_as::<_, ManualOrderRow>(&format!(
        "SELECT {COLUMNS} FROM manual_orders \
         WHERE ($1::UUID IS NULL OR client_id = $1) \
           AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY start_date DESC, created_at DESC \
         LIMIT $3 OFFSET $4"
    ))
    .bind(filters.client_id)
    .bind(filters.status)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All manual orders of one CRM client, newest start date first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_manual_orders_for_client(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<Vec<ManualOrderRow>, DbError> {
    let rows = sqlx::query_as::<_, ManualOrderRow>(&format!(
        "SELECT {COLUMNS} FROM manual_orders \
         WHERE client_id = $1 \
         ORDER BY start_date DESC, created_at DESC"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sets the status of a manual order and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no order has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_manual_order_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
) -> Result<ManualOrderRow, DbError> {
    sqlx::query_as::<_, ManualOrderRow>(&format!(
        "UPDATE manual_orders SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Deletes a manual order.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no order has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_manual_order(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM manual_orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
