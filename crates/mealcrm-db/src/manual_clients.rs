//! Database operations for the `manual_clients` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `manual_clients` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ManualClientRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored normalised (trimmed, lowercase).
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewManualClient<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub postcode: Option<&'a str>,
}

/// Sparse update. For nullable columns the outer `None` keeps the current
/// value, `Some(None)` clears it and `Some(Some(v))` sets it.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClientUpdate<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<Option<&'a str>>,
    pub address: Option<Option<&'a str>>,
    pub city: Option<Option<&'a str>>,
    pub postcode: Option<Option<&'a str>>,
}

const COLUMNS: &str =
    "id, first_name, last_name, email, phone, address, city, postcode, created_at, updated_at";

/// Inserts a new CRM client with a freshly generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate email surfaces
/// as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_manual_client(
    pool: &PgPool,
    client: &NewManualClient<'_>,
) -> Result<ManualClientRow, DbError> {
    let row = sqlx::query_as::<_, ManualClientRow>(&format!(
        "INSERT INTO manual_clients \
             (id, first_name, last_name, email, phone, address, city, postcode) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(client.first_name)
    .bind(client.last_name)
    .bind(client.email)
    .bind(client.phone)
    .bind(client.address)
    .bind(client.city)
    .bind(client.postcode)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a CRM client by primary key, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_manual_client(pool: &PgPool, id: Uuid) -> Result<Option<ManualClientRow>, DbError> {
    let row = sqlx::query_as::<_, ManualClientRow>(&format!(
        "SELECT {COLUMNS} FROM manual_clients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all CRM clients, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_manual_clients(pool: &PgPool) -> Result<Vec<ManualClientRow>, DbError> {
    let rows = sqlx::query_as::<_, ManualClientRow>(&format!(
        "SELECT {COLUMNS} FROM manual_clients ORDER BY created_at DESC, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Applies a sparse update and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no client has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_manual_client(
    pool: &PgPool,
    id: Uuid,
    update: &ManualClientUpdate<'_>,
) -> Result<ManualClientRow, DbError> {
    let row = sqlx::query_as::<_, ManualClientRow>(&format!(
        "UPDATE manual_clients \
         SET first_name = COALESCE($2, first_name), \
             last_name  = COALESCE($3, last_name), \
             email      = COALESCE($4, email), \
             phone      = CASE WHEN $5::BOOL THEN $6  ELSE phone END, \
             address    = CASE WHEN $7::BOOL THEN $8  ELSE address END, \
             city       = CASE WHEN $9::BOOL THEN $10 ELSE city END, \
             postcode   = CASE WHEN $11::BOOL THEN $12 ELSE postcode END, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(update.first_name)
    .bind(update.last_name)
    .bind(update.email)
    .bind(update.phone.is_some())
    .bind(update.phone.flatten())
    .bind(update.address.is_some())
    .bind(update.address.flatten())
    .bind(update.city.is_some())
    .bind(update.city.flatten())
    .bind(update.postcode.is_some())
    .bind(update.postcode.flatten())
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a CRM client that owns no manual orders.
///
/// The client row is locked `FOR UPDATE` and its orders counted inside the
/// same transaction as the delete, so an order inserted concurrently either
/// lands before the count or fails its foreign key afterwards.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no client has this id.
/// - [`DbError::HasDependents`] if the client still has orders; nothing is deleted.
/// - [`DbError::Sqlx`] for any other failure.
pub async fn delete_manual_client(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM manual_clients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(DbError::NotFound);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manual_orders WHERE client_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if count > 0 {
        tx.rollback().await?;
        return Err(DbError::HasDependents {
            entity: "client",
            count,
        });
    }

    let deleted = sqlx::query("DELETE FROM manual_clients WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from);
    if let Err(e) = deleted {
        if e.is_foreign_key_violation() {
            return Err(DbError::HasDependents {
                entity: "client",
                count: 1,
            });
        }
        return Err(e);
    }

    tx.commit().await?;
    tracing::info!(client_id = %id, "deleted manual client");
    Ok(())
}
