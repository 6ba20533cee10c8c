//! Client handlers.
//!
//! - `GET    /api/v1/clients`: merged directory
//! - `POST   /api/v1/clients`: create CRM client
//! - `GET    /api/v1/clients/{id}`: resolve by key, phone or email
//! - `PATCH  /api/v1/clients/{id}`: sparse update of a CRM client
//! - `DELETE /api/v1/clients/{id}`: delete a CRM client without orders
//! - `GET    /api/v1/clients/{id}/orders`: merged CRM + WooCommerce orders

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mealcrm_core::{normalize_email, ClientOrderItem, ClientSource, ClientView, Identifier};
use mealcrm_db::{DbError, ManualClientRow, ManualClientUpdate, NewManualClient};
use mealcrm_sync::{ClientFilter, ClientPage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    double_option, map_db_error, map_sync_error, ApiError, ApiResponse, AppState, ResponseMeta,
};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct ListClientsQuery {
    pub search: Option<String>,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateClientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

// Outer None keeps the column, Some(None) clears it.
#[allow(clippy::option_option)]
#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateClientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub postcode: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub(super) struct ManualClientItem {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ManualClientRow> for ManualClientItem {
    fn from(row: ManualClientRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            postcode: row.postcode,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_name(req_id: &str, field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be 1-{MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

fn validate_email(req_id: &str, value: &str) -> Result<String, ApiError> {
    let email = normalize_email(value);
    if email.len() < 3 || !email.contains('@') {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("'{value}' is not a valid email address"),
        ));
    }
    Ok(email)
}

/// Blank optional fields are stored as NULL.
fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// PATCH targets CRM clients only; anything that is not a key cannot match.
fn parse_client_key(req_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    match Identifier::parse(raw) {
        Identifier::ByKey(id) => Ok(id),
        Identifier::ByContact(_) => Err(client_not_found(req_id, raw)),
    }
}

fn client_not_found(req_id: &str, raw: &str) -> ApiError {
    ApiError::new(req_id, "not_found", format!("client '{raw}' not found"))
}

fn map_client_write_error(req_id: &str, raw: &str, e: &DbError) -> ApiError {
    match e {
        DbError::NotFound => client_not_found(req_id, raw),
        DbError::HasDependents { count, .. } => ApiError::new(
            req_id,
            "conflict",
            format!("client has {count} order(s); delete them first"),
        ),
        e if e.is_unique_violation() => {
            ApiError::new(req_id, "conflict", "a client with that email already exists")
        }
        e => map_db_error(req_id.to_owned(), e),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<ApiResponse<ClientPage>>, ApiError> {
    let source = query
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ClientSource::from_str)
        .transpose()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let filter = ClientFilter {
        search: query.search,
        source,
        page: query.page,
        per_page: query.per_page,
    };

    let page = mealcrm_sync::list_clients(&state.pool, &filter)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: page,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ManualClientItem>>), ApiError> {
    let rid = &req_id.0;

    let first_name = validate_name(rid, "first_name", &body.first_name)?;
    let last_name = validate_name(rid, "last_name", &body.last_name)?;
    let email = validate_email(rid, &body.email)?;

    let row = mealcrm_db::create_manual_client(
        &state.pool,
        &NewManualClient {
            first_name: &first_name,
            last_name: &last_name,
            email: &email,
            phone: blank_to_none(body.phone.as_deref()),
            address: blank_to_none(body.address.as_deref()),
            city: blank_to_none(body.city.as_deref()),
            postcode: blank_to_none(body.postcode.as_deref()),
        },
    )
    .await
    .map_err(|e| map_client_write_error(rid, &email, &e))?;

    tracing::info!(client_id = %row.id, "created CRM client");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ClientView>>, ApiError> {
    let identifier = Identifier::parse(&id);
    let view = mealcrm_sync::resolve_client(
        &state.woo,
        &state.pool,
        &identifier,
        state.settings.search_window,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?
    .ok_or_else(|| client_not_found(&req_id.0, &id))?;

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ManualClientItem>>, ApiError> {
    let rid = &req_id.0;
    let key = parse_client_key(rid, &id)?;

    let first_name = body
        .first_name
        .as_deref()
        .map(|v| validate_name(rid, "first_name", v))
        .transpose()?;
    let last_name = body
        .last_name
        .as_deref()
        .map(|v| validate_name(rid, "last_name", v))
        .transpose()?;
    let email = body
        .email
        .as_deref()
        .map(|v| validate_email(rid, v))
        .transpose()?;

    let update = ManualClientUpdate {
        first_name: first_name.as_deref(),
        last_name: last_name.as_deref(),
        email: email.as_deref(),
        phone: body.phone.as_ref().map(|v| blank_to_none(v.as_deref())),
        address: body.address.as_ref().map(|v| blank_to_none(v.as_deref())),
        city: body.city.as_ref().map(|v| blank_to_none(v.as_deref())),
        postcode: body.postcode.as_ref().map(|v| blank_to_none(v.as_deref())),
    };

    let row = mealcrm_db::update_manual_client(&state.pool, key, &update)
        .await
        .map_err(|e| map_client_write_error(rid, &id, &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_client(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let key = parse_client_key(rid, &id)?;

    mealcrm_db::delete_manual_client(&state.pool, key)
        .await
        .map_err(|e| map_client_write_error(rid, &id, &e))?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_client_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ClientOrderItem>>>, ApiError> {
    let identifier = Identifier::parse(&id);
    let items = mealcrm_sync::client_orders(
        &state.woo,
        &state.pool,
        &identifier,
        state.settings.search_window,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?
    .ok_or_else(|| client_not_found(&req_id.0, &id))?;

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let body: UpdateClientRequest =
            serde_json::from_str(r#"{"phone": null, "city": "Novi Sad"}"#).expect("parse");
        assert_eq!(body.phone, Some(None));
        assert_eq!(body.city, Some(Some("Novi Sad".to_owned())));
        assert_eq!(body.address, None);
        assert_eq!(body.first_name, None);
    }

    #[test]
    fn validate_email_normalises_and_requires_at() {
        assert_eq!(
            validate_email("r", "  Ana@Example.COM ").expect("valid"),
            "ana@example.com"
        );
        assert!(validate_email("r", "ana.example.com").is_err());
    }

    #[test]
    fn validate_name_trims_and_rejects_blank() {
        assert_eq!(validate_name("r", "first_name", "  Ana ").expect("valid"), "Ana");
        assert!(validate_name("r", "first_name", "   ").is_err());
    }

    #[test]
    fn blank_optional_fields_become_none() {
        assert_eq!(blank_to_none(Some("  ")), None);
        assert_eq!(blank_to_none(Some(" 21000 ")), Some("21000"));
        assert_eq!(blank_to_none(None), None);
    }

    #[test]
    fn dependents_error_becomes_conflict_with_count() {
        let err = map_client_write_error(
            "r",
            "x",
            &DbError::HasDependents {
                entity: "client",
                count: 3,
            },
        );
        assert_eq!(err.error.code, "conflict");
        assert_eq!(err.error.message, "client has 3 order(s); delete them first");
    }

    #[test]
    fn contact_strings_are_not_crm_keys() {
        assert!(parse_client_key("r", "0643073023").is_err());
        assert!(parse_client_key("r", "6f1c2a9e-3b7d-4c1e-9a2f-0d8e5b4c3a21").is_ok());
    }
}
