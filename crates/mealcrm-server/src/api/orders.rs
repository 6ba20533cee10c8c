//! Manual (CRM-entered) order handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use mealcrm_db::{DbError, ManualOrderFilters, ManualOrderRow, NewManualOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const ORDER_STATUSES: &[&str] = &["pending", "active", "paused", "completed", "cancelled"];

#[derive(Debug, Deserialize)]
pub(super) struct ListOrdersQuery {
    pub client_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOrderRequest {
    pub client_id: Uuid,
    pub product_name: String,
    pub start_date: NaiveDate,
    pub duration_days: i32,
    pub address: String,
    pub payment_method: String,
    pub status: Option<String>,
    pub customer_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ManualOrderItem {
    id: Uuid,
    client_id: Uuid,
    product_name: String,
    start_date: NaiveDate,
    duration_days: i32,
    address: String,
    payment_method: String,
    status: String,
    customer_note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ManualOrderRow> for ManualOrderItem {
    fn from(row: ManualOrderRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            product_name: row.product_name,
            start_date: row.start_date,
            duration_days: row.duration_days,
            address: row.address,
            payment_method: row.payment_method,
            status: row.status,
            customer_note: row.customer_note,
            created_at: row.created_at,
        }
    }
}

fn validate_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    if ORDER_STATUSES.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "status must be one of {}, got '{value}'",
                ORDER_STATUSES.join(", ")
            ),
        ))
    }
}

fn required_text<'a>(req_id: &str, field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must not be empty"),
        ));
    }
    Ok(trimmed)
}

fn order_not_found(req_id: &str, id: Uuid) -> ApiError {
    ApiError::new(req_id, "not_found", format!("order '{id}' not found"))
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<ManualOrderItem>>>, ApiError> {
    let filters = ManualOrderFilters {
        client_id: query.client_id,
        status: query.status.as_deref().filter(|s| !s.is_empty()),
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let rows = mealcrm_db::list_manual_orders(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ManualOrderItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ManualOrderItem>>), ApiError> {
    let rid = &req_id.0;

    let product_name = required_text(rid, "product_name", &body.product_name)?;
    let address = required_text(rid, "address", &body.address)?;
    let payment_method = required_text(rid, "payment_method", &body.payment_method)?;
    if body.duration_days <= 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "duration_days must be positive",
        ));
    }
    if let Some(ref status) = body.status {
        validate_status(rid, status)?;
    }

    let row = mealcrm_db::create_manual_order(
        &state.pool,
        &NewManualOrder {
            client_id: body.client_id,
            product_name,
            start_date: body.start_date,
            duration_days: body.duration_days,
            address,
            payment_method,
            status: body.status.as_deref(),
            customer_note: body
                .customer_note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty()),
        },
    )
    .await
    .map_err(|e| match e {
        DbError::NotFound => ApiError::new(
            rid,
            "validation_error",
            format!("client '{}' does not exist", body.client_id),
        ),
        e => map_db_error(rid.clone(), &e),
    })?;

    tracing::info!(order_id = %row.id, client_id = %row.client_id, "created manual order");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ManualOrderItem>>, ApiError> {
    let row = mealcrm_db::get_manual_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| order_not_found(&req_id.0, id))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_order_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<ManualOrderItem>>, ApiError> {
    let rid = &req_id.0;
    validate_status(rid, &body.status)?;

    let row = mealcrm_db::update_manual_order_status(&state.pool, id, &body.status)
        .await
        .map_err(|e| match e {
            DbError::NotFound => order_not_found(rid, id),
            e => map_db_error(rid.clone(), &e),
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    mealcrm_db::delete_manual_order(&state.pool, id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => order_not_found(rid, id),
            e => map_db_error(rid.clone(), &e),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
