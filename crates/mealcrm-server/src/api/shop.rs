//! Read-only pass-through to WooCommerce orders.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use mealcrm_woo::{OrderQuery, WcOrder, MAX_PER_PAGE};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_woo_error, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Deserialize)]
pub(super) struct ShopOrdersQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ShopOrderPage {
    orders: Vec<WcOrder>,
    page: u32,
    per_page: u32,
    total_pages: Option<u32>,
    total: Option<u64>,
}

fn order_query(query: ShopOrdersQuery) -> OrderQuery {
    let mut order_query = OrderQuery::page(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE).min(MAX_PER_PAGE),
    );
    if let Some(status) = query.status.filter(|s| !s.trim().is_empty()) {
        order_query = order_query.with_status(status);
    }
    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        order_query = order_query.with_search(search);
    }
    order_query
}

pub(super) async fn list_shop_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ShopOrdersQuery>,
) -> Result<Json<ApiResponse<ShopOrderPage>>, ApiError> {
    let order_query = order_query(query);
    let page = state
        .woo
        .list_orders(&order_query)
        .await
        .map_err(|e| map_woo_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ShopOrderPage {
            orders: page.orders,
            page: order_query.page,
            per_page: order_query.per_page,
            total_pages: page.meta.total_pages,
            total: page.meta.total,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_shop_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WcOrder>>, ApiError> {
    let order = state
        .woo
        .get_order(id)
        .await
        .map_err(|e| map_woo_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: order,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_query_defaults_and_clamps() {
        let query = order_query(ShopOrdersQuery {
            page: None,
            per_page: Some(500),
            status: Some(String::new()),
            search: None,
        });
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PER_PAGE);
        assert_eq!(query.status, None);
    }

    #[test]
    fn order_query_keeps_filters() {
        let query = order_query(ShopOrdersQuery {
            page: Some(3),
            per_page: None,
            status: Some("processing".to_owned()),
            search: Some("ana@example.com".to_owned()),
        });
        assert_eq!(query.page, 3);
        assert_eq!(query.per_page, DEFAULT_PER_PAGE);
        assert_eq!(query.status.as_deref(), Some("processing"));
        assert_eq!(query.search.as_deref(), Some("ana@example.com"));
    }
}
