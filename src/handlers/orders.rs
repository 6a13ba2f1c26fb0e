use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    common::{ApiResult, MessageResponse, PaginatedResponse, ValidatedJson},
    deliveries::DeliveryResponse,
};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    common::PaginationParams,
    entities::{
        order::{self, OrderStatus},
        DeliveryUnit,
    },
    services::orders::{NewOrder, OrderFilter, OrderPatch},
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i32,
    pub supplier_id: i32,
    pub group_id: i32,
    pub planned_date: NaiveDate,
    pub quantity: Option<i32>,
    pub unit: Option<DeliveryUnit>,
    /// Derived from the linked deliveries
    pub status: OrderStatus,
    pub comment: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            supplier_id: model.supplier_id,
            group_id: model.group_id,
            planned_date: model.planned_date,
            quantity: model.quantity,
            unit: model.unit,
            status: model.status,
            comment: model.comment,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub group_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub status: Option<OrderStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders listed", body = PaginatedResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let filter = OrderFilter {
        group_id: query.group_id,
        supplier_id: query.supplier_id,
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let pagination = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let page = state.services.orders.list(&user, &filter, pagination).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order fetched", body = OrderResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<OrderResponse> {
    let found = state.services.orders.get(&user, id).await?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/deliveries",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deliveries linked to the order", body = [DeliveryResponse]),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_order_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Vec<DeliveryResponse>> {
    let linked = state.services.orders.deliveries(&user, id).await?;
    Ok(Json(linked.into_iter().map(DeliveryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = NewOrder,
    responses(
        (status = 200, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewOrder>,
) -> ApiResult<OrderResponse> {
    let created = state.services.orders.create(&user, payload).await?;
    Ok(Json(created.into()))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = OrderPatch,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid request or derived status requested", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(patch): ValidatedJson<OrderPatch>,
) -> ApiResult<OrderResponse> {
    let updated = state.services.orders.update(&user, id, patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted, its deliveries unlinked", body = MessageResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    let unlinked = state.services.orders.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Order {} deleted, {} deliveries unlinked",
        id, unlinked
    ))))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/:id/deliveries", get(list_order_deliveries))
        .with_auth()
}
