use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiResult, MessageResponse, PaginatedResponse, ValidatedJson};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    common::PaginationParams,
    entities::{customer_order, CustomerOrderStatus},
    services::customer_orders::{CustomerOrderFilter, CustomerOrderPatch, NewCustomerOrder},
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderResponse {
    pub id: i32,
    pub group_id: i32,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub product_description: String,
    pub quantity: i32,
    pub status: CustomerOrderStatus,
    pub deposit: Option<Decimal>,
    pub comment: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<customer_order::Model> for CustomerOrderResponse {
    fn from(model: customer_order::Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            product_description: model.product_description,
            quantity: model.quantity,
            status: model.status,
            deposit: model.deposit,
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
pub struct CustomerOrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub group_id: Option<i32>,
    pub status: Option<CustomerOrderStatus>,
}

#[utoipa::path(
    get,
    path = "/api/customer-orders",
    params(CustomerOrderListQuery),
    responses(
        (status = 200, description = "Special orders listed", body = PaginatedResponse<CustomerOrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "customer-orders"
)]
pub async fn list_customer_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CustomerOrderListQuery>,
) -> ApiResult<PaginatedResponse<CustomerOrderResponse>> {
    let filter = CustomerOrderFilter {
        group_id: query.group_id,
        status: query.status,
    };
    let pagination = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let page = state
        .services
        .customer_orders
        .list(&user, &filter, pagination)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/customer-orders/{id}",
    params(("id" = i32, Path, description = "Customer order ID")),
    responses(
        (status = 200, description = "Special order fetched", body = CustomerOrderResponse),
        (status = 404, description = "Special order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customer-orders"
)]
pub async fn get_customer_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<CustomerOrderResponse> {
    Ok(Json(
        state.services.customer_orders.get(&user, id).await?.into(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/customer-orders",
    request_body = NewCustomerOrder,
    responses(
        (status = 200, description = "Special order taken", body = CustomerOrderResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "customer-orders"
)]
pub async fn create_customer_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewCustomerOrder>,
) -> ApiResult<CustomerOrderResponse> {
    Ok(Json(
        state
            .services
            .customer_orders
            .create(&user, payload)
            .await?
            .into(),
    ))
}

#[utoipa::path(
    put,
    path = "/api/customer-orders/{id}",
    params(("id" = i32, Path, description = "Customer order ID")),
    request_body = CustomerOrderPatch,
    responses(
        (status = 200, description = "Special order updated", body = CustomerOrderResponse),
        (status = 404, description = "Special order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customer-orders"
)]
pub async fn update_customer_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(patch): ValidatedJson<CustomerOrderPatch>,
) -> ApiResult<CustomerOrderResponse> {
    Ok(Json(
        state
            .services
            .customer_orders
            .update(&user, id, patch)
            .await?
            .into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/customer-orders/{id}",
    params(("id" = i32, Path, description = "Customer order ID")),
    responses(
        (status = 200, description = "Special order deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "customer-orders"
)]
pub async fn delete_customer_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.customer_orders.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Customer order {} deleted",
        id
    ))))
}

pub fn customer_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customer_orders).post(create_customer_order))
        .route(
            "/:id",
            get(get_customer_order)
                .put(update_customer_order)
                .delete(delete_customer_order),
        )
        .with_auth()
}
