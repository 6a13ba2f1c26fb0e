use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiResult, MessageResponse, PaginatedResponse, ValidatedJson};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    common::PaginationParams,
    entities::{
        delivery::{self, DeliveryStatus, DeliveryUnit},
        OrderStatus,
    },
    errors::ServiceError,
    services::deliveries::{DeliveryFilter, DeliveryNote, DeliveryPatch, NewDelivery},
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 12,
    "orderId": 4,
    "supplierId": 2,
    "groupId": 1,
    "plannedDate": "2025-03-10",
    "deliveredDate": null,
    "quantity": 5,
    "unit": "palettes",
    "status": "planned",
    "comment": "dock 2",
    "blNumber": null,
    "blAmount": null,
    "invoiceReference": null,
    "invoiceAmount": null,
    "reconciled": false,
    "validatedAt": null,
    "createdBy": 3,
    "createdAt": "2025-03-01T09:00:00Z",
    "updatedAt": "2025-03-01T09:00:00Z"
}))]
pub struct DeliveryResponse {
    pub id: i32,
    pub order_id: Option<i32>,
    pub supplier_id: i32,
    pub group_id: i32,
    pub planned_date: NaiveDate,
    pub delivered_date: Option<NaiveDate>,
    pub quantity: i32,
    pub unit: DeliveryUnit,
    pub status: DeliveryStatus,
    pub comment: Option<String>,
    pub bl_number: Option<String>,
    #[schema(value_type = Option<String>)]
    pub bl_amount: Option<Decimal>,
    pub invoice_reference: Option<String>,
    #[schema(value_type = Option<String>)]
    pub invoice_amount: Option<Decimal>,
    pub reconciled: bool,
    pub validated_at: Option<DateTime<Utc>>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<delivery::Model> for DeliveryResponse {
    fn from(model: delivery::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            supplier_id: model.supplier_id,
            group_id: model.group_id,
            planned_date: model.planned_date,
            delivered_date: model.delivered_date,
            quantity: model.quantity,
            unit: model.unit,
            status: model.status,
            comment: model.comment,
            bl_number: model.bl_number,
            bl_amount: model.bl_amount,
            invoice_reference: model.invoice_reference,
            invoice_amount: model.invoice_amount,
            reconciled: model.reconciled,
            validated_at: model.validated_at,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub message: String,
    pub delivery: DeliveryResponse,
    /// Status of the linked order after validation
    pub order_status: Option<OrderStatus>,
}

/// Query string of the delivery list
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeliveryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub group_id: Option<i32>,
    pub order_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub status: Option<DeliveryStatus>,
    pub reconciled: Option<bool>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DeliveryListQuery {
    fn split(self) -> (DeliveryFilter, PaginationParams) {
        (
            DeliveryFilter {
                group_id: self.group_id,
                order_id: self.order_id,
                supplier_id: self.supplier_id,
                status: self.status,
                reconciled: self.reconciled,
                from: self.from,
                to: self.to,
            },
            PaginationParams {
                page: self.page,
                limit: self.limit,
            },
        )
    }
}

#[utoipa::path(
    get,
    path = "/api/deliveries",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries listed", body = PaginatedResponse<DeliveryResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeliveryListQuery>,
) -> ApiResult<PaginatedResponse<DeliveryResponse>> {
    let (filter, pagination) = query.split();
    let page = state
        .services
        .deliveries
        .list(&user, &filter, pagination)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    params(("id" = i32, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery fetched", body = DeliveryResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<DeliveryResponse> {
    let found = state.services.deliveries.get(&user, id).await?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    post,
    path = "/api/deliveries",
    request_body = NewDelivery,
    responses(
        (status = 200, description = "Delivery recorded", body = DeliveryResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewDelivery>,
) -> ApiResult<DeliveryResponse> {
    let created = state.services.deliveries.create(&user, payload).await?;
    Ok(Json(created.into()))
}

#[utoipa::path(
    put,
    path = "/api/deliveries/{id}",
    params(("id" = i32, Path, description = "Delivery ID")),
    request_body = DeliveryPatch,
    responses(
        (status = 200, description = "Delivery updated", body = DeliveryResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(patch): ValidatedJson<DeliveryPatch>,
) -> ApiResult<DeliveryResponse> {
    let updated = state.services.deliveries.update(&user, id, patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}",
    params(("id" = i32, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn delete_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.deliveries.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!("Delivery {} deleted", id))))
}

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/validate",
    params(("id" = i32, Path, description = "Delivery ID")),
    request_body = DeliveryNote,
    responses(
        (status = 200, description = "Delivery validated", body = ValidationResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery already validated", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn validate_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    body: Bytes,
) -> ApiResult<ValidationResponse> {
    // The delivery note is optional, an empty body validates without one.
    let note: DeliveryNote = if body.is_empty() {
        DeliveryNote::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ServiceError::ValidationError(e.to_string()))?
    };
    let validated = state.services.deliveries.validate(&user, id, note).await?;
    Ok(Json(ValidationResponse {
        message: "Delivery validated".to_string(),
        order_status: validated.order.map(|o| o.status),
        delivery: validated.delivery.into(),
    }))
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route(
            "/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        )
        .route("/:id/validate", post(validate_delivery))
        .with_auth()
}
