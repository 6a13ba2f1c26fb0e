use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiResult, MessageResponse, PaginatedResponse, ValidatedJson};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    common::PaginationParams,
    entities::supplier,
    services::suppliers::{NewSupplier, SupplierPatch},
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierResponse {
    pub id: i32,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            contact_name: model.contact_name,
            phone: model.phone,
            email: model.email,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SupplierListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Include deactivated suppliers
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    params(SupplierListQuery),
    responses(
        (status = 200, description = "Suppliers listed", body = PaginatedResponse<SupplierResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SupplierListQuery>,
) -> ApiResult<PaginatedResponse<SupplierResponse>> {
    let pagination = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let page = state
        .services
        .suppliers
        .list(&user, query.include_inactive, pagination)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier fetched", body = SupplierResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<SupplierResponse> {
    Ok(Json(state.services.suppliers.get(&user, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = NewSupplier,
    responses(
        (status = 200, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewSupplier>,
) -> ApiResult<SupplierResponse> {
    Ok(Json(state.services.suppliers.create(&user, payload).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    request_body = SupplierPatch,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(patch): ValidatedJson<SupplierPatch>,
) -> ApiResult<SupplierResponse> {
    Ok(Json(
        state.services.suppliers.update(&user, id, patch).await?.into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Supplier still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.suppliers.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!("Supplier {} deleted", id))))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .with_auth()
}
