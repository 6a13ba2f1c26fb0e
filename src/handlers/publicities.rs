use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiResult, MessageResponse, PaginatedResponse, ValidatedJson};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    common::PaginationParams,
    entities::publicity,
    services::publicities::{NewPublicity, PublicityFilter, PublicityPatch},
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicityResponse {
    pub id: i32,
    pub group_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<publicity::Model> for PublicityResponse {
    fn from(model: publicity::Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            title: model.title,
            description: model.description,
            start_date: model.start_date,
            end_date: model.end_date,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PublicityListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub group_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/publicities",
    params(PublicityListQuery),
    responses(
        (status = 200, description = "Campaigns overlapping the window", body = PaginatedResponse<PublicityResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "publicities"
)]
pub async fn list_publicities(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PublicityListQuery>,
) -> ApiResult<PaginatedResponse<PublicityResponse>> {
    let filter = PublicityFilter {
        group_id: query.group_id,
        from: query.from,
        to: query.to,
    };
    let pagination = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let page = state
        .services
        .publicities
        .list(&user, &filter, pagination)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/publicities/{id}",
    params(("id" = i32, Path, description = "Publicity ID")),
    responses(
        (status = 200, description = "Campaign fetched", body = PublicityResponse),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse)
    ),
    tag = "publicities"
)]
pub async fn get_publicity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<PublicityResponse> {
    Ok(Json(state.services.publicities.get(&user, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/publicities",
    request_body = NewPublicity,
    responses(
        (status = 200, description = "Campaign scheduled", body = PublicityResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "publicities"
)]
pub async fn create_publicity(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<NewPublicity>,
) -> ApiResult<PublicityResponse> {
    Ok(Json(
        state.services.publicities.create(&user, payload).await?.into(),
    ))
}

#[utoipa::path(
    put,
    path = "/api/publicities/{id}",
    params(("id" = i32, Path, description = "Publicity ID")),
    request_body = PublicityPatch,
    responses(
        (status = 200, description = "Campaign updated", body = PublicityResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse)
    ),
    tag = "publicities"
)]
pub async fn update_publicity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(patch): ValidatedJson<PublicityPatch>,
) -> ApiResult<PublicityResponse> {
    Ok(Json(
        state.services.publicities.update(&user, id, patch).await?.into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/publicities/{id}",
    params(("id" = i32, Path, description = "Publicity ID")),
    responses(
        (status = 200, description = "Campaign deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "publicities"
)]
pub async fn delete_publicity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.publicities.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!("Publicity {} deleted", id))))
}

pub fn publicity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_publicities).post(create_publicity))
        .route(
            "/:id",
            get(get_publicity)
                .put(update_publicity)
                .delete(delete_publicity),
        )
        .with_auth()
}
