use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{ApiResult, MessageResponse, ValidatedJson};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::group,
    services::groups::GroupInput,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<group::Model> for GroupResponse {
    fn from(model: group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Store groups visible to the caller", body = [GroupResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<GroupResponse>> {
    let groups = state.services.groups.list(&user).await?;
    Ok(Json(groups.into_iter().map(GroupResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group fetched", body = GroupResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<GroupResponse> {
    Ok(Json(state.services.groups.get(&user, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = GroupInput,
    responses(
        (status = 200, description = "Group created", body = GroupResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<GroupInput>,
) -> ApiResult<GroupResponse> {
    Ok(Json(state.services.groups.create(&user, payload).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = GroupInput,
    responses(
        (status = 200, description = "Group renamed", body = GroupResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn update_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<GroupInput>,
) -> ApiResult<GroupResponse> {
    Ok(Json(
        state.services.groups.rename(&user, id, payload).await?.into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group deleted", body = MessageResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 409, description = "Group still owns records", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn delete_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.groups.delete(&user, id).await?;
    Ok(Json(MessageResponse::new(format!("Group {} deleted", id))))
}

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route(
            "/:id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .with_auth()
}
