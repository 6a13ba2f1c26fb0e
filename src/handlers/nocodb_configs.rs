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
    auth::{Action, AuthRouterExt, AuthUser, Resource},
    entities::nocodb_config,
    services::nocodb_configs::NocoDbSettings,
    AppState,
};

/// Stored NocoDB settings; the token itself is write-only.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NocoDbConfigResponse {
    pub group_id: i32,
    pub base_url: String,
    pub project_id: String,
    pub table_id: String,
    pub invoice_column: String,
    pub has_token: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<nocodb_config::Model> for NocoDbConfigResponse {
    fn from(model: nocodb_config::Model) -> Self {
        Self {
            group_id: model.group_id,
            base_url: model.base_url,
            project_id: model.project_id,
            table_id: model.table_id,
            invoice_column: model.invoice_column,
            has_token: !model.api_token.is_empty(),
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/groups/{id}/nocodb-config",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Configuration fetched", body = NocoDbConfigResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 404, description = "No configuration for this group", body = crate::errors::ErrorResponse)
    ),
    tag = "nocodb"
)]
pub async fn get_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<i32>,
) -> ApiResult<NocoDbConfigResponse> {
    Ok(Json(
        state.services.nocodb_configs.get(&user, group_id).await?.into(),
    ))
}

#[utoipa::path(
    put,
    path = "/api/groups/{id}/nocodb-config",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = NocoDbSettings,
    responses(
        (status = 200, description = "Configuration saved", body = NocoDbConfigResponse),
        (status = 400, description = "Invalid settings", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse)
    ),
    tag = "nocodb"
)]
pub async fn put_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<i32>,
    ValidatedJson(settings): ValidatedJson<NocoDbSettings>,
) -> ApiResult<NocoDbConfigResponse> {
    Ok(Json(
        state
            .services
            .nocodb_configs
            .upsert(&user, group_id, settings)
            .await?
            .into(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}/nocodb-config",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Configuration removed", body = MessageResponse),
        (status = 404, description = "No configuration for this group", body = crate::errors::ErrorResponse)
    ),
    tag = "nocodb"
)]
pub async fn delete_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<i32>,
) -> ApiResult<MessageResponse> {
    state.services.nocodb_configs.delete(&user, group_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "NocoDB configuration of group {} removed",
        group_id
    ))))
}

/// Mounted under `/groups` next to the group routes.
pub fn nocodb_config_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/nocodb-config",
            get(get_config).put(put_config).delete(delete_config),
        )
        .with_permission(Resource::NocodbConfigs, Action::Read)
}
