use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;
use tracing::info;

use super::common::{ApiResult, MessageResponse, ValidatedJson};
use crate::{
    auth::{session_error, AuthRouterExt, AuthUser, LoginCredentials, SESSION_USER_KEY},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = AuthUser),
        (status = 400, description = "Malformed credentials", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid username or password", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(credentials): ValidatedJson<LoginCredentials>,
) -> ApiResult<AuthUser> {
    let principal = state.auth.authenticate(&credentials).await?;

    // New id on privilege change so a pre-login cookie cannot be reused.
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_USER_KEY, &principal)
        .await
        .map_err(session_error)?;

    Ok(Json(principal))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session destroyed", body = MessageResponse),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(session: Session, user: AuthUser) -> ApiResult<MessageResponse> {
    session.flush().await.map_err(session_error)?;
    info!(user_id = user.user_id, "logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = AuthUser),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(user: AuthUser) -> ApiResult<AuthUser> {
    Ok(Json(user))
}

pub fn auth_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_auth();

    Router::new().route("/login", post(login)).merge(protected)
}
