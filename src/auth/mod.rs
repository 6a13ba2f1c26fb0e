/*!
 * # Authentication Module
 *
 * Cookie-session authentication for the store back office:
 *
 * - Username/password login checked against Argon2 hashes
 * - The session stores the principal (role and store groups)
 * - `auth_middleware` reloads it from the database on every request and turns
 *   it into an [`AuthUser`] extension; deactivated or deleted accounts lose
 *   their session
 * - Route guards built on the shared [`policy`] module
 */

pub mod permissions;
pub mod policy;
pub mod rbac;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    Extension,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{user, user_group, Role},
    errors::ServiceError,
};

pub use permissions::{Action, Resource};
pub use policy::{authorize, GroupScope};

/// Session key holding the serialized [`AuthUser`]
pub const SESSION_USER_KEY: &str = "storeops.user";

/// The authenticated principal attached to every request behind `with_auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    /// Store groups the user belongs to
    pub group_ids: Vec<i32>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_member_of(&self, group_id: i32) -> bool {
        self.is_admin() || self.group_ids.contains(&group_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("authentication required".to_string()))
    }
}

/// Credentials posted to the login endpoint
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginCredentials {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Hashes a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
}

/// Checks a password against a stored PHC hash string.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Credential checks and principal loading
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Verifies `credentials` and returns the principal to store in the session.
    ///
    /// Unknown users, inactive users and wrong passwords all yield the same
    /// `Unauthorized` error.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthUser, ServiceError> {
        let rejected = || ServiceError::Unauthorized("invalid username or password".to_string());

        let account = user::Entity::find()
            .filter(user::Column::Username.eq(credentials.username.trim()))
            .one(&*self.db)
            .await?
            .filter(|account| account.active)
            .ok_or_else(rejected)?;

        let password = credentials.password.clone();
        let password_hash = account.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| ServiceError::InternalError(format!("password check failed: {}", e)))?;

        if !verified {
            warn!("login rejected");
            return Err(rejected());
        }

        let principal = self.principal_for(&account).await?;
        info!(user_id = principal.user_id, role = %principal.role, "login accepted");
        Ok(principal)
    }

    /// Current principal for a session holder, or `None` when the account has
    /// since been deleted or deactivated.
    pub async fn refresh(&self, session_user: &AuthUser) -> Result<Option<AuthUser>, ServiceError> {
        match user::Entity::find_by_id(session_user.user_id)
            .one(&*self.db)
            .await?
        {
            Some(account) if account.active => Ok(Some(self.principal_for(&account).await?)),
            _ => Ok(None),
        }
    }

    /// Builds the principal for `account`, including its group memberships.
    pub async fn principal_for(&self, account: &user::Model) -> Result<AuthUser, ServiceError> {
        let group_ids = user_group::Entity::find()
            .filter(user_group::Column::UserId.eq(account.id))
            .order_by_asc(user_group::Column::GroupId)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|membership| membership.group_id)
            .collect();

        Ok(AuthUser {
            user_id: account.id,
            username: account.username.clone(),
            role: account.role,
            group_ids,
        })
    }
}

pub(crate) fn session_error(err: tower_sessions::session::Error) -> ServiceError {
    ServiceError::InternalError(format!("session store error: {}", err))
}

/// Resolves the session principal against the database and inserts it into
/// request extensions. Role and membership changes apply from the next request.
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthService>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let stored = session
        .get::<AuthUser>(SESSION_USER_KEY)
        .await
        .map_err(session_error)?
        .ok_or_else(|| ServiceError::Unauthorized("authentication required".to_string()))?;

    let Some(current) = auth.refresh(&stored).await? else {
        warn!(user_id = stored.user_id, "session of a disabled account rejected");
        session.flush().await.map_err(session_error)?;
        return Err(ServiceError::Unauthorized(
            "account is no longer active".to_string(),
        ));
    };

    if current != stored {
        session
            .insert(SESSION_USER_KEY, &current)
            .await
            .map_err(session_error)?;
    }

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Route-level permission requirement, checked with [`GroupScope::Global`].
#[derive(Debug, Clone, Copy)]
pub struct PermissionRequirement {
    pub resource: Resource,
    pub action: Action,
}

/// Permission middleware to check that the session principal holds a grant
pub async fn permission_middleware(
    State(required): State<PermissionRequirement>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("authentication required".to_string()))?;

    authorize(user, required.action, required.resource, GroupScope::Global)?;

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, resource: Resource, action: Action) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.route_layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, resource: Resource, action: Action) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(
            PermissionRequirement { resource, action },
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn membership_checks() {
        let employee = AuthUser {
            user_id: 1,
            username: "claire".into(),
            role: Role::Employee,
            group_ids: vec![2],
        };
        assert!(employee.is_member_of(2));
        assert!(!employee.is_member_of(3));

        let admin = AuthUser {
            role: Role::Admin,
            group_ids: vec![],
            ..employee
        };
        assert!(admin.is_member_of(3));
    }
}
