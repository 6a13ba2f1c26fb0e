use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::ensure_group_exists;
use crate::{
    auth::{authorize, hash_password, Action, AuthUser, GroupScope, Resource},
    db::DbPool,
    entities::{user, user_group, Role},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub group_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    /// Replaces the whole membership set when present
    pub group_ids: Option<Vec<i32>>,
}

/// A user account with its store memberships
#[derive(Debug, Clone)]
pub struct Account {
    pub user: user::Model,
    pub group_ids: Vec<i32>,
}

/// Service for back-office accounts (admin only)
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, actor))]
    pub async fn list(&self, actor: &AuthUser) -> Result<Vec<Account>, ServiceError> {
        authorize(actor, Action::Read, Resource::Users, GroupScope::Global)?;

        let db = &*self.db_pool;
        let users = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        let memberships = user_group::Entity::find().all(db).await?;

        Ok(users
            .into_iter()
            .map(|u| {
                let group_ids = memberships
                    .iter()
                    .filter(|m| m.user_id == u.id)
                    .map(|m| m.group_id)
                    .collect();
                Account { user: u, group_ids }
            })
            .collect())
    }

    #[instrument(skip(self, actor))]
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<Account, ServiceError> {
        authorize(actor, Action::Read, Resource::Users, GroupScope::Global)?;
        let found = self.find(id).await?;
        let group_ids = memberships_of(&*self.db_pool, id).await?;
        Ok(Account {
            user: found,
            group_ids,
        })
    }

    /// Creates an account. Callable without a principal from the operator
    /// CLI through [`UserService::create_unchecked`].
    #[instrument(skip(self, actor, input), fields(username = %input.username))]
    pub async fn create(&self, actor: &AuthUser, input: NewUser) -> Result<Account, ServiceError> {
        authorize(actor, Action::Create, Resource::Users, GroupScope::Global)?;
        self.create_unchecked(input).await
    }

    /// Creates an account without an authorization check.
    pub async fn create_unchecked(&self, input: NewUser) -> Result<Account, ServiceError> {
        input.validate()?;
        let username = input.username.trim().to_string();

        let db = &*self.db_pool;
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .count(db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::InternalError(format!("hashing task failed: {}", e)))??;

        let txn = db.begin().await?;
        let now = chrono::Utc::now();
        let created = user::ActiveModel {
            username: Set(username),
            password_hash: Set(password_hash),
            role: Set(input.role),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let group_ids = replace_memberships(&txn, created.id, &input.group_ids).await?;
        txn.commit().await?;

        info!(user_id = created.id, role = %created.role, "user created");
        Ok(Account {
            user: created,
            group_ids,
        })
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: UserPatch,
    ) -> Result<Account, ServiceError> {
        patch.validate()?;
        authorize(actor, Action::Update, Resource::Users, GroupScope::Global)?;

        let existing = self.find(id).await?;
        let password_hash = match patch.password {
            Some(password) => Some(
                tokio::task::spawn_blocking(move || hash_password(&password))
                    .await
                    .map_err(|e| {
                        ServiceError::InternalError(format!("hashing task failed: {}", e))
                    })??,
            ),
            None => None,
        };

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let mut active = existing.into_active_model();
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        if let Some(flag) = patch.active {
            active.active = Set(flag);
        }
        let updated = active.update(&txn).await?;

        let group_ids = match patch.group_ids {
            Some(ids) => replace_memberships(&txn, id, &ids).await?,
            None => memberships_of(&txn, id).await?,
        };
        txn.commit().await?;

        Ok(Account {
            user: updated,
            group_ids,
        })
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        authorize(actor, Action::Delete, Resource::Users, GroupScope::Global)?;
        if actor.user_id == id {
            return Err(ServiceError::Conflict(
                "you cannot delete your own account".to_string(),
            ));
        }
        self.find(id).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }
}

async fn memberships_of<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Vec<i32>, ServiceError> {
    Ok(user_group::Entity::find()
        .filter(user_group::Column::UserId.eq(user_id))
        .order_by_asc(user_group::Column::GroupId)
        .all(conn)
        .await?
        .into_iter()
        .map(|m| m.group_id)
        .collect())
}

async fn replace_memberships<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    group_ids: &[i32],
) -> Result<Vec<i32>, ServiceError> {
    let wanted: BTreeSet<i32> = group_ids.iter().copied().collect();
    for group_id in &wanted {
        ensure_group_exists(conn, *group_id).await?;
    }

    user_group::Entity::delete_many()
        .filter(user_group::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    for group_id in &wanted {
        user_group::ActiveModel {
            user_id: Set(user_id),
            group_id: Set(*group_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(wanted.into_iter().collect())
}
