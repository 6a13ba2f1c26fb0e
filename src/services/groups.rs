use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{authorize, policy::visible_groups, Action, AuthUser, GroupScope, Resource},
    db::DbPool,
    entities::{customer_order, delivery, group, nocodb_config, order, publicity, user_group},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Service for store groups
#[derive(Clone)]
pub struct GroupService {
    db_pool: Arc<DbPool>,
}

impl GroupService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Groups the caller may see, by name.
    #[instrument(skip(self, actor))]
    pub async fn list(&self, actor: &AuthUser) -> Result<Vec<group::Model>, ServiceError> {
        authorize(actor, Action::Read, Resource::Groups, GroupScope::Global)?;

        let mut query = group::Entity::find().order_by_asc(group::Column::Name);
        if let Some(ids) = visible_groups(actor) {
            query = query.filter(group::Column::Id.is_in(ids));
        }
        Ok(query.all(&*self.db_pool).await?)
    }

    #[instrument(skip(self, actor))]
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<group::Model, ServiceError> {
        authorize(actor, Action::Read, Resource::Groups, GroupScope::Group(id))?;
        self.find(id).await
    }

    #[instrument(skip(self, actor))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: GroupInput,
    ) -> Result<group::Model, ServiceError> {
        input.validate()?;
        authorize(actor, Action::Create, Resource::Groups, GroupScope::Global)?;

        let name = input.name.trim().to_string();
        self.ensure_name_free(&name, None).await?;

        let created = group::ActiveModel {
            name: Set(name),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(group_id = created.id, "store group created");
        Ok(created)
    }

    #[instrument(skip(self, actor))]
    pub async fn rename(
        &self,
        actor: &AuthUser,
        id: i32,
        input: GroupInput,
    ) -> Result<group::Model, ServiceError> {
        input.validate()?;
        authorize(actor, Action::Update, Resource::Groups, GroupScope::Global)?;

        let existing = self.find(id).await?;
        let name = input.name.trim().to_string();
        self.ensure_name_free(&name, Some(id)).await?;

        let mut active = existing.into_active_model();
        active.name = Set(name);
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a group that no business row belongs to. Memberships and the
    /// NocoDB configuration go with it.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        authorize(actor, Action::Delete, Resource::Groups, GroupScope::Global)?;
        self.find(id).await?;

        let txn = self.db_pool.begin().await?;
        let db = &txn;
        let referenced = order::Entity::find()
            .filter(order::Column::GroupId.eq(id))
            .count(db)
            .await?
            + delivery::Entity::find()
                .filter(delivery::Column::GroupId.eq(id))
                .count(db)
                .await?
            + publicity::Entity::find()
                .filter(publicity::Column::GroupId.eq(id))
                .count(db)
                .await?
            + customer_order::Entity::find()
                .filter(customer_order::Column::GroupId.eq(id))
                .count(db)
                .await?;
        if referenced > 0 {
            txn.rollback().await?;
            return Err(ServiceError::Conflict(format!(
                "group {} still owns {} records",
                id, referenced
            )));
        }

        user_group::Entity::delete_many()
            .filter(user_group::Column::GroupId.eq(id))
            .exec(db)
            .await?;
        nocodb_config::Entity::delete_many()
            .filter(nocodb_config::Column::GroupId.eq(id))
            .exec(db)
            .await?;
        group::Entity::delete_by_id(id).exec(db).await?;
        txn.commit().await?;

        info!(group_id = id, "store group deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<group::Model, ServiceError> {
        group::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("group", id))
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = group::Entity::find().filter(group::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(group::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "a group named '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}
