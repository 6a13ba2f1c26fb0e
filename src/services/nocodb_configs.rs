use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::ensure_group_exists;
use crate::{
    auth::{authorize, Action, AuthUser, GroupScope, Resource},
    db::DbPool,
    entities::nocodb_config,
    errors::ServiceError,
};

/// NocoDB connection settings for one store group.
///
/// On update the token may be omitted to keep the stored one.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NocoDbSettings {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub api_token: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub project_id: String,
    #[validate(length(min = 1, max = 100))]
    pub table_id: String,
    #[validate(length(min = 1, max = 100))]
    pub invoice_column: String,
}

#[derive(Clone)]
pub struct NocoDbConfigService {
    db_pool: Arc<DbPool>,
}

impl NocoDbConfigService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, actor))]
    pub async fn get(
        &self,
        actor: &AuthUser,
        group_id: i32,
    ) -> Result<nocodb_config::Model, ServiceError> {
        authorize(
            actor,
            Action::Read,
            Resource::NocodbConfigs,
            GroupScope::Group(group_id),
        )?;
        self.find(group_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("NocoDB configuration for group", group_id))
    }

    /// Creates or replaces the configuration of `group_id`.
    #[instrument(skip(self, actor, settings))]
    pub async fn upsert(
        &self,
        actor: &AuthUser,
        group_id: i32,
        settings: NocoDbSettings,
    ) -> Result<nocodb_config::Model, ServiceError> {
        settings.validate()?;
        authorize(
            actor,
            Action::Update,
            Resource::NocodbConfigs,
            GroupScope::Group(group_id),
        )?;

        let db = &*self.db_pool;
        ensure_group_exists(db, group_id).await?;

        let saved = match self.find(group_id).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.base_url = Set(settings.base_url);
                if let Some(token) = settings.api_token {
                    active.api_token = Set(token);
                }
                active.project_id = Set(settings.project_id);
                active.table_id = Set(settings.table_id);
                active.invoice_column = Set(settings.invoice_column);
                active.update(db).await?
            }
            None => {
                let token = settings.api_token.ok_or_else(|| {
                    ServiceError::ValidationError("apiToken: required for a new configuration".into())
                })?;
                let now = chrono::Utc::now();
                nocodb_config::ActiveModel {
                    group_id: Set(group_id),
                    base_url: Set(settings.base_url),
                    api_token: Set(token),
                    project_id: Set(settings.project_id),
                    table_id: Set(settings.table_id),
                    invoice_column: Set(settings.invoice_column),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        info!(group_id, "NocoDB configuration saved");
        Ok(saved)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, group_id: i32) -> Result<(), ServiceError> {
        authorize(
            actor,
            Action::Delete,
            Resource::NocodbConfigs,
            GroupScope::Group(group_id),
        )?;
        let result = nocodb_config::Entity::delete_many()
            .filter(nocodb_config::Column::GroupId.eq(group_id))
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(
                "NocoDB configuration for group",
                group_id,
            ));
        }
        info!(group_id, "NocoDB configuration removed");
        Ok(())
    }

    async fn find(&self, group_id: i32) -> Result<Option<nocodb_config::Model>, ServiceError> {
        Ok(nocodb_config::Entity::find()
            .filter(nocodb_config::Column::GroupId.eq(group_id))
            .one(&*self.db_pool)
            .await?)
    }
}
