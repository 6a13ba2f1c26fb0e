use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::ensure_group_exists;
use crate::{
    auth::{authorize, policy::visible_groups, Action, AuthUser, GroupScope, Resource},
    common::{double_option, non_blank, Page, PaginationParams},
    db::DbPool,
    entities::publicity,
    errors::ServiceError,
};

/// A campaign runs at least one day: `end` may not precede `start`.
fn check_window(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        let mut err = ValidationError::new("end_before_start");
        err.message = Some("endDate must not be before startDate".into());
        return Err(err);
    }
    Ok(())
}

fn validate_window(input: &NewPublicity) -> Result<(), ValidationError> {
    check_window(input.start_date, input.end_date)
}

/// A promotional campaign for one store group
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_window", skip_on_field_errors = false))]
pub struct NewPublicity {
    pub group_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicityPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PublicityFilter {
    pub group_id: Option<i32>,
    /// Campaigns still running on or after this date
    pub from: Option<NaiveDate>,
    /// Campaigns starting on or before this date
    pub to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct PublicityService {
    db_pool: Arc<DbPool>,
}

impl PublicityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Campaigns overlapping the requested window, soonest first.
    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: &PublicityFilter,
        pagination: PaginationParams,
    ) -> Result<Page<publicity::Model>, ServiceError> {
        let scope = filter
            .group_id
            .map_or(GroupScope::Global, GroupScope::Group);
        authorize(actor, Action::Read, Resource::Publicities, scope)?;

        let mut condition = Condition::all();
        if let Some(group_id) = filter.group_id {
            condition = condition.add(publicity::Column::GroupId.eq(group_id));
        } else if let Some(groups) = visible_groups(actor) {
            condition = condition.add(publicity::Column::GroupId.is_in(groups));
        }
        if let Some(from) = filter.from {
            condition = condition.add(publicity::Column::EndDate.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(publicity::Column::StartDate.lte(to));
        }

        let page = pagination.page();
        let limit = pagination.limit();
        let paginator = publicity::Entity::find()
            .filter(condition)
            .order_by_asc(publicity::Column::StartDate)
            .order_by_asc(publicity::Column::Id)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    #[instrument(skip(self, actor))]
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<publicity::Model, ServiceError> {
        let found = self.find(id).await?;
        authorize(
            actor,
            Action::Read,
            Resource::Publicities,
            GroupScope::Group(found.group_id),
        )?;
        Ok(found)
    }

    #[instrument(skip(self, actor, input), fields(group_id = input.group_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewPublicity,
    ) -> Result<publicity::Model, ServiceError> {
        input.validate()?;
        authorize(
            actor,
            Action::Create,
            Resource::Publicities,
            GroupScope::Group(input.group_id),
        )?;

        let db = &*self.db_pool;
        ensure_group_exists(db, input.group_id).await?;

        let now = chrono::Utc::now();
        let created = publicity::ActiveModel {
            group_id: Set(input.group_id),
            title: Set(input.title.trim().to_string()),
            description: Set(non_blank(input.description)),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(publicity_id = created.id, "publicity scheduled");
        Ok(created)
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: PublicityPatch,
    ) -> Result<publicity::Model, ServiceError> {
        patch.validate()?;
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::Publicities,
            GroupScope::Group(existing.group_id),
        )?;

        check_window(
            patch.start_date.unwrap_or(existing.start_date),
            patch.end_date.unwrap_or(existing.end_date),
        )
        .map_err(|e| ServiceError::ValidationError(format!("endDate: {}", e)))?;

        let mut active = existing.into_active_model();
        if let Some(title) = patch.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = patch.description {
            active.description = Set(non_blank(description));
        }
        if let Some(start_date) = patch.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(end_date) = patch.end_date {
            active.end_date = Set(end_date);
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::Publicities,
            GroupScope::Group(existing.group_id),
        )?;
        publicity::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<publicity::Model, ServiceError> {
        publicity::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("publicity", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(start: &str, end: &str) -> NewPublicity {
        NewPublicity {
            group_id: 1,
            title: "Spring sale".into(),
            description: None,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
        }
    }

    #[test]
    fn single_day_campaign_is_valid() {
        assert!(campaign("2025-04-01", "2025-04-01").validate().is_ok());
    }

    #[test]
    fn campaign_cannot_end_before_it_starts() {
        let errors = campaign("2025-04-10", "2025-04-01").validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));

        let patched = check_window("2025-04-10".parse().unwrap(), "2025-04-01".parse().unwrap())
            .unwrap_err();
        assert_eq!(patched.code, "end_before_start");
        assert!(check_window("2025-04-01".parse().unwrap(), "2025-04-10".parse().unwrap()).is_ok());
    }
}
