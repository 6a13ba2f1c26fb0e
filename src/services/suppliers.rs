use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{authorize, Action, AuthUser, GroupScope, Resource},
    common::{double_option, non_blank, Page, PaginationParams},
    db::DbPool,
    entities::{delivery, order, supplier},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    pub active: Option<bool>,
}

/// Service for the supplier directory shared by every store
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        include_inactive: bool,
        pagination: PaginationParams,
    ) -> Result<Page<supplier::Model>, ServiceError> {
        authorize(actor, Action::Read, Resource::Suppliers, GroupScope::Global)?;

        let mut query = supplier::Entity::find().order_by_asc(supplier::Column::Name);
        if !include_inactive {
            query = query.filter(supplier::Column::Active.eq(true));
        }

        let page = pagination.page();
        let limit = pagination.limit();
        let paginator = query.paginate(&*self.db_pool, limit);
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
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<supplier::Model, ServiceError> {
        authorize(actor, Action::Read, Resource::Suppliers, GroupScope::Global)?;
        self.find(id).await
    }

    #[instrument(skip(self, actor, input))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        authorize(actor, Action::Create, Resource::Suppliers, GroupScope::Global)?;

        let name = input.name.trim().to_string();
        self.ensure_name_free(&name, None).await?;

        let now = chrono::Utc::now();
        let created = supplier::ActiveModel {
            name: Set(name),
            contact_name: Set(non_blank(input.contact_name)),
            phone: Set(non_blank(input.phone)),
            email: Set(non_blank(input.email)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(supplier_id = created.id, "supplier created");
        Ok(created)
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: SupplierPatch,
    ) -> Result<supplier::Model, ServiceError> {
        patch.validate()?;
        authorize(actor, Action::Update, Resource::Suppliers, GroupScope::Global)?;

        let existing = self.find(id).await?;
        let mut active = existing.into_active_model();
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            self.ensure_name_free(&name, Some(id)).await?;
            active.name = Set(name);
        }
        if let Some(contact_name) = patch.contact_name {
            active.contact_name = Set(non_blank(contact_name));
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(non_blank(phone));
        }
        if let Some(email) = patch.email {
            active.email = Set(non_blank(email));
        }
        if let Some(flag) = patch.active {
            active.active = Set(flag);
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a supplier nothing refers to. Referenced suppliers should be
    /// deactivated instead.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        authorize(actor, Action::Delete, Resource::Suppliers, GroupScope::Global)?;
        self.find(id).await?;

        let db = &*self.db_pool;
        let orders = order::Entity::find()
            .filter(order::Column::SupplierId.eq(id))
            .count(db)
            .await?;
        let deliveries = delivery::Entity::find()
            .filter(delivery::Column::SupplierId.eq(id))
            .count(db)
            .await?;
        if orders + deliveries > 0 {
            return Err(ServiceError::Conflict(format!(
                "supplier {} is referenced by {} orders and {} deliveries",
                id, orders, deliveries
            )));
        }

        supplier::Entity::delete_by_id(id).exec(db).await?;
        info!(supplier_id = id, "supplier deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("supplier", id))
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = supplier::Entity::find().filter(supplier::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(supplier::Column::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "a supplier named '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}
