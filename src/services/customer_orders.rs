use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::ensure_group_exists;
use crate::{
    auth::{authorize, policy::visible_groups, Action, AuthUser, GroupScope, Resource},
    common::{double_option, non_blank, Page, PaginationParams},
    db::DbPool,
    entities::{customer_order, CustomerOrderStatus},
    errors::ServiceError,
};

/// A special order taken for a customer at the counter
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerOrder {
    pub group_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[validate(length(max = 40))]
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub product_description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub deposit: Option<Decimal>,
    #[serde(alias = "comments")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderPatch {
    #[validate(length(min = 1, max = 200))]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub customer_phone: Option<Option<String>>,
    #[validate(length(min = 1, max = 2000))]
    pub product_description: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub status: Option<CustomerOrderStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub deposit: Option<Option<Decimal>>,
    #[serde(default, alias = "comments", deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub comment: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CustomerOrderFilter {
    pub group_id: Option<i32>,
    pub status: Option<CustomerOrderStatus>,
}

#[derive(Clone)]
pub struct CustomerOrderService {
    db_pool: Arc<DbPool>,
}

impl CustomerOrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: &CustomerOrderFilter,
        pagination: PaginationParams,
    ) -> Result<Page<customer_order::Model>, ServiceError> {
        let scope = filter
            .group_id
            .map_or(GroupScope::Global, GroupScope::Group);
        authorize(actor, Action::Read, Resource::CustomerOrders, scope)?;

        let mut condition = Condition::all();
        if let Some(group_id) = filter.group_id {
            condition = condition.add(customer_order::Column::GroupId.eq(group_id));
        } else if let Some(groups) = visible_groups(actor) {
            condition = condition.add(customer_order::Column::GroupId.is_in(groups));
        }
        if let Some(status) = filter.status {
            condition = condition.add(customer_order::Column::Status.eq(status));
        }

        let page = pagination.page();
        let limit = pagination.limit();
        let paginator = customer_order::Entity::find()
            .filter(condition)
            .order_by_desc(customer_order::Column::CreatedAt)
            .order_by_desc(customer_order::Column::Id)
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
    pub async fn get(
        &self,
        actor: &AuthUser,
        id: i32,
    ) -> Result<customer_order::Model, ServiceError> {
        let found = self.find(id).await?;
        authorize(
            actor,
            Action::Read,
            Resource::CustomerOrders,
            GroupScope::Group(found.group_id),
        )?;
        Ok(found)
    }

    #[instrument(skip(self, actor, input), fields(group_id = input.group_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewCustomerOrder,
    ) -> Result<customer_order::Model, ServiceError> {
        input.validate()?;
        authorize(
            actor,
            Action::Create,
            Resource::CustomerOrders,
            GroupScope::Group(input.group_id),
        )?;
        if input.deposit.is_some_and(|d| d.is_sign_negative()) {
            return Err(ServiceError::ValidationError(
                "deposit: must not be negative".into(),
            ));
        }

        let db = &*self.db_pool;
        ensure_group_exists(db, input.group_id).await?;

        let now = chrono::Utc::now();
        let created = customer_order::ActiveModel {
            group_id: Set(input.group_id),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_phone: Set(non_blank(input.customer_phone)),
            product_description: Set(input.product_description),
            quantity: Set(input.quantity),
            status: Set(CustomerOrderStatus::Waiting),
            deposit: Set(input.deposit),
            comment: Set(non_blank(input.comment)),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(customer_order_id = created.id, "customer order taken");
        Ok(created)
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: CustomerOrderPatch,
    ) -> Result<customer_order::Model, ServiceError> {
        patch.validate()?;
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::CustomerOrders,
            GroupScope::Group(existing.group_id),
        )?;

        let mut active = existing.into_active_model();
        if let Some(name) = patch.customer_name {
            active.customer_name = Set(name.trim().to_string());
        }
        if let Some(phone) = patch.customer_phone {
            active.customer_phone = Set(non_blank(phone));
        }
        if let Some(description) = patch.product_description {
            active.product_description = Set(description);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(deposit) = patch.deposit {
            active.deposit = Set(deposit);
        }
        if let Some(comment) = patch.comment {
            active.comment = Set(non_blank(comment));
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::CustomerOrders,
            GroupScope::Group(existing.group_id),
        )?;
        customer_order::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<customer_order::Model, ServiceError> {
        customer_order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("customer order", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn special_order_needs_a_positive_quantity() {
        let input: NewCustomerOrder = serde_json::from_value(json!({
            "groupId": 1,
            "customerName": "Mme Leroy",
            "productDescription": "Tondeuse 46cm",
            "quantity": 0,
            "deposit": "20.00",
        }))
        .unwrap();
        assert_eq!(input.deposit, Some(dec!(20.00)));
        assert!(input.validate().is_err());
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: CustomerOrderPatch = serde_json::from_value(json!({
            "customerPhone": null,
            "status": "collected",
        }))
        .unwrap();
        assert_eq!(patch.customer_phone, Some(None));
        assert_eq!(patch.deposit, None);
        assert_eq!(patch.status, Some(CustomerOrderStatus::Collected));
    }
}
