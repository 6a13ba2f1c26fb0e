use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{ensure_group_exists, ensure_supplier_exists, linkage};
use crate::{
    auth::{authorize, policy::visible_groups, Action, AuthUser, GroupScope, Resource},
    common::{double_option, non_blank, Page, PaginationParams},
    db::DbPool,
    entities::{
        delivery::{self, DeliveryUnit},
        order::{self, OrderStatus},
    },
    errors::ServiceError,
};

/// Input for placing a supplier order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub supplier_id: i32,
    pub group_id: i32,
    #[serde(alias = "scheduledDate")]
    pub planned_date: NaiveDate,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub unit: Option<DeliveryUnit>,
    #[serde(alias = "comments")]
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Partial update of an order
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub supplier_id: Option<i32>,
    #[serde(alias = "scheduledDate")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DeliveryUnit>)]
    pub unit: Option<Option<DeliveryUnit>>,
    #[serde(default, alias = "comments", deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub comment: Option<Option<String>>,
    /// Only `pending` is accepted, and only while no delivery is linked
    pub status: Option<OrderStatus>,
}

impl OrderPatch {
    fn apply_to(self, active: &mut order::ActiveModel) {
        if let Some(supplier_id) = self.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        if let Some(planned_date) = self.planned_date {
            active.planned_date = Set(planned_date);
        }
        if let Some(quantity) = self.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(unit) = self.unit {
            active.unit = Set(unit);
        }
        if let Some(comment) = self.comment {
            active.comment = Set(non_blank(comment));
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub group_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub status: Option<OrderStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Service for supplier orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Places an order; it starts `pending` until a delivery is linked.
    #[instrument(skip(self, actor, input), fields(user_id = actor.user_id, group_id = input.group_id))]
    pub async fn create(&self, actor: &AuthUser, input: NewOrder) -> Result<order::Model, ServiceError> {
        input.validate()?;
        authorize(
            actor,
            Action::Create,
            Resource::Orders,
            GroupScope::Group(input.group_id),
        )?;

        let db = &*self.db_pool;
        ensure_group_exists(db, input.group_id).await?;
        ensure_supplier_exists(db, input.supplier_id).await?;

        let now = Utc::now();
        let created = order::ActiveModel {
            supplier_id: Set(input.supplier_id),
            group_id: Set(input.group_id),
            planned_date: Set(input.planned_date),
            quantity: Set(input.quantity),
            unit: Set(input.unit),
            status: Set(OrderStatus::Pending),
            comment: Set(non_blank(input.comment)),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(order_id = created.id, "order created");
        Ok(created)
    }

    #[instrument(skip(self, actor))]
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<order::Model, ServiceError> {
        let found = self.find(id).await?;
        authorize(
            actor,
            Action::Read,
            Resource::Orders,
            GroupScope::Group(found.group_id),
        )?;
        Ok(found)
    }

    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: &OrderFilter,
        pagination: PaginationParams,
    ) -> Result<Page<order::Model>, ServiceError> {
        let scope = filter
            .group_id
            .map_or(GroupScope::Global, GroupScope::Group);
        authorize(actor, Action::Read, Resource::Orders, scope)?;

        let mut condition = Condition::all();
        if let Some(group_id) = filter.group_id {
            condition = condition.add(order::Column::GroupId.eq(group_id));
        } else if let Some(groups) = visible_groups(actor) {
            condition = condition.add(order::Column::GroupId.is_in(groups));
        }
        if let Some(supplier_id) = filter.supplier_id {
            condition = condition.add(order::Column::SupplierId.eq(supplier_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(order::Column::Status.eq(status));
        }
        if let Some(from) = filter.from {
            condition = condition.add(order::Column::PlannedDate.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(order::Column::PlannedDate.lte(to));
        }

        let page = pagination.page();
        let limit = pagination.limit();
        let paginator = order::Entity::find()
            .filter(condition)
            .order_by_desc(order::Column::PlannedDate)
            .order_by_desc(order::Column::Id)
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

    /// Deliveries currently linked to an order.
    #[instrument(skip(self, actor))]
    pub async fn deliveries(
        &self,
        actor: &AuthUser,
        id: i32,
    ) -> Result<Vec<delivery::Model>, ServiceError> {
        let found = self.get(actor, id).await?;
        let linked = delivery::Entity::find()
            .filter(delivery::Column::OrderId.eq(found.id))
            .order_by_asc(delivery::Column::PlannedDate)
            .order_by_asc(delivery::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(linked)
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: OrderPatch,
    ) -> Result<order::Model, ServiceError> {
        patch.validate()?;
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::Orders,
            GroupScope::Group(existing.group_id),
        )?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        if let Some(requested) = patch.status {
            let linked = delivery::Entity::find()
                .filter(delivery::Column::OrderId.eq(id))
                .count(&txn)
                .await?;
            linkage::check_requested_status(requested, linked)?;
        }
        if let Some(supplier_id) = patch.supplier_id {
            ensure_supplier_exists(&txn, supplier_id).await?;
        }

        let mut active = existing.into_active_model();
        patch.apply_to(&mut active);
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes an order. Its deliveries are kept and become unlinked.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<u64, ServiceError> {
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::Orders,
            GroupScope::Group(existing.group_id),
        )?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let unlinked = delivery::Entity::update_many()
            .set(delivery::ActiveModel {
                order_id: Set(None),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(delivery::Column::OrderId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        order::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(order_id = id, unlinked, "order deleted");
        Ok(unlinked)
    }

    async fn find(&self, id: i32) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_optional_on_patch() {
        let patch: OrderPatch =
            serde_json::from_value(serde_json::json!({ "comments": null })).unwrap();
        assert_eq!(patch.status, None);
        assert_eq!(patch.comment, Some(None));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let parsed = serde_json::from_value::<OrderPatch>(serde_json::json!({ "status": "shipped" }));
        assert!(parsed.is_err());
    }
}
