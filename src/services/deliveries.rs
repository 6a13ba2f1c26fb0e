use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{ensure_group_exists, ensure_supplier_exists, linkage, linkage::LinkEvent};
use crate::{
    auth::{authorize, policy::visible_groups, Action, AuthUser, GroupScope, Resource},
    common::{double_option, non_blank, Page, PaginationParams},
    db::DbPool,
    entities::{
        delivery::{self, DeliveryStatus, DeliveryUnit},
        order,
    },
    errors::ServiceError,
};

/// Input for recording a new delivery
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDelivery {
    /// Order this delivery fulfils, if any
    pub order_id: Option<i32>,
    pub supplier_id: i32,
    pub group_id: i32,
    #[serde(alias = "scheduledDate")]
    pub planned_date: NaiveDate,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    pub unit: DeliveryUnit,
    #[serde(alias = "comments")]
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[validate(length(max = 100))]
    pub bl_number: Option<String>,
    pub bl_amount: Option<Decimal>,
}

/// Partial update of a delivery. Absent fields are left untouched, `null`
/// clears a nullable field. The status only moves through validation.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPatch {
    /// `null` unlinks the delivery from its order
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub order_id: Option<Option<i32>>,
    pub supplier_id: Option<i32>,
    #[serde(alias = "scheduledDate")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub delivered_date: Option<Option<NaiveDate>>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub unit: Option<DeliveryUnit>,
    #[serde(default, alias = "comments", deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bl_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bl_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub invoice_reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub invoice_amount: Option<Option<Decimal>>,
    pub reconciled: Option<bool>,
}

impl DeliveryPatch {
    /// Writes the provided fields onto `active`, leaving the others unchanged.
    pub fn apply_to(self, active: &mut delivery::ActiveModel) {
        if let Some(order_id) = self.order_id {
            active.order_id = Set(order_id);
        }
        if let Some(supplier_id) = self.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        if let Some(planned_date) = self.planned_date {
            active.planned_date = Set(planned_date);
        }
        if let Some(delivered_date) = self.delivered_date {
            active.delivered_date = Set(delivered_date);
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
        if let Some(bl_number) = self.bl_number {
            active.bl_number = Set(non_blank(bl_number));
        }
        if let Some(bl_amount) = self.bl_amount {
            active.bl_amount = Set(bl_amount);
        }
        if let Some(invoice_reference) = self.invoice_reference {
            active.invoice_reference = Set(non_blank(invoice_reference));
        }
        if let Some(invoice_amount) = self.invoice_amount {
            active.invoice_amount = Set(invoice_amount);
        }
        if let Some(reconciled) = self.reconciled {
            active.reconciled = Set(reconciled);
        }
    }
}

/// Delivery-note data captured when a delivery is validated
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNote {
    #[validate(length(max = 100))]
    pub bl_number: Option<String>,
    pub bl_amount: Option<Decimal>,
}

/// Filters accepted by the delivery list
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeliveryFilter {
    pub group_id: Option<i32>,
    pub order_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub status: Option<DeliveryStatus>,
    pub reconciled: Option<bool>,
    /// Planned on or after this date
    pub from: Option<NaiveDate>,
    /// Planned on or before this date
    pub to: Option<NaiveDate>,
}

/// Outcome of a validation: the delivery and, when linked, its order
#[derive(Debug, Clone)]
pub struct Validated {
    pub delivery: delivery::Model,
    pub order: Option<order::Model>,
}

/// Service for recording deliveries and keeping their orders in step
#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Arc<DbPool>,
}

impl DeliveryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a planned delivery, promoting its order to `planned`.
    #[instrument(skip(self, actor, input), fields(user_id = actor.user_id, group_id = input.group_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewDelivery,
    ) -> Result<delivery::Model, ServiceError> {
        input.validate()?;
        authorize(
            actor,
            Action::Create,
            Resource::Deliveries,
            GroupScope::Group(input.group_id),
        )?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        ensure_group_exists(&txn, input.group_id).await?;
        ensure_supplier_exists(&txn, input.supplier_id).await?;
        if let Some(order_id) = input.order_id {
            ensure_linkable_order(&txn, order_id, input.group_id).await?;
        }

        let now = Utc::now();
        let created = delivery::ActiveModel {
            order_id: Set(input.order_id),
            supplier_id: Set(input.supplier_id),
            group_id: Set(input.group_id),
            planned_date: Set(input.planned_date),
            delivered_date: Set(None),
            quantity: Set(input.quantity),
            unit: Set(input.unit),
            status: Set(DeliveryStatus::Planned),
            comment: Set(non_blank(input.comment)),
            bl_number: Set(non_blank(input.bl_number)),
            bl_amount: Set(input.bl_amount),
            invoice_reference: Set(None),
            invoice_amount: Set(None),
            reconciled: Set(false),
            validated_at: Set(None),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(order_id) = created.order_id {
            linkage::apply(&txn, order_id, LinkEvent::Linked).await?;
        }

        txn.commit().await?;

        info!(delivery_id = created.id, order_id = ?created.order_id, "delivery recorded");
        Ok(created)
    }

    /// Fetches one delivery the caller is allowed to see.
    #[instrument(skip(self, actor))]
    pub async fn get(&self, actor: &AuthUser, id: i32) -> Result<delivery::Model, ServiceError> {
        let found = self.find(id).await?;
        authorize(
            actor,
            Action::Read,
            Resource::Deliveries,
            GroupScope::Group(found.group_id),
        )?;
        Ok(found)
    }

    /// Lists deliveries within the caller's stores, latest planned first.
    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: &DeliveryFilter,
        pagination: PaginationParams,
    ) -> Result<Page<delivery::Model>, ServiceError> {
        let scope = filter
            .group_id
            .map_or(GroupScope::Global, GroupScope::Group);
        authorize(actor, Action::Read, Resource::Deliveries, scope)?;

        let mut condition = Condition::all();
        if let Some(group_id) = filter.group_id {
            condition = condition.add(delivery::Column::GroupId.eq(group_id));
        } else if let Some(groups) = visible_groups(actor) {
            condition = condition.add(delivery::Column::GroupId.is_in(groups));
        }
        if let Some(order_id) = filter.order_id {
            condition = condition.add(delivery::Column::OrderId.eq(order_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            condition = condition.add(delivery::Column::SupplierId.eq(supplier_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(delivery::Column::Status.eq(status));
        }
        if let Some(reconciled) = filter.reconciled {
            condition = condition.add(delivery::Column::Reconciled.eq(reconciled));
        }
        if let Some(from) = filter.from {
            condition = condition.add(delivery::Column::PlannedDate.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(delivery::Column::PlannedDate.lte(to));
        }

        let page = pagination.page();
        let limit = pagination.limit();
        let paginator = delivery::Entity::find()
            .filter(condition)
            .order_by_desc(delivery::Column::PlannedDate)
            .order_by_desc(delivery::Column::Id)
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

    /// Applies a partial update. Moving the delivery to another order (or
    /// clearing it) re-derives the status of both orders involved.
    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i32,
        patch: DeliveryPatch,
    ) -> Result<delivery::Model, ServiceError> {
        patch.validate()?;
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::Deliveries,
            GroupScope::Group(existing.group_id),
        )?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        if let Some(supplier_id) = patch.supplier_id {
            ensure_supplier_exists(&txn, supplier_id).await?;
        }
        if let Some(Some(order_id)) = patch.order_id {
            ensure_linkable_order(&txn, order_id, existing.group_id).await?;
        }

        let previous_order = existing.order_id;
        let mut active = existing.into_active_model();
        patch.apply_to(&mut active);
        let updated = active.update(&txn).await?;

        if updated.order_id != previous_order {
            if let Some(old) = previous_order {
                linkage::apply(&txn, old, LinkEvent::Unlinked).await?;
            }
            if let Some(new) = updated.order_id {
                let event = if updated.is_delivered() {
                    LinkEvent::Validated
                } else {
                    LinkEvent::Linked
                };
                linkage::apply(&txn, new, event).await?;
            }
            info!(
                delivery_id = id,
                from = ?previous_order,
                to = ?updated.order_id,
                "delivery re-linked"
            );
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Marks a planned delivery as delivered today and promotes its order to
    /// `delivered`. Validating twice is a conflict.
    #[instrument(skip(self, actor, note))]
    pub async fn validate(
        &self,
        actor: &AuthUser,
        id: i32,
        note: DeliveryNote,
    ) -> Result<Validated, ServiceError> {
        note.validate()?;
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Validate,
            Resource::Deliveries,
            GroupScope::Group(existing.group_id),
        )?;
        if existing.is_delivered() {
            return Err(already_validated(id));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let now = Utc::now();
        let mut changes = delivery::ActiveModel {
            status: Set(DeliveryStatus::Delivered),
            delivered_date: Set(Some(now.date_naive())),
            validated_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        };
        if let Some(bl_number) = non_blank(note.bl_number) {
            changes.bl_number = Set(Some(bl_number));
        }
        if let Some(bl_amount) = note.bl_amount {
            changes.bl_amount = Set(Some(bl_amount));
        }

        // Guarded on the current status so concurrent validations cannot both win.
        let result = delivery::Entity::update_many()
            .set(changes)
            .filter(delivery::Column::Id.eq(id))
            .filter(delivery::Column::Status.eq(DeliveryStatus::Planned))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            warn!(delivery_id = id, "delivery validated concurrently");
            return Err(already_validated(id));
        }

        let delivery = delivery::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?;
        let order = match delivery.order_id {
            Some(order_id) => linkage::apply(&txn, order_id, LinkEvent::Validated).await?,
            None => None,
        };

        txn.commit().await?;

        counter!("storeops.deliveries.validated", 1);
        info!(
            delivery_id = id,
            order_id = ?delivery.order_id,
            user_id = actor.user_id,
            "delivery validated"
        );
        Ok(Validated { delivery, order })
    }

    /// Deletes a delivery; its order falls back to whatever the remaining
    /// deliveries imply.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &AuthUser, id: i32) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::Deliveries,
            GroupScope::Group(existing.group_id),
        )?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        delivery::Entity::delete_by_id(id).exec(&txn).await?;
        if let Some(order_id) = existing.order_id {
            linkage::apply(&txn, order_id, LinkEvent::Unlinked).await?;
        }

        txn.commit().await?;
        info!(delivery_id = id, order_id = ?existing.order_id, "delivery deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<delivery::Model, ServiceError> {
        delivery::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))
    }
}

fn already_validated(id: i32) -> ServiceError {
    ServiceError::Conflict(format!("delivery {} has already been validated", id))
}

/// A delivery may only point at an existing order of its own store group.
async fn ensure_linkable_order<C>(conn: &C, order_id: i32, group_id: i32) -> Result<(), ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    let found = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("orderId: order {} does not exist", order_id))
        })?;
    if found.group_id != group_id {
        return Err(ServiceError::ValidationError(format!(
            "orderId: order {} belongs to another store group",
            order_id
        )));
    }
    Ok(())
}
