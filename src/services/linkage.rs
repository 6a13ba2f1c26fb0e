//! Order status derivation from linked deliveries.
//!
//! An order's status is a projection of its deliveries: `pending` with none,
//! `planned` while some exist, `delivered` once one has been validated. The
//! pure functions here compute the next status for each event that touches the
//! order/delivery link; [`apply`] runs them against the database on whatever
//! connection or transaction the caller holds.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, info, instrument};

use crate::{
    entities::{
        delivery::{self, DeliveryStatus},
        order::{self, OrderStatus},
    },
    errors::ServiceError,
};

/// Something that happened to the link between an order and its deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A delivery was created with, or re-pointed to, this order.
    Linked,
    /// A delivery of this order was validated.
    Validated,
    /// A delivery of this order was deleted or re-pointed elsewhere.
    Unlinked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Status an order should have given the statuses of the deliveries linked to it.
pub fn project<I>(linked: I) -> OrderStatus
where
    I: IntoIterator<Item = DeliveryStatus>,
{
    linked
        .into_iter()
        .map(|status| match status {
            DeliveryStatus::Planned => OrderStatus::Planned,
            DeliveryStatus::Delivered => OrderStatus::Delivered,
        })
        .max()
        .unwrap_or(OrderStatus::Pending)
}

/// Next order status after `event`.
///
/// `remaining` holds the statuses of the deliveries still linked once the
/// event has been applied; only [`LinkEvent::Unlinked`] reads it. Linking and
/// validating only move forward, unlinking re-projects from what is left.
pub fn next_status(
    current: OrderStatus,
    event: LinkEvent,
    remaining: &[DeliveryStatus],
) -> Transition {
    let to = match event {
        LinkEvent::Linked => current.max(OrderStatus::Planned),
        LinkEvent::Validated => OrderStatus::Delivered,
        LinkEvent::Unlinked => project(remaining.iter().copied()),
    };
    Transition { from: current, to }
}

/// Checks a status explicitly requested by a client on an order update.
///
/// `planned` and `delivered` can only be reached through deliveries; `pending`
/// is accepted only while nothing is linked.
pub fn check_requested_status(
    requested: OrderStatus,
    linked_deliveries: u64,
) -> Result<(), ServiceError> {
    match requested {
        OrderStatus::Pending if linked_deliveries == 0 => Ok(()),
        OrderStatus::Pending => Err(ServiceError::ValidationError(format!(
            "status: order has {} linked deliveries and cannot be set back to pending",
            linked_deliveries
        ))),
        other => Err(ServiceError::ValidationError(format!(
            "status: '{}' is derived from deliveries and cannot be set directly",
            other
        ))),
    }
}

/// Applies `event` to order `order_id` using `conn`.
///
/// Call after the delivery write, on the same transaction, so the projection
/// for [`LinkEvent::Unlinked`] sees the post-change set of deliveries. Returns
/// the order as stored afterwards, or `None` when the order no longer exists.
#[instrument(skip(conn))]
pub async fn apply<C>(
    conn: &C,
    order_id: i32,
    event: LinkEvent,
) -> Result<Option<order::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(order) = order::Entity::find_by_id(order_id).one(conn).await? else {
        debug!(order_id, "linked order is gone, nothing to update");
        return Ok(None);
    };

    let remaining: Vec<DeliveryStatus> = if event == LinkEvent::Unlinked {
        delivery::Entity::find()
            .filter(delivery::Column::OrderId.eq(order_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|d| d.status)
            .collect()
    } else {
        Vec::new()
    };

    let transition = next_status(order.status, event, &remaining);
    if !transition.changed() {
        return Ok(Some(order));
    }

    info!(
        order_id,
        from = %transition.from,
        to = %transition.to,
        ?event,
        "order status derived from deliveries"
    );

    let mut active: order::ActiveModel = order.into();
    active.status = Set(transition.to);
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await?;

    Ok(Some(updated))
}
