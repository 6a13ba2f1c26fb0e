// Core workflow
pub mod deliveries;
pub mod linkage;
pub mod orders;
pub mod reconciliation;

// Reference data
pub mod customer_orders;
pub mod groups;
pub mod nocodb_configs;
pub mod publicities;
pub mod suppliers;
pub mod users;

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::{
    entities::{group, supplier},
    errors::ServiceError,
};

/// Rejects a write that names a store group that does not exist.
pub(crate) async fn ensure_group_exists<C>(conn: &C, group_id: i32) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    match group::Entity::find_by_id(group_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::ValidationError(format!(
            "groupId: group {} does not exist",
            group_id
        ))),
    }
}

/// Rejects a write that names a supplier that does not exist.
pub(crate) async fn ensure_supplier_exists<C>(conn: &C, supplier_id: i32) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    match supplier::Entity::find_by_id(supplier_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::ValidationError(format!(
            "supplierId: supplier {} does not exist",
            supplier_id
        ))),
    }
}
