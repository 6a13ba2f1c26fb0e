/*!
 * # Permissions Module
 *
 * Permissions are `resource:action` strings. Resources and actions are closed
 * enums so a typo in a handler is a compile error rather than a silent 403.
 */

use serde::{Deserialize, Serialize};

/// Permission actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Mark a delivery as delivered
    Validate,
    /// Query the external invoice ledger
    Verify,
}

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Orders,
    Deliveries,
    Invoices,
    Suppliers,
    Groups,
    Users,
    Publicities,
    CustomerOrders,
    NocodbConfigs,
}

/// Builds the `resource:action` string checked against role grants.
pub fn permission(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource, action)
}

/// Common permission string constants
pub mod consts {
    pub const ALL: &str = "*";

    pub const ORDERS_ALL: &str = "orders:*";
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_UPDATE: &str = "orders:update";

    pub const DELIVERIES_ALL: &str = "deliveries:*";
    pub const DELIVERIES_READ: &str = "deliveries:read";
    pub const DELIVERIES_CREATE: &str = "deliveries:create";
    pub const DELIVERIES_UPDATE: &str = "deliveries:update";
    pub const DELIVERIES_VALIDATE: &str = "deliveries:validate";

    pub const INVOICES_VERIFY: &str = "invoices:verify";

    pub const SUPPLIERS_READ: &str = "suppliers:read";
    pub const SUPPLIERS_CREATE: &str = "suppliers:create";
    pub const SUPPLIERS_UPDATE: &str = "suppliers:update";

    pub const GROUPS_READ: &str = "groups:read";

    pub const PUBLICITIES_ALL: &str = "publicities:*";
    pub const PUBLICITIES_READ: &str = "publicities:read";

    pub const CUSTOMER_ORDERS_ALL: &str = "customer_orders:*";
    pub const CUSTOMER_ORDERS_READ: &str = "customer_orders:read";
    pub const CUSTOMER_ORDERS_CREATE: &str = "customer_orders:create";
    pub const CUSTOMER_ORDERS_UPDATE: &str = "customer_orders:update";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_strings_are_snake_case() {
        assert_eq!(permission(Resource::Orders, Action::Read), consts::ORDERS_READ);
        assert_eq!(
            permission(Resource::CustomerOrders, Action::Create),
            consts::CUSTOMER_ORDERS_CREATE
        );
        assert_eq!(
            permission(Resource::Deliveries, Action::Validate),
            consts::DELIVERIES_VALIDATE
        );
        assert_eq!(
            permission(Resource::NocodbConfigs, Action::Delete),
            "nocodb_configs:delete"
        );
    }
}
