/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Static grant table for the three store roles. Group scoping is layered on
 * top of these grants by [`super::policy`].
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

use super::permissions::consts::*;
use crate::entities::Role;

/// Permissions granted to a role
#[derive(Debug, Clone)]
pub struct RoleGrants {
    pub permissions: Vec<&'static str>,
}

lazy_static! {
    pub static ref ROLES: HashMap<Role, RoleGrants> = {
        let mut roles = HashMap::new();

        roles.insert(
            Role::Admin,
            RoleGrants {
                // Full access across every store
                permissions: vec![ALL],
            },
        );

        roles.insert(
            Role::Manager,
            RoleGrants {
                // Full operations access within own stores
                permissions: vec![
                    ORDERS_ALL,
                    DELIVERIES_ALL,
                    INVOICES_VERIFY,
                    SUPPLIERS_READ,
                    SUPPLIERS_CREATE,
                    SUPPLIERS_UPDATE,
                    GROUPS_READ,
                    PUBLICITIES_ALL,
                    CUSTOMER_ORDERS_ALL,
                ],
            },
        );

        roles.insert(
            Role::Employee,
            RoleGrants {
                // Day-to-day operations without deletes
                permissions: vec![
                    ORDERS_READ,
                    ORDERS_CREATE,
                    ORDERS_UPDATE,
                    DELIVERIES_READ,
                    DELIVERIES_CREATE,
                    DELIVERIES_UPDATE,
                    DELIVERIES_VALIDATE,
                    INVOICES_VERIFY,
                    SUPPLIERS_READ,
                    GROUPS_READ,
                    PUBLICITIES_READ,
                    CUSTOMER_ORDERS_READ,
                    CUSTOMER_ORDERS_CREATE,
                    CUSTOMER_ORDERS_UPDATE,
                ],
            },
        );

        roles
    };
}

/// Matches one granted permission against a required one.
///
/// Supports exact matches, `resource:*` and the global `*`.
pub fn check_permission(granted: &str, required: &str) -> bool {
    if granted == ALL || granted == required {
        return true;
    }

    match granted.strip_suffix(":*") {
        Some(resource) => required
            .split_once(':')
            .map(|(required_resource, _)| required_resource == resource)
            .unwrap_or(false),
        None => false,
    }
}

/// True when `role` is granted `required`.
pub fn role_grants(role: Role, required: &str) -> bool {
    ROLES
        .get(&role)
        .map(|grants| grants.permissions.iter().any(|p| check_permission(p, required)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_whole_resource_only() {
        assert!(check_permission("orders:*", "orders:delete"));
        assert!(!check_permission("orders:*", "orders_archive:read"));
        assert!(check_permission("*", "users:create"));
        assert!(!check_permission("orders:read", "orders:update"));
    }

    #[test]
    fn every_role_has_grants() {
        for role in [Role::Admin, Role::Manager, Role::Employee] {
            assert!(ROLES.contains_key(&role), "missing grants for {role}");
        }
    }

    #[test]
    fn employees_cannot_delete() {
        assert!(!role_grants(Role::Employee, "orders:delete"));
        assert!(!role_grants(Role::Employee, "deliveries:delete"));
        assert!(role_grants(Role::Manager, "deliveries:delete"));
    }
}
