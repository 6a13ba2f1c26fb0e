//! Single authorization decision point.
//!
//! Every operation asks [`authorize`] with the action, the resource kind and
//! the store group the target row lives in. Role grants come from
//! [`super::rbac`]; group membership comes from the session principal.

use tracing::debug;

use super::{
    permissions::{permission, Action, Resource},
    rbac, AuthUser,
};
use crate::errors::ServiceError;

/// Which store groups an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupScope {
    /// Not tied to a store (suppliers, users, the group list itself).
    Global,
    /// Rows belonging to one store group.
    Group(i32),
}

/// Allows or refuses `action` on `resource` within `scope`.
///
/// Admins pass every check. Other roles need the permission grant and, for
/// [`GroupScope::Group`], membership of that group.
pub fn authorize(
    user: &AuthUser,
    action: Action,
    resource: Resource,
    scope: GroupScope,
) -> Result<(), ServiceError> {
    let required = permission(resource, action);

    if !rbac::role_grants(user.role, &required) {
        debug!(user_id = user.user_id, role = %user.role, %required, "permission denied");
        return Err(ServiceError::Forbidden(format!(
            "role '{}' may not {} {}",
            user.role, action, resource
        )));
    }

    match scope {
        GroupScope::Group(group_id) if !user.is_member_of(group_id) => {
            debug!(user_id = user.user_id, group_id, %required, "group out of scope");
            Err(ServiceError::Forbidden(format!(
                "group {} is outside your stores",
                group_id
            )))
        }
        _ => Ok(()),
    }
}

/// Groups whose rows `user` may list, `None` meaning every group.
pub fn visible_groups(user: &AuthUser) -> Option<Vec<i32>> {
    if user.is_admin() {
        None
    } else {
        Some(user.group_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn user(role: Role, groups: &[i32]) -> AuthUser {
        AuthUser {
            user_id: 7,
            username: "someone".into(),
            role,
            group_ids: groups.to_vec(),
        }
    }

    #[rstest]
    #[case(Role::Admin, Action::Delete, Resource::Orders, true)]
    #[case(Role::Admin, Action::Create, Resource::Users, true)]
    #[case(Role::Manager, Action::Delete, Resource::Orders, true)]
    #[case(Role::Manager, Action::Delete, Resource::Deliveries, true)]
    #[case(Role::Manager, Action::Create, Resource::Suppliers, true)]
    #[case(Role::Manager, Action::Delete, Resource::Suppliers, false)]
    #[case(Role::Manager, Action::Create, Resource::Groups, false)]
    #[case(Role::Manager, Action::Update, Resource::NocodbConfigs, false)]
    #[case(Role::Employee, Action::Validate, Resource::Deliveries, true)]
    #[case(Role::Employee, Action::Verify, Resource::Invoices, true)]
    #[case(Role::Employee, Action::Delete, Resource::Orders, false)]
    #[case(Role::Employee, Action::Delete, Resource::Deliveries, false)]
    #[case(Role::Employee, Action::Create, Resource::Publicities, false)]
    #[case(Role::Employee, Action::Read, Resource::Users, false)]
    fn grant_matrix_in_own_group(
        #[case] role: Role,
        #[case] action: Action,
        #[case] resource: Resource,
        #[case] allowed: bool,
    ) {
        let result = authorize(&user(role, &[2]), action, resource, GroupScope::Group(2));
        assert_eq!(result.is_ok(), allowed, "{role} {action} {resource}");
    }

    #[test]
    fn members_only_reach_their_groups() {
        let manager = user(Role::Manager, &[2, 3]);
        assert!(authorize(&manager, Action::Delete, Resource::Orders, GroupScope::Group(3)).is_ok());
        assert_matches!(
            authorize(&manager, Action::Read, Resource::Orders, GroupScope::Group(9)),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn admins_ignore_membership() {
        let admin = user(Role::Admin, &[]);
        assert!(authorize(&admin, Action::Validate, Resource::Deliveries, GroupScope::Group(42)).is_ok());
        assert_eq!(visible_groups(&admin), None);
        assert_eq!(visible_groups(&user(Role::Employee, &[4])), Some(vec![4]));
    }
}
