//! Thin RBAC helpers atop the fixed `<resource>:<action>` permission set
//! defined in `cloudpam_core::model::auth`.

use cloudpam_core::model::{role_has_permission, Action, Permission, Resource, Role};

#[derive(Debug, thiserror::Error)]
#[error("role {role:?} lacks permission {permission}")]
pub struct Forbidden {
    pub role: Role,
    pub permission: Permission,
}

/// Checks `role` against a single required permission.
pub fn require(role: Role, resource: Resource, action: Action) -> Result<(), Forbidden> {
    let permission = Permission::new(resource, action);
    if role_has_permission(role, permission) {
        Ok(())
    } else {
        Err(Forbidden { role, permission })
    }
}

/// Checks an API key's explicit scope list rather than a role — keys
/// never inherit role permissions, only what they were minted with.
#[must_use]
pub fn scopes_allow(scopes: &[Permission], resource: Resource, action: Action) -> bool {
    scopes.contains(&Permission::new(resource, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_anything() {
        assert!(require(Role::Admin, Resource::Users, Action::Delete).is_ok());
    }

    #[test]
    fn viewer_cannot_write() {
        assert!(require(Role::Viewer, Resource::Pools, Action::Create).is_err());
    }

    #[test]
    fn scopes_are_exact_not_role_derived() {
        let scopes = vec![Permission::new(Resource::Discovery, Action::Create)];
        assert!(scopes_allow(&scopes, Resource::Discovery, Action::Create));
        assert!(!scopes_allow(&scopes, Resource::Pools, Action::Read));
    }
}
