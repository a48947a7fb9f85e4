//! Authorization gate: one permission table, checked by set membership.
//!
//! Routes declare the [`Permission`] they need; the table below is the single
//! place where roles are granted permissions.

use thiserror::Error;

use crate::{AuthorizationContext, Role};

/// Permissions enforced by the account-administration surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Permission {
    /// List accounts.
    AccountsList,
    /// Read any account record.
    AccountsRead,
    /// Mutate role/active state or another account's profile and password.
    AccountsManage,
    /// Delete accounts.
    AccountsDelete,
}

/// The permission table. There is no wildcard; every grant is listed.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => &[
            Permission::AccountsList,
            Permission::AccountsRead,
            Permission::AccountsManage,
            Permission::AccountsDelete,
        ],
        Role::Manager => &[Permission::AccountsList, Permission::AccountsRead],
        Role::Staff => &[],
        Role::User => &[],
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("role '{0}' is not permitted to perform this operation")]
    Forbidden(Role),
}

/// Enforce a permission for the request's context.
///
/// `None` means the request never passed verification (`Unauthenticated`);
/// a present context with a role outside the grant set is `Forbidden`.
pub fn require(
    context: Option<&AuthorizationContext>,
    permission: Permission,
) -> Result<(), GateError> {
    let ctx = context.ok_or(GateError::Unauthenticated)?;
    if role_permissions(ctx.role).contains(&permission) {
        Ok(())
    } else {
        Err(GateError::Forbidden(ctx.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backhouse_core::AccountId;

    fn ctx(role: Role) -> AuthorizationContext {
        AuthorizationContext::new(AccountId::new(), role)
    }

    #[test]
    fn missing_context_is_unauthenticated() {
        assert_eq!(
            require(None, Permission::AccountsRead),
            Err(GateError::Unauthenticated)
        );
    }

    #[test]
    fn admin_holds_every_permission() {
        let admin = ctx(Role::Admin);
        for permission in [
            Permission::AccountsList,
            Permission::AccountsRead,
            Permission::AccountsManage,
            Permission::AccountsDelete,
        ] {
            assert!(require(Some(&admin), permission).is_ok());
        }
    }

    #[test]
    fn manager_reads_but_cannot_manage() {
        let manager = ctx(Role::Manager);
        assert!(require(Some(&manager), Permission::AccountsList).is_ok());
        assert_eq!(
            require(Some(&manager), Permission::AccountsManage),
            Err(GateError::Forbidden(Role::Manager))
        );
    }

    #[test]
    fn staff_and_user_hold_nothing() {
        for role in [Role::Staff, Role::User] {
            let context = ctx(role);
            assert_eq!(
                require(Some(&context), Permission::AccountsList),
                Err(GateError::Forbidden(role))
            );
        }
    }
}
