//! Account record and its authorization state machine.
//!
//! States are `(active | inactive) × role`. Transitions require an admin
//! context, except name/email self-edit by the account's own owner. Any
//! transition that would leave zero active admin accounts is refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backhouse_auth::{AuthorizationContext, Role};
use backhouse_core::{AccountId, DomainError, DomainResult, EmailAddress};

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted identity record.
///
/// # Invariants
/// - `password_hash` is the only persisted form of the password.
/// - `renewal_hash` holds at most one digest: the currently valid renewal
///   credential. Overwritten on login, cleared on logout and password change.
/// - Mutations that would drop the count of active admins to zero are refused
///   with [`DomainError::LastAdminViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub renewal_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new account at registration time.
    ///
    /// The password arrives already hashed; policy checks happen where the
    /// plaintext still exists.
    pub fn register(
        name: &str,
        email: EmailAddress,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id: AccountId::new(),
            name: name.to_string(),
            email,
            password_hash,
            role,
            active: true,
            renewal_hash: None,
            created_at: now,
            updated_at: now,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Edit name/email. Permitted to the owner and to admins.
    pub fn update_profile(
        &mut self,
        actor: &AuthorizationContext,
        name: Option<&str>,
        email: Option<EmailAddress>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !actor.owns(self.id) && !actor.role.is_admin() {
            return Err(DomainError::Unauthorized);
        }

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name.to_string();
        }
        if let Some(email) = email {
            self.email = email;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Change the account's role. Admin-only.
    ///
    /// Demoting the last active admin counts as losing it.
    pub fn change_role(
        &mut self,
        actor: &AuthorizationContext,
        new_role: Role,
        other_active_admins: usize,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !actor.role.is_admin() {
            return Err(DomainError::Unauthorized);
        }

        if self.holds_active_admin_seat() && !new_role.is_admin() && other_active_admins == 0 {
            return Err(DomainError::LastAdminViolation);
        }

        self.role = new_role;
        self.updated_at = now;
        Ok(())
    }

    /// Toggle the active flag. Admin-only.
    pub fn set_active(
        &mut self,
        actor: &AuthorizationContext,
        active: bool,
        other_active_admins: usize,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !actor.role.is_admin() {
            return Err(DomainError::Unauthorized);
        }

        if self.holds_active_admin_seat() && !active && other_active_admins == 0 {
            return Err(DomainError::LastAdminViolation);
        }

        self.active = active;
        self.updated_at = now;
        Ok(())
    }

    /// Swap the password hash and clear the renewal slot, forcing every
    /// outstanding renewal credential for this account to stop working.
    ///
    /// Who may call this (owner with a verified current password, or an admin
    /// without that check) is decided where the plaintext is available.
    pub fn change_password(&mut self, new_hash: String, now: DateTime<Utc>) {
        self.password_hash = new_hash;
        self.renewal_hash = None;
        self.updated_at = now;
    }

    /// Check that deleting this account is permitted. Admin-only; refuses to
    /// remove the last active admin.
    pub fn ensure_removable(
        &self,
        actor: &AuthorizationContext,
        other_active_admins: usize,
    ) -> DomainResult<()> {
        if !actor.role.is_admin() {
            return Err(DomainError::Unauthorized);
        }
        if self.holds_active_admin_seat() && other_active_admins == 0 {
            return Err(DomainError::LastAdminViolation);
        }
        Ok(())
    }

    fn holds_active_admin_seat(&self) -> bool {
        self.active && self.role.is_admin()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn account(role: Role) -> Account {
        Account::register(
            "Alex Kim",
            EmailAddress::parse("alex@backhouse.test").unwrap(),
            "$argon2id$fake".to_string(),
            role,
            now(),
        )
        .unwrap()
    }

    fn ctx_for(account: &Account) -> AuthorizationContext {
        AuthorizationContext::new(account.id, account.role)
    }

    fn admin_ctx() -> AuthorizationContext {
        AuthorizationContext::new(AccountId::new(), Role::Admin)
    }

    fn user_ctx() -> AuthorizationContext {
        AuthorizationContext::new(AccountId::new(), Role::User)
    }

    #[test]
    fn register_defaults_to_active_with_empty_slot() {
        let account = account(Role::User);
        assert!(account.active);
        assert_eq!(account.renewal_hash, None);
    }

    #[test]
    fn register_rejects_blank_name() {
        let result = Account::register(
            "   ",
            EmailAddress::parse("a@x.com").unwrap(),
            "hash".to_string(),
            Role::User,
            now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn owner_may_edit_own_profile() {
        let mut account = account(Role::Staff);
        let actor = ctx_for(&account);

        account
            .update_profile(&actor, Some("New Name"), None, now())
            .unwrap();
        assert_eq!(account.name, "New Name");
    }

    #[test]
    fn stranger_may_not_edit_profile() {
        let mut account = account(Role::Staff);
        let result = account.update_profile(&user_ctx(), Some("X"), None, now());
        assert_eq!(result, Err(DomainError::Unauthorized));
    }

    #[test]
    fn admin_may_edit_any_profile() {
        let mut account = account(Role::Staff);
        let email = EmailAddress::parse("new@backhouse.test").unwrap();
        account
            .update_profile(&admin_ctx(), None, Some(email.clone()), now())
            .unwrap();
        assert_eq!(account.email, email);
    }

    #[test]
    fn role_change_requires_admin() {
        let mut account = account(Role::User);
        let result = account.change_role(&user_ctx(), Role::Manager, 5, now());
        assert_eq!(result, Err(DomainError::Unauthorized));
    }

    #[test]
    fn role_change_applies_for_admin_actor() {
        let mut account = account(Role::User);
        account.change_role(&admin_ctx(), Role::Manager, 5, now()).unwrap();
        assert_eq!(account.role, Role::Manager);
    }

    #[test]
    fn demoting_last_active_admin_is_refused() {
        let mut account = account(Role::Admin);
        let actor = ctx_for(&account);

        let result = account.change_role(&actor, Role::User, 0, now());
        assert_eq!(result, Err(DomainError::LastAdminViolation));
        assert_eq!(account.role, Role::Admin);
    }

    #[test]
    fn demoting_an_admin_with_peers_succeeds() {
        let mut account = account(Role::Admin);
        account.change_role(&admin_ctx(), Role::User, 1, now()).unwrap();
        assert_eq!(account.role, Role::User);
    }

    #[test]
    fn deactivating_last_active_admin_is_refused() {
        let mut account = account(Role::Admin);
        let result = account.set_active(&admin_ctx(), false, 0, now());
        assert_eq!(result, Err(DomainError::LastAdminViolation));
        assert!(account.active);
    }

    #[test]
    fn deactivating_an_admin_with_peers_succeeds() {
        let mut account = account(Role::Admin);
        account.set_active(&admin_ctx(), false, 1, now()).unwrap();
        assert!(!account.active);
    }

    #[test]
    fn reactivation_never_trips_the_admin_guard() {
        let mut account = account(Role::Admin);
        account.set_active(&admin_ctx(), false, 1, now()).unwrap();
        account.set_active(&admin_ctx(), true, 0, now()).unwrap();
        assert!(account.active);
    }

    #[test]
    fn deactivating_an_inactive_admin_is_not_a_violation() {
        let mut account = account(Role::Admin);
        account.active = false;
        // Already off the active-admin count; the guard does not apply.
        account.set_active(&admin_ctx(), false, 0, now()).unwrap();
    }

    #[test]
    fn password_change_clears_renewal_slot() {
        let mut account = account(Role::User);
        account.renewal_hash = Some("digest".to_string());

        account.change_password("$argon2id$new".to_string(), now());

        assert_eq!(account.password_hash, "$argon2id$new");
        assert_eq!(account.renewal_hash, None);
    }

    #[test]
    fn removal_of_last_active_admin_is_refused() {
        let account = account(Role::Admin);
        assert_eq!(
            account.ensure_removable(&admin_ctx(), 0),
            Err(DomainError::LastAdminViolation)
        );
        assert!(account.ensure_removable(&admin_ctx(), 1).is_ok());
    }

    #[test]
    fn removal_of_inactive_admin_is_permitted() {
        let mut account = account(Role::Admin);
        account.active = false;
        assert!(account.ensure_removable(&admin_ctx(), 0).is_ok());
    }

    #[test]
    fn removal_requires_admin_actor() {
        let account = account(Role::User);
        assert_eq!(
            account.ensure_removable(&user_ctx(), 5),
            Err(DomainError::Unauthorized)
        );
    }
}
