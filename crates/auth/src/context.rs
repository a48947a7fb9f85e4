use backhouse_core::AccountId;

use crate::{AccessClaims, Role};

/// The verified identity and role attached to a request.
///
/// Derived per-request from a successfully verified access credential and
/// never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    pub id: AccountId,
    pub role: Role,
}

impl AuthorizationContext {
    pub fn new(id: AccountId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this context belongs to the given account.
    pub fn owns(&self, account: AccountId) -> bool {
        self.id == account
    }
}

impl From<&AccessClaims> for AuthorizationContext {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}
