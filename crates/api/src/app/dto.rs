//! Request/response DTOs and JSON mapping helpers.

use serde::Deserialize;

use backhouse_accounts::Account;
use backhouse_auth::CredentialPair;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub renewal_credential: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub renewal_credential: String,
    pub access_credential: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// -------------------------
// Response JSON helpers
// -------------------------

/// Public view of an account. The password hash and renewal slot never leave
/// the process.
pub fn account_to_json(account: &Account) -> serde_json::Value {
    serde_json::json!({
        "id": account.id.to_string(),
        "name": account.name,
        "email": account.email.as_str(),
        "role": account.role.as_str(),
        "active": account.active,
        "created_at": account.created_at.to_rfc3339(),
        "updated_at": account.updated_at.to_rfc3339(),
    })
}

/// Account view plus a freshly minted credential pair (register/login).
pub fn session_to_json(account: &Account, pair: &CredentialPair) -> serde_json::Value {
    serde_json::json!({
        "id": account.id.to_string(),
        "name": account.name,
        "email": account.email.as_str(),
        "role": account.role.as_str(),
        "access_credential": pair.access,
        "renewal_credential": pair.renewal,
    })
}
