//! Session lifecycle: register, login, refresh, logout, me.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use backhouse_accounts::Account;
use backhouse_auth::{
    AuthorizationContext, CredentialStanding, Role, hash_password, verify_password,
};
use backhouse_core::{EmailAddress, Password};

use crate::app::dto::{
    LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, account_to_json, session_to_json,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> Result<axum::response::Response, ApiError> {
    let email = EmailAddress::parse(&body.email)?;
    let password = Password::parse(&body.password)?;
    let role = match body.role.as_deref() {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };

    let now = Utc::now();
    let password_hash = hash_password(&password)?;
    let account = Account::register(&body.name, email, password_hash, role, now)?;

    services
        .store_op(services.accounts.insert(account.clone()))
        .await?;

    let pair = services.issuer.issue(account.id, account.role, now)?;
    services.registry.record(account.id, &pair.renewal).await?;

    Ok((StatusCode::CREATED, Json(session_to_json(&account, &pair))).into_response())
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Result<axum::response::Response, ApiError> {
    let account = services
        .store_op(services.accounts.get_by_email(&body.email))
        .await?;

    // One rejection message for unknown email, wrong password and inactive
    // account: login must not reveal which check failed.
    let account = account.ok_or_else(invalid_credentials)?;
    if !verify_password(&body.password, &account.password_hash) {
        return Err(invalid_credentials());
    }
    if !account.active {
        return Err(invalid_credentials());
    }

    let now = Utc::now();
    let pair = services.issuer.issue(account.id, account.role, now)?;
    services.registry.record(account.id, &pair.renewal).await?;

    Ok((StatusCode::OK, Json(session_to_json(&account, &pair))).into_response())
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> Result<axum::response::Response, ApiError> {
    let access = services
        .registry
        .rotate_access(&body.renewal_credential, Utc::now())
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "access_credential": access })),
    )
        .into_response())
}

/// POST /auth/logout
///
/// Always 200 and idempotent: the response must not leak whether the
/// presented credentials were still valid. Failures are logged, never
/// surfaced.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<LogoutRequest>>,
) -> axum::response::Response {
    let now = Utc::now();

    // Even a malformed body gets a 200; there is nothing to act on.
    let Some(Json(body)) = body else {
        return logged_out();
    };

    // A genuine-but-expired renewal credential still identifies its subject
    // and clears the slot; a forged one identifies nobody.
    if let Some(subject) = services.registry.subject(&body.renewal_credential) {
        if let Err(e) = services.registry.clear(subject).await {
            tracing::warn!(error = %e, "logout: failed to clear renewal slot");
        }
    }

    if let Some(raw) = body.access_credential.as_deref() {
        let ttl = match services.verifier.standing(raw, now) {
            CredentialStanding::Valid(claims) => Some(claims.remaining_secs(now)),
            // Natural expiry already rejects it; no entry needed.
            CredentialStanding::Expired(_) => None,
            // Unverifiable: revoke anyway for a full access lifetime rather
            // than silently skipping (fail closed).
            CredentialStanding::Invalid => {
                Some(services.issuer.access_ttl().num_seconds().max(0) as u64)
            }
        };

        if let Some(ttl) = ttl {
            if let Err(e) = services.revocations.revoke(raw, ttl).await {
                tracing::warn!(error = %e, "logout: failed to record revocation");
            }
        }
    }

    logged_out()
}

fn logged_out() -> axum::response::Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "logged out" })),
    )
        .into_response()
}

/// GET /auth/me (protected)
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
) -> Result<axum::response::Response, ApiError> {
    let account = services
        .store_op(services.accounts.get(context.id))
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;

    Ok((StatusCode::OK, Json(account_to_json(&account))).into_response())
}

fn invalid_credentials() -> ApiError {
    ApiError::authentication("invalid credentials")
}
