//! Account administration: listing, profile edits, role/active transitions,
//! password changes, deletion.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;

use backhouse_auth::{
    AuthorizationContext, Permission, Role, hash_password, require, verify_password,
};
use backhouse_core::{AccountId, EmailAddress, Password};

use crate::app::dto::{ChangePasswordRequest, ListQuery, UpdateAccountRequest, account_to_json};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_accounts))
        .route(
            "/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/:id/password", put(change_password))
}

/// GET /accounts
pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
    Query(query): Query<ListQuery>,
) -> Result<axum::response::Response, ApiError> {
    require(Some(&context), Permission::AccountsList)?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;

    let result = services
        .store_op(services.accounts.list(offset, limit))
        .await?;

    let items: Vec<serde_json::Value> = result.items.iter().map(account_to_json).collect();
    let pages = result.total.div_ceil(limit);

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "items": items,
            "pagination": {
                "page": page,
                "limit": limit,
                "total": result.total,
                "pages": pages,
            },
        })),
    )
        .into_response())
}

/// GET /accounts/:id
pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    let id: AccountId = id.parse()?;

    // Owners may always read their own record.
    if !context.owns(id) {
        require(Some(&context), Permission::AccountsRead)?;
    }

    let account = services
        .store_op(services.accounts.get(id))
        .await?
        .ok_or_else(account_not_found)?;

    Ok((StatusCode::OK, Json(account_to_json(&account))).into_response())
}

/// PUT /accounts/:id
///
/// Profile fields obey the owner-or-admin rule; role/active are state-machine
/// transitions guarded inside the domain (admin-only, last-admin protected).
pub async fn update_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<axum::response::Response, ApiError> {
    let id: AccountId = id.parse()?;
    let now = Utc::now();

    // Role/active transitions and edits to other accounts go through the
    // permission table; owners may edit their own profile fields.
    let admin_fields = body.role.is_some() || body.active.is_some();
    if admin_fields || !context.owns(id) {
        require(Some(&context), Permission::AccountsManage)?;
    }

    let mut account = services
        .store_op(services.accounts.get(id))
        .await?
        .ok_or_else(account_not_found)?;

    // The last-admin guard needs the count of *other* active admins; fetch it
    // once if any guarded transition is requested.
    let other_active_admins = if body.role.is_some() || body.active.is_some() {
        Some(
            services
                .store_op(services.accounts.count_other_active_admins(id))
                .await?,
        )
    } else {
        None
    };

    if let Some(raw) = body.role.as_deref() {
        let new_role: Role = raw.parse()?;
        account.change_role(&context, new_role, other_active_admins.unwrap_or(0), now)?;
    }

    if let Some(active) = body.active {
        account.set_active(&context, active, other_active_admins.unwrap_or(0), now)?;
    }

    if body.name.is_some() || body.email.is_some() {
        let email = body
            .email
            .as_deref()
            .map(EmailAddress::parse)
            .transpose()?;
        account.update_profile(&context, body.name.as_deref(), email, now)?;
    }

    services
        .store_op(services.accounts.update(account.clone()))
        .await?;

    Ok((StatusCode::OK, Json(account_to_json(&account))).into_response())
}

/// PUT /accounts/:id/password
///
/// Owners must present their current password; admins change any password
/// without it. Success clears the renewal slot, so every outstanding renewal
/// credential for the account stops working.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
    Path(id): Path<String>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<axum::response::Response, ApiError> {
    let id: AccountId = id.parse()?;

    let owner = context.owns(id);
    if !owner {
        require(Some(&context), Permission::AccountsManage)?;
    }

    let mut account = services
        .store_op(services.accounts.get(id))
        .await?
        .ok_or_else(account_not_found)?;

    if owner {
        let current = body
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::validation("current_password is required"))?;
        if !verify_password(current, &account.password_hash) {
            return Err(ApiError::authentication("current password is incorrect"));
        }
    }

    let new_password = Password::parse(&body.new_password)?;
    let new_hash = hash_password(&new_password)?;

    account.change_password(new_hash, Utc::now());
    services
        .store_op(services.accounts.update(account))
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "password updated" })),
    )
        .into_response())
}

/// DELETE /accounts/:id
pub async fn delete_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<AuthorizationContext>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    let id: AccountId = id.parse()?;

    require(Some(&context), Permission::AccountsDelete)?;

    let account = services
        .store_op(services.accounts.get(id))
        .await?
        .ok_or_else(account_not_found)?;

    let other_active_admins = services
        .store_op(services.accounts.count_other_active_admins(id))
        .await?;
    account.ensure_removable(&context, other_active_admins)?;

    services.store_op(services.accounts.remove(id)).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "account deleted" })),
    )
        .into_response())
}

fn account_not_found() -> ApiError {
    ApiError::NotFound("account not found".to_string())
}
