//! Central error translator.
//!
//! Every handler funnels its failures through [`ApiError`]; nothing maps a
//! status code anywhere else. Internal details are logged, and surfaced to the
//! caller only in development builds.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use backhouse_accounts::AccountStoreError;
use backhouse_auth::{
    GateError, IssueError, PasswordHashError, RenewalError, RevocationStoreError, VerifyError,
};
use backhouse_core::DomainError;

/// The five-way failure taxonomy exposed by the API.
#[derive(Debug)]
pub enum ApiError {
    /// 400: malformed or weak input.
    Validation(String),
    /// 401: missing/bad password or credential.
    Authentication(String),
    /// 403: authenticated but not permitted (includes last-admin protection).
    Authorization(String),
    /// 404: unknown account.
    NotFound(String),
    /// 500: store unreachable, signing failure, other unexpected failures.
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            ApiError::Authorization(_) => (StatusCode::FORBIDDEN, "authorization_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                if cfg!(debug_assertions) {
                    detail.clone()
                } else {
                    "internal error".to_string()
                }
            }
            ApiError::Validation(msg)
            | ApiError::Authentication(msg)
            | ApiError::Authorization(msg)
            | ApiError::NotFound(msg) => msg.clone(),
        };

        (
            status,
            Json(json!({
                "error": code,
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(_) | DomainError::InvalidId(_) => {
                ApiError::Validation(e.to_string())
            }
            DomainError::NotFound => ApiError::NotFound("account not found".to_string()),
            DomainError::Unauthorized => ApiError::Authorization(e.to_string()),
            DomainError::LastAdminViolation => ApiError::Authorization(e.to_string()),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Missing | VerifyError::Invalid | VerifyError::Revoked => {
                ApiError::Authentication(e.to_string())
            }
            // Fail closed: an unanswerable revocation check is reported as
            // unauthenticated, never skipped. The cause still reaches the log.
            VerifyError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "revocation store unavailable; failing closed");
                ApiError::Authentication("credential could not be verified".to_string())
            }
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Unauthenticated => ApiError::Authentication(e.to_string()),
            GateError::Forbidden(_) => ApiError::Authorization(e.to_string()),
        }
    }
}

impl From<RenewalError> for ApiError {
    fn from(e: RenewalError) -> Self {
        match e {
            RenewalError::InvalidRefreshCredential => ApiError::Authentication(e.to_string()),
            RenewalError::StoreUnavailable(detail) => ApiError::Internal(detail),
            RenewalError::Signing(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AccountStoreError> for ApiError {
    fn from(e: AccountStoreError) -> Self {
        match e {
            // Duplicate email is a validation failure of the request.
            AccountStoreError::EmailTaken => ApiError::Validation(e.to_string()),
            AccountStoreError::NotFound => ApiError::NotFound(e.to_string()),
            AccountStoreError::Unavailable(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<RevocationStoreError> for ApiError {
    fn from(e: RevocationStoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<IssueError> for ApiError {
    fn from(e: IssueError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<PasswordHashError> for ApiError {
    fn from(e: PasswordHashError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backhouse_auth::Role;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        let cases = [
            (ApiError::validation("x"), StatusCode::BAD_REQUEST),
            (ApiError::authentication("x"), StatusCode::UNAUTHORIZED),
            (
                ApiError::Authorization("x".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (ApiError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_and_code().0, status);
        }
    }

    #[test]
    fn last_admin_violation_is_an_authorization_failure() {
        let error = ApiError::from(DomainError::LastAdminViolation);
        assert!(matches!(error, ApiError::Authorization(_)));
    }

    #[test]
    fn unreachable_revocation_store_fails_closed_as_authentication() {
        let error = ApiError::from(VerifyError::StoreUnavailable("down".into()));
        assert!(matches!(error, ApiError::Authentication(_)));
    }

    #[test]
    fn forbidden_gate_is_authorization() {
        let error = ApiError::from(GateError::Forbidden(Role::User));
        assert!(matches!(error, ApiError::Authorization(_)));
    }
}
