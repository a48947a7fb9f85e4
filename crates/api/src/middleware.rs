use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use backhouse_auth::{CredentialVerifier, VerifyError};

use crate::app::errors::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<CredentialVerifier>,
}

/// Verify the bearer credential and attach the [`AuthorizationContext`] to the
/// request. Verification failures (including an unreachable revocation store,
/// which fails closed) never reach the handler.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = extract_bearer(req.headers())?;

    let context = state.verifier.verify(credential, Utc::now()).await?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, VerifyError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(VerifyError::Missing)?;

    let header = header.to_str().map_err(|_| VerifyError::Missing)?;

    let credential = header
        .strip_prefix("Bearer ")
        .ok_or(VerifyError::Missing)?
        .trim();

    if credential.is_empty() {
        return Err(VerifyError::Missing);
    }

    Ok(credential)
}
