use axum::Router;
use axum::routing::{get, post};

pub mod accounts;
pub mod auth;
pub mod system;

/// Routes reachable without a verified credential.
///
/// Logout is public: it must answer 200 whether or not the presented
/// credentials are still valid.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
}

/// Routes behind the credential verifier.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/accounts", accounts::router())
}
