//! Black-box tests for the credential and session lifecycle: same router as
//! production, in-memory stores, ephemeral port.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde_json::json;

use backhouse_api::config::AppConfig;

const ACCESS_KEY: &str = "test-access-secret";
const RENEWAL_KEY: &str = "test-renewal-secret";

fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        access_signing_key: ACCESS_KEY.to_string(),
        renewal_signing_key: RENEWAL_KEY.to_string(),
        access_ttl_secs: 900,
        renewal_ttl_secs: 604_800,
        store_timeout_ms: 2_000,
        use_persistent_stores: false,
        database_url: None,
        redis_url: "redis://localhost:6379".to_string(),
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let app = backhouse_api::app::build_app(test_config())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The claims shape minted for access credentials.
#[derive(Debug, serde::Deserialize)]
struct AccessClaimsView {
    sub: String,
    role: String,
}

fn decode_access(raw: &str) -> AccessClaimsView {
    jsonwebtoken::decode::<AccessClaimsView>(
        raw,
        &DecodingKey::from_secret(ACCESS_KEY.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .expect("access credential must decode")
    .claims
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    email: &str,
    password: &str,
    role: Option<&str>,
) -> reqwest::Response {
    let mut body = json!({ "name": name, "email": email, "password": password });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    client
        .post(format!("{base_url}/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration & login
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_end_to_end() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "user");
    let registered_id = body["id"].as_str().unwrap().to_string();

    let res = login(&client, &srv.base_url, "a@x.com", "Aa1!aaaa").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();

    let claims = decode_access(body["access_credential"].as_str().unwrap());
    assert_eq!(claims.sub, registered_id);
    assert_eq!(claims.role, "user");
}

#[tokio::test]
async fn register_enforces_password_policy_and_email_shape() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "weakpass", None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = register(&client, &srv.base_url, "A", "not-an-email", "Aa1!aaaa", None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_email_is_a_validation_failure() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = register(&client, &srv.base_url, "B", "a@x.com", "Bb2@bbbb", None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rejects_wrong_password_with_401() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;

    let res = login(&client, &srv.base_url, "a@x.com", "Aa1!aaab").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = login(&client, &srv.base_url, "ghost@x.com", "Aa1!aaaa").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registered_role_is_carried_into_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(
        &client,
        &srv.base_url,
        "M",
        "m@x.com",
        "Mm1!mmmm",
        Some("manager"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();

    let claims = decode_access(body["access_credential"].as_str().unwrap());
    assert_eq!(claims.role, "manager");
}

// ─────────────────────────────────────────────────────────────────────────────
// Protected requests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_require_a_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_caller_identity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    let session: serde_json::Value = res.json().await.unwrap();
    let token = session["access_credential"].as_str().unwrap();

    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], session["id"]);
    assert_eq!(body["email"], "a@x.com");
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh & logout
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_mints_a_new_access_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    let session: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": session["renewal_credential"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    let claims = decode_access(body["access_credential"].as_str().unwrap());
    assert_eq!(claims.sub, session["id"].as_str().unwrap());
}

#[tokio::test]
async fn refresh_rejects_an_unregistered_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;

    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": "wrong-credential" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_login_invalidates_the_first_renewal_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;

    let first: serde_json::Value = login(&client, &srv.base_url, "a@x.com", "Aa1!aaaa")
        .await
        .json()
        .await
        .unwrap();
    let second: serde_json::Value = login(&client, &srv.base_url, "a@x.com", "Aa1!aaaa")
        .await
        .json()
        .await
        .unwrap();

    // Single renewal slot: last login wins.
    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": first["renewal_credential"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": second["renewal_credential"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_is_idempotent_and_stops_refresh() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    let session: serde_json::Value = res.json().await.unwrap();
    let renewal = session["renewal_credential"].clone();

    for _ in 0..2 {
        let res = client
            .post(format!("{}/auth/logout", srv.base_url))
            .json(&json!({ "renewal_credential": renewal }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": renewal }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_remaining_access_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None).await;
    let session: serde_json::Value = res.json().await.unwrap();
    let access = session["access_credential"].as_str().unwrap().to_string();

    // Still valid before logout.
    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/auth/logout", srv.base_url))
        .json(&json!({
            "renewal_credential": session["renewal_credential"],
            "access_credential": access,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Revoked before its natural expiry.
    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ─────────────────────────────────────────────────────────────────────────────
// Account administration
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_gate_forbids_users_and_admits_managers() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user: serde_json::Value = register(&client, &srv.base_url, "U", "u@x.com", "Uu1!uuuu", None)
        .await
        .json()
        .await
        .unwrap();
    let manager: serde_json::Value = register(
        &client,
        &srv.base_url,
        "M",
        "m@x.com",
        "Mm1!mmmm",
        Some("manager"),
    )
    .await
    .json()
    .await
    .unwrap();

    let res = client
        .get(format!("{}/accounts", srv.base_url))
        .bearer_auth(user["access_credential"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/accounts", srv.base_url))
        .bearer_auth(manager["access_credential"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn unknown_account_is_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin: serde_json::Value = register(
        &client,
        &srv.base_url,
        "Root",
        "root@x.com",
        "Rr1!rrrr",
        Some("admin"),
    )
    .await
    .json()
    .await
    .unwrap();

    let res = client
        .get(format!(
            "{}/accounts/00000000-0000-7000-8000-000000000000",
            srv.base_url
        ))
        .bearer_auth(admin["access_credential"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_admin_cannot_change_roles() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user: serde_json::Value = register(&client, &srv.base_url, "U", "u@x.com", "Uu1!uuuu", None)
        .await
        .json()
        .await
        .unwrap();

    let res = client
        .put(format!(
            "{}/accounts/{}",
            srv.base_url,
            user["id"].as_str().unwrap()
        ))
        .bearer_auth(user["access_credential"].as_str().unwrap())
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_self_edit_is_allowed_and_stranger_edit_is_not() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let alice: serde_json::Value =
        register(&client, &srv.base_url, "Alice", "alice@x.com", "Aa1!aaaa", None)
            .await
            .json()
            .await
            .unwrap();
    let bob: serde_json::Value = register(&client, &srv.base_url, "Bob", "bob@x.com", "Bb2@bbbb", None)
        .await
        .json()
        .await
        .unwrap();

    let res = client
        .put(format!(
            "{}/accounts/{}",
            srv.base_url,
            alice["id"].as_str().unwrap()
        ))
        .bearer_auth(alice["access_credential"].as_str().unwrap())
        .json(&json!({ "name": "Alice Prime" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Alice Prime");

    let res = client
        .put(format!(
            "{}/accounts/{}",
            srv.base_url,
            alice["id"].as_str().unwrap()
        ))
        .bearer_auth(bob["access_credential"].as_str().unwrap())
        .json(&json!({ "name": "Mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_change_invalidates_outstanding_renewal_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let session: serde_json::Value =
        register(&client, &srv.base_url, "A", "a@x.com", "Aa1!aaaa", None)
            .await
            .json()
            .await
            .unwrap();
    let id = session["id"].as_str().unwrap();
    let token = session["access_credential"].as_str().unwrap();

    // Wrong current password is rejected.
    let res = client
        .put(format!("{}/accounts/{id}/password", srv.base_url))
        .bearer_auth(token)
        .json(&json!({ "current_password": "Nope1!nn", "new_password": "Bb2@bbbb" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .put(format!("{}/accounts/{id}/password", srv.base_url))
        .bearer_auth(token)
        .json(&json!({ "current_password": "Aa1!aaaa", "new_password": "Bb2@bbbb" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The pre-change renewal credential is dead; the new password logs in.
    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "renewal_credential": session["renewal_credential"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = login(&client, &srv.base_url, "a@x.com", "Bb2@bbbb").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn last_admin_protection_holds_across_deactivate_and_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let first: serde_json::Value = register(
        &client,
        &srv.base_url,
        "Root",
        "root@x.com",
        "Rr1!rrrr",
        Some("admin"),
    )
    .await
    .json()
    .await
    .unwrap();
    let first_id = first["id"].as_str().unwrap();
    let first_token = first["access_credential"].as_str().unwrap();

    // Sole active admin cannot deactivate itself.
    let res = client
        .put(format!("{}/accounts/{first_id}", srv.base_url))
        .bearer_auth(first_token)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authorization_error");

    // With a second active admin the same transition succeeds.
    let second: serde_json::Value = register(
        &client,
        &srv.base_url,
        "Backup",
        "backup@x.com",
        "Bb2@bbbb",
        Some("admin"),
    )
    .await
    .json()
    .await
    .unwrap();
    let second_id = second["id"].as_str().unwrap();

    let res = client
        .put(format!("{}/accounts/{second_id}", srv.base_url))
        .bearer_auth(first_token)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Now the first admin is the last active one again.
    let res = client
        .put(format!("{}/accounts/{first_id}", srv.base_url))
        .bearer_auth(first_token)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Deleting the inactive admin does not touch the active-admin count.
    let res = client
        .delete(format!("{}/accounts/{second_id}", srv.base_url))
        .bearer_auth(first_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Deleting the last active admin is refused.
    let res = client
        .delete(format!("{}/accounts/{first_id}", srv.base_url))
        .bearer_auth(first_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
