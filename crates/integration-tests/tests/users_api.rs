//! Users API contract tests.
//!
//! Tests without `#[ignore]` never touch the database. The ignored ones
//! need `TEST_USERS_DATABASE_URL` and run with `cargo test -- --ignored`.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use shopfloor_core::UserRole;
use shopfloor_integration_tests::{
    TestServer, bearer, database_url, spawn_users, token_keys, unique_email,
};

const PASSWORD: &str = "correct horse battery";

async fn offline() -> TestServer {
    spawn_users(None).await.unwrap()
}

async fn online() -> TestServer {
    let url = database_url("TEST_USERS_DATABASE_URL")
        .unwrap_or_else(|| panic!("TEST_USERS_DATABASE_URL must be set for ignored tests"));
    spawn_users(Some(&url)).await.unwrap()
}

async fn json_body(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn post(server: &TestServer, path: &str, body: &Value) -> (StatusCode, Value) {
    json_body(
        server
            .client
            .post(server.url(path))
            .json(body)
            .send()
            .await
            .unwrap(),
    )
    .await
}

async fn get_with(server: &TestServer, path: &str, auth: &str) -> (StatusCode, Value) {
    json_body(
        server
            .client
            .get(server.url(path))
            .header("authorization", auth)
            .send()
            .await
            .unwrap(),
    )
    .await
}

/// Register a fresh account and return its email and bearer header.
async fn register(server: &TestServer) -> (String, String) {
    let email = unique_email("user");
    let (status, body) = post(
        server,
        "/auth/register",
        &json!({"email": email, "password": PASSWORD, "first_name": "Ada"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let token = body["data"]["token"].as_str().unwrap();
    (email, format!("Bearer {token}"))
}

// ============================================================================
// No database needed
// ============================================================================

#[tokio::test]
async fn test_profile_without_token_is_unauthorized() {
    let server = offline().await;
    let (status, body) = json_body(
        server
            .client
            .get(server.url("/profile"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let server = offline().await;
    let email = shopfloor_core::Email::parse("late@example.com").unwrap();
    let issued = token_keys()
        .issue_at(
            shopfloor_core::UserId::new(1),
            &email,
            UserRole::Customer,
            chrono::Utc::now() - chrono::Duration::hours(2),
        )
        .unwrap();
    let (status, body) =
        get_with(&server, "/profile", &format!("Bearer {}", issued.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn test_user_listing_requires_admin() {
    let server = offline().await;
    let (status, _) = get_with(&server, "/users", &bearer(3, UserRole::Customer).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get_with(&server, "/users", &bearer(3, UserRole::Staff).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_listing_parameters_are_validated() {
    let server = offline().await;
    let (status, body) =
        get_with(&server, "/users?role=wizard&limit=1000", &bearer(1, UserRole::Admin).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let server = offline().await;
    let (status, body) = post(
        &server,
        "/auth/register",
        &json!({"email": "not-an-email", "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid email"));
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let server = offline().await;
    let (status, body) = post(&server, "/auth/register", &json!({"email": "a@example.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_address_payload_is_validated() {
    let server = offline().await;
    let (status, body) = json_body(
        server
            .client
            .post(server.url("/profile/addresses"))
            .header("authorization", bearer(4, UserRole::Customer).unwrap())
            .json(&json!({"line1": "1 Main St", "city": "", "postal_code": "1", "country": "USA"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        json!(["city is required", "country must be a two-letter ISO 3166-1 code"])
    );
}

// ============================================================================
// Database-backed contract tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_register_login_and_profile() {
    let server = online().await;
    let (email, auth) = register(&server).await;

    let (status, body) = post(
        &server,
        "/auth/login",
        &json!({"email": email.to_uppercase(), "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 3600);
    assert!(body["data"]["user"]["last_login_at"].is_string());
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, profile) = get_with(&server, "/profile", &auth).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["data"]["email"], email);
    assert_eq!(profile["data"]["role"], "customer");

    let (status, updated) = json_body(
        server
            .client
            .put(server.url("/profile"))
            .header("authorization", &auth)
            .json(&json!({"first_name": null, "phone": "+1 555 010 2030"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["data"]["first_name"].is_null());
    assert_eq!(updated["data"]["phone"], "+1 555 010 2030");
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_duplicate_email_is_rejected() {
    let server = online().await;
    let (email, _) = register(&server).await;

    let (status, body) = post(
        &server,
        "/auth/register",
        &json!({"email": email, "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let server = online().await;
    let (email, _) = register(&server).await;

    let (wrong_status, wrong) = post(
        &server,
        "/auth/login",
        &json!({"email": email, "password": "not the password"}),
    )
    .await;
    let (unknown_status, unknown) = post(
        &server,
        "/auth/login",
        &json!({"email": unique_email("nobody"), "password": PASSWORD}),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_change_password_then_deactivate() {
    let server = online().await;
    let (email, auth) = register(&server).await;
    let new_password = "a different passphrase";

    let change = |current: &'static str| {
        server
            .client
            .put(server.url("/profile/password"))
            .header("authorization", &auth)
            .json(&json!({"current_password": current, "new_password": new_password}))
            .send()
    };

    assert_eq!(
        change("wrong guess").await.unwrap().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(change(PASSWORD).await.unwrap().status(), StatusCode::OK);

    let (status, _) = post(
        &server,
        "/auth/login",
        &json!({"email": email, "password": new_password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let deactivated = server
        .client
        .delete(server.url("/profile"))
        .header("authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(deactivated.status(), StatusCode::OK);

    let (status, _) = post(
        &server,
        "/auth/login",
        &json!({"email": email, "password": new_password}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_with(&server, "/profile", &auth).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_addresses_keep_a_single_default() {
    let server = online().await;
    let (_, auth) = register(&server).await;

    let add = |body: Value| {
        let server = &server;
        let auth = &auth;
        async move {
            let (status, body) = json_body(
                server
                    .client
                    .post(server.url("/profile/addresses"))
                    .header("authorization", auth)
                    .json(&body)
                    .send()
                    .await
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["data"].clone()
        }
    };

    let home = add(json!({
        "label": "Home", "line1": "1 Main St", "city": "Springfield",
        "postal_code": "12345", "country": "us"
    }))
    .await;
    assert_eq!(home["is_default"], true);
    assert_eq!(home["country"], "US");

    let office = add(json!({
        "label": "Office", "line1": "2 Side St", "city": "Springfield",
        "postal_code": "12345", "country": "US"
    }))
    .await;
    assert_eq!(office["is_default"], false);

    let office_id = office["id"].as_i64().unwrap();
    let (status, promoted) = json_body(
        server
            .client
            .put(server.url(&format!("/profile/addresses/{office_id}")))
            .header("authorization", &auth)
            .json(&json!({"is_default": true}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["data"]["is_default"], true);

    let (_, listed) = get_with(&server, "/profile/addresses", &auth).await;
    let defaults: Vec<i64> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["is_default"] == true)
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(defaults, vec![office_id]);

    // Someone else's address is indistinguishable from a missing one
    let (_, stranger) = register(&server).await;
    let response = server
        .client
        .delete(server.url(&format!("/profile/addresses/{office_id}")))
        .header("authorization", &stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .client
        .delete(server.url(&format!("/profile/addresses/{office_id}")))
        .header("authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, listed) = get_with(&server, "/profile/addresses", &auth).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_concurrent_first_addresses_pick_one_default() {
    let server = online().await;
    let (_, auth) = register(&server).await;

    let add = |line1: &'static str| {
        let request = server
            .client
            .post(server.url("/profile/addresses"))
            .header("authorization", &auth)
            .json(&json!({
                "line1": line1, "city": "Springfield",
                "postal_code": "12345", "country": "US"
            }));
        async move { request.send().await.unwrap().status() }
    };

    let (a, b, c, d) = tokio::join!(add("1 A St"), add("2 B St"), add("3 C St"), add("4 D St"));
    for status in [a, b, c, d] {
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, listed) = get_with(&server, "/profile/addresses", &auth).await;
    let addresses = listed["data"].as_array().unwrap();
    assert_eq!(addresses.len(), 4);
    assert_eq!(addresses.iter().filter(|a| a["is_default"] == true).count(), 1);
}

#[tokio::test]
#[ignore = "Requires TEST_USERS_DATABASE_URL"]
async fn test_admin_can_list_users() {
    let server = online().await;
    let (email, _) = register(&server).await;

    let (status, body) = get_with(
        &server,
        &format!("/users?search={email}&role=customer"),
        &bearer(1, UserRole::Admin).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["email"], email);
}
