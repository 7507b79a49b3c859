//! Handler tests for the auth API, driven through the router with the
//! in-process identity provider.

use crate::{
    api::handlers::test_support::{app, send, services, signed_up},
    chat::Assistant,
};
use axum::http::StatusCode;
use serde_json::json;

fn credentials(email: &str, password: &str) -> serde_json::Value {
    json!({ "email": email, "password": password })
}

#[tokio::test]
async fn register_returns_bearer_token_pair() {
    let app = app(services(Assistant::unconfigured()));
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "Asha@Example.com",
            "password": "secret-pass",
            "name": "Asha Verma",
            "username": "asha",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["user"]["name"], "Asha Verma");
    assert_eq!(body["user"]["username"], "asha");
}

#[tokio::test]
async fn register_twice_is_rejected() {
    let app = app(services(Assistant::unconfigured()));
    signed_up(&app, "asha@example.com").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "asha@example.com",
            "password": "another-pass",
            "name": "Asha",
            "username": "asha2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn register_with_bad_input_fails() {
    let app = app(services(Assistant::unconfigured()));
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "not-an-email",
            "password": "secret-pass",
            "name": "Asha",
            "username": "asha",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .is_some_and(|detail| detail.starts_with("Registration failed")));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "asha@example.com",
            "password": "123",
            "name": "Asha",
            "username": "asha",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .is_some_and(|detail| detail.starts_with("Registration failed")));
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = app(services(Assistant::unconfigured()));
    signed_up(&app, "asha@example.com").await;

    for body in [
        credentials("asha@example.com", "wrong-pass"),
        credentials("ghost@example.com", "secret-pass"),
    ] {
        let (status, body) = send(&app, "POST", "/api/v1/auth/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Incorrect email or password");
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(credentials("asha@example.com", "secret-pass")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "asha@example.com");
}

#[tokio::test]
async fn me_requires_a_valid_bearer_token() {
    let app = app(services(Assistant::unconfigured()));
    let token = signed_up(&app, "asha@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "asha@example.com");
    assert_eq!(body["username"], "asha");
}

#[tokio::test]
async fn session_is_user_or_no_content() {
    let app = app(services(Assistant::unconfigured()));
    let token = signed_up(&app, "asha@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "asha@example.com");

    let (status, _) = send(&app, "GET", "/api/v1/auth/session", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/api/v1/auth/session", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn refresh_accepts_body_or_query() {
    let app = app(services(Assistant::unconfigured()));
    let (_, registered) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "asha@example.com",
            "password": "secret-pass",
            "name": "Asha",
            "username": "asha",
        })),
    )
    .await;
    let refresh_token = registered["refresh_token"].as_str().unwrap_or_default();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    // Rotated: the old token is spent, the new one works via the query string.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let rotated = body["refresh_token"].as_str().unwrap_or_default();
    let uri = format!("/api/v1/auth/refresh?refresh_token={rotated}");
    let (status, _) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/v1/auth/refresh", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "refresh_token is required");
}

#[tokio::test]
async fn logout_always_succeeds_and_revokes() {
    let app = app(services(Assistant::unconfigured()));
    let token = signed_up(&app, "asha@example.com").await;

    let (status, body) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/api/v1/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = app(services(Assistant::unconfigured()));
    signed_up(&app, "asha@example.com").await;

    let (known_status, known) = send(
        &app,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "asha@example.com" })),
    )
    .await;
    let (unknown_status, unknown) = send(
        &app,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "ghost@example.com" })),
    )
    .await;
    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn reset_password_with_bearer() {
    let app = app(services(Assistant::unconfigured()));
    let token = signed_up(&app, "asha@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "new_password": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/reset-password",
        Some(&token),
        Some(json!({ "new_password": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(credentials("asha@example.com", "fresh-pass")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
