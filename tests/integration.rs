//! Integration tests for the roster HTTP API
//!
//! The router is driven in-process; no socket is bound.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use roster::auth::{unix_now, CredentialStore, SigningKey, TokenService, DEFAULT_TOKEN_TTL};
use roster::enrollment::EnrollmentService;
use roster::roster::{default_roster, RosterStore};
use roster::server::{create_router, AppState, LoginResponse, VerifyResponse};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const TEST_SECRET: &[u8] = b"test-secret-for-integration-tests";

fn state() -> AppState {
    let credentials = CredentialStore::parse("admin:school123\nmchen:chess456\n");
    let tokens = TokenService::new(SigningKey::new(TEST_SECRET), DEFAULT_TOKEN_TTL);
    let roster = Arc::new(RosterStore::new(default_roster()).unwrap());
    AppState::new(credentials, tokens, EnrollmentService::new(roster))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, challenge, body)
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

fn mutation(method: &str, activity: &str, action: &str, email: &str, token: Option<&str>) -> Request<Body> {
    let uri = format!(
        "/activities/{}/{}?email={}",
        activity.replace(' ', "%20"),
        action,
        email.replace('@', "%40")
    );
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn signup(activity: &str, email: &str, token: Option<&str>) -> Request<Body> {
    mutation("POST", activity, "signup", email, token)
}

fn unregister(activity: &str, email: &str, token: Option<&str>) -> Request<Body> {
    mutation("DELETE", activity, "unregister", email, token)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, _, body) = send(app, login_request(username, password)).await;
    assert_eq!(status, StatusCode::OK);
    let response: LoginResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.token_type, "bearer");
    response.access_token
}

async fn participants(app: &Router, activity: &str) -> Vec<String> {
    let (status, _, body) = send(app, get("/activities", None)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body[activity]["participants"].clone()).unwrap()
}

#[tokio::test]
async fn test_login_then_verify_for_every_teacher() {
    let app = create_router(state());

    for (username, password) in [("admin", "school123"), ("mchen", "chess456")] {
        let token = login(&app, username, password).await;

        let (status, _, body) = send(&app, get("/verify-auth", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        let verify: VerifyResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            verify,
            VerifyResponse {
                authenticated: true,
                teacher: Some(username.to_string()),
            }
        );
    }
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = create_router(state());

    let (status, challenge, body) = send(&app, login_request("admin", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(challenge.is_none());
    assert_eq!(body["detail"], "Invalid username or password");

    let (status, _, _) = send(&app, login_request("nobody", "school123")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = create_router(state());

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"admin"}"#))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_verify_auth_without_valid_token() {
    let app = create_router(state());

    let (status, _, body) = send(&app, get("/verify-auth", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "authenticated": false }));

    let (_, _, body) = send(&app, get("/verify-auth", Some("not.a.token"))).await;
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_list_activities_is_public() {
    let app = create_router(state());

    let (status, _, body) = send(&app, get("/activities", None)).await;
    assert_eq!(status, StatusCode::OK);

    let activities = body.as_object().unwrap();
    assert_eq!(activities.len(), 9);
    assert_eq!(body["Chess Club"]["max_participants"], 12);
    assert_eq!(body["Chess Club"]["schedule"], "Fridays, 3:30 PM - 5:00 PM");
}

#[tokio::test]
async fn test_chess_club_signup_scenario() {
    let app = create_router(state());
    let token = login(&app, "admin", "school123").await;

    assert_eq!(
        participants(&app, "Chess Club").await,
        vec!["michael@mergington.edu", "daniel@mergington.edu"]
    );

    let (status, _, body) = send(&app, signup("Chess Club", "new@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Teacher admin signed up new@x.edu for Chess Club");
    assert_eq!(participants(&app, "Chess Club").await.len(), 3);

    let (status, _, body) = send(&app, signup("Chess Club", "new@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Student is already signed up");
    assert_eq!(participants(&app, "Chess Club").await.len(), 3);
}

#[tokio::test]
async fn test_unregister_after_signup() {
    let app = create_router(state());
    let token = login(&app, "mchen", "chess456").await;

    send(&app, signup("Art Club", "pat@x.edu", Some(&token))).await;
    assert!(participants(&app, "Art Club").await.contains(&"pat@x.edu".to_string()));

    let (status, _, body) = send(&app, unregister("Art Club", "pat@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Teacher mchen unregistered pat@x.edu from Art Club");
    assert!(!participants(&app, "Art Club").await.contains(&"pat@x.edu".to_string()));

    let (status, _, body) = send(&app, unregister("Art Club", "pat@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Student is not signed up for this activity");
}

#[tokio::test]
async fn test_unknown_activity_is_not_found() {
    let app = create_router(state());
    let token = login(&app, "admin", "school123").await;

    let (status, _, body) = send(&app, signup("Unknown Club", "x@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Activity not found");

    let (status, _, _) = send(&app, unregister("Unknown Club", "x@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unauthenticated_mutations_rejected_without_change() {
    let app = create_router(state());
    let before = send(&app, get("/activities", None)).await.2;

    let forged = TokenService::new(SigningKey::new(b"other-secret".to_vec()), DEFAULT_TOKEN_TTL)
        .issue("admin")
        .into_string();

    for token in [None, Some("garbage"), Some(forged.as_str())] {
        let (status, challenge, body) = send(&app, signup("Chess Club", "x@x.edu", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(challenge.as_deref(), Some("Bearer"));
        assert_eq!(body["detail"], "Teacher authentication required");

        let (status, _, _) =
            send(&app, unregister("Chess Club", "michael@mergington.edu", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Authentication is checked before the activity lookup
        let (status, _, _) = send(&app, signup("Unknown Club", "x@x.edu", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let after = send(&app, get("/activities", None)).await.2;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let state = state();
    let ttl = state.tokens.ttl().as_secs();
    let expired = state
        .tokens
        .issue_at("admin", unix_now() - ttl - 1)
        .into_string();
    let app = create_router(state);

    let (status, _, _) = send(&app, signup("Chess Club", "late@x.edu", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, _, body) = send(&app, get("/verify-auth", Some(&expired))).await;
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_missing_email_is_bad_request() {
    let app = create_router(state());
    let token = login(&app, "admin", "school123").await;

    let request = Request::builder()
        .method("POST")
        .uri("/activities/Chess%20Club/signup")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, _, body) = send(&app, signup("Chess Club", "", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email must not be empty");
}

#[tokio::test]
async fn test_undecodable_activity_name_is_json_bad_request() {
    let app = create_router(state());
    let token = login(&app, "admin", "school123").await;

    for method in ["POST", "DELETE"] {
        let action = if method == "POST" { "signup" } else { "unregister" };
        let request = Request::builder()
            .method(method)
            .uri(format!("/activities/%FF/{}?email=a%40b", action))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string(), "expected JSON detail, got {}", body);
    }
}

#[tokio::test]
async fn test_capacity_enforcement_over_http() {
    let credentials = CredentialStore::with_default();
    let tokens = TokenService::new(SigningKey::new(TEST_SECRET), DEFAULT_TOKEN_TTL);
    let roster = Arc::new(RosterStore::new(default_roster()).unwrap());
    let enrollment = EnrollmentService::new(roster).with_capacity_enforcement(true);
    let app = create_router(AppState::new(credentials, tokens, enrollment));
    let token = login(&app, "admin", "school123").await;

    // Math Club holds 10 and starts with 2
    for i in 0..8 {
        let (status, _, _) = send(&app, signup("Math Club", &format!("s{}@x.edu", i), Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = send(&app, signup("Math Club", "late@x.edu", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Activity is full");
    assert_eq!(participants(&app, "Math Club").await.len(), 10);
}

#[tokio::test]
async fn test_health() {
    let app = create_router(state());
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
