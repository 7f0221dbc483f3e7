//! HTTP routes

use crate::auth::{self, TOKEN_TYPE};
use crate::enrollment::Confirmation;
use crate::roster::RosterSnapshot;
use crate::server::auth::{MaybeTeacher, RequireTeacher};
use crate::server::error::ApiError;
use crate::server::middleware::logging_middleware;
use crate::server::AppState;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Build the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/verify-auth", get(verify_auth))
        .route("/activities", get(list_activities))
        .route("/activities/{activity_name}/signup", post(signup))
        .route("/activities/{activity_name}/unregister", delete(unregister))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let token = auth::login(&state.credentials, &state.tokens, &request.username, &request.password)?;

    Ok(Json(LoginResponse {
        access_token: token.into_string(),
        token_type: TOKEN_TYPE.to_string(),
    }))
}

async fn verify_auth(MaybeTeacher(teacher): MaybeTeacher) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: teacher.is_some(),
        teacher: teacher.map(|t| t.username().to_string()),
    })
}

async fn list_activities(State(state): State<AppState>) -> Json<RosterSnapshot> {
    Json(state.enrollment.list_activities())
}

// Teacher extractor comes first so unauthenticated requests fail before any
// other validation.
async fn signup(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<Confirmation>, ApiError> {
    let Path(activity_name) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Query(EmailQuery { email }) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let confirmation = state.enrollment.signup(&activity_name, &email, &teacher)?;
    Ok(Json(confirmation))
}

async fn unregister(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<Confirmation>, ApiError> {
    let Path(activity_name) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Query(EmailQuery { email }) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let confirmation = state.enrollment.unregister(&activity_name, &email, &teacher)?;
    Ok(Json(confirmation))
}
