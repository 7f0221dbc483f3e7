//! Bearer token extractors

use crate::auth::{AuthError, Teacher};
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;

/// Teacher named by the bearer token, if a valid one was sent
pub struct MaybeTeacher(pub Option<Teacher>);

/// Teacher named by the bearer token; rejects with 401 otherwise
pub struct RequireTeacher(pub Teacher);

/// Token from `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for MaybeTeacher {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let teacher = bearer_token(&parts.headers).and_then(|t| state.tokens.validate(t));
        Ok(MaybeTeacher(teacher))
    }
}

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .tokens
            .require_identity(bearer_token(&parts.headers))
            .map(RequireTeacher)
            .map_err(|e: AuthError| e.into())
    }
}
