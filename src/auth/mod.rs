//! Authentication and authorization
//!
//! - Credentials: teacher username → SHA-256 password digest, loaded once
//! - Tokens: stateless HS256 bearer tokens naming the teacher, 30 minute TTL
//!
//! A [`Teacher`] value can only be obtained from [`TokenService`], which is
//! what protected operations take as their actor.

mod credentials;
mod tokens;

pub use credentials::{CredentialError, CredentialStore, DEFAULT_PASSWORD, DEFAULT_USERNAME};
pub use tokens::{
    unix_now, AccessToken, AuthError, Claims, SigningKey, Teacher, TokenError, TokenService,
    DEFAULT_TOKEN_TTL, TOKEN_TYPE,
};

/// Verify a login and issue a token on success
pub fn login(
    credentials: &CredentialStore,
    tokens: &TokenService,
    username: &str,
    password: &str,
) -> Result<AccessToken, AuthError> {
    if credentials.verify(username, password) {
        tracing::info!(username, "Teacher logged in");
        Ok(tokens.issue(username))
    } else {
        tracing::warn!(username, "Rejected login attempt");
        Err(AuthError::InvalidCredentials)
    }
}
