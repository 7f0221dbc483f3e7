//! Bearer token issuance and validation
//!
//! Tokens are stateless HS256 JWTs: `header.claims.signature`, each segment
//! base64url without padding. Claims carry the teacher username (`sub`), the
//! issue time (`iat`) and the absolute expiry (`exp`) in Unix seconds. Nothing
//! is stored server-side, so a token stays valid until it expires.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Value reported as `token_type` on login
pub const TOKEN_TYPE: &str = "bearer";

/// Default lifetime of an issued token
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

const ALGORITHM: &str = "HS256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token format")]
    InvalidFormat,

    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token decode error: {0}")]
    DecodeError(String),

    #[error("token expired")]
    Expired,

    #[error("token has no subject")]
    MissingSubject,
}

/// Authentication failures surfaced to callers
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, malformed or expired bearer token on a protected operation
    #[error("Teacher authentication required")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// An authenticated teacher identity
///
/// Only the token service hands these out, so holding one proves the caller
/// presented a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Teacher(String);

impl Teacher {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide HMAC secret
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl SigningKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Random 32-byte key. Tokens signed with it die with the process.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        Self::new(bytes.to_vec())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: String,
    claims: Claims,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn into_string(self) -> String {
        self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Expiry as Unix seconds
    pub fn expires_at(&self) -> u64 {
        self.claims.exp
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct TokenService {
    key: SigningKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` valid from now until now + TTL
    pub fn issue(&self, subject: &str) -> AccessToken {
        self.issue_at(subject, unix_now())
    }

    /// Issue a token as if the current time were `now` (Unix seconds)
    pub fn issue_at(&self, subject: &str, now: u64) -> AccessToken {
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };

        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let header_json = serde_json::to_vec(&header).expect("serialize header");
        let claims_json = serde_json::to_vec(&claims).expect("serialize claims");

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.key.mac();
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        let token = format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature));

        debug!(subject, expires_at = claims.exp, "Issued access token");
        AccessToken { token, claims }
    }

    /// Decode and verify a token at time `now`, reporting why it failed
    pub fn decode_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(TokenError::InvalidFormat),
            };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| TokenError::DecodeError(e.to_string()))?;

        // Signature covers the raw segments, so verify before trusting claims
        let mut mac = self.key.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        match claims.sub.as_deref() {
            Some(sub) if !sub.is_empty() => Ok(claims),
            _ => Err(TokenError::MissingSubject),
        }
    }

    /// Resolve a token to a teacher at time `now`; any failure is `None`
    pub fn validate_at(&self, token: &str, now: u64) -> Option<Teacher> {
        match self.decode_at(token, now) {
            Ok(claims) => claims.sub.map(Teacher::new),
            Err(e) => {
                debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }

    pub fn validate(&self, token: &str) -> Option<Teacher> {
        self.validate_at(token, unix_now())
    }

    /// Like [`validate`](Self::validate) but a missing or invalid token is an error
    pub fn require_identity(&self, token: Option<&str>) -> Result<Teacher, AuthError> {
        token
            .and_then(|t| self.validate(t))
            .ok_or(AuthError::Unauthenticated)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::DecodeError(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::DecodeError(e.to_string()))
}

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
