//! Server configuration

use crate::auth::{SigningKey, DEFAULT_TOKEN_TTL};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default bind address
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Default credential file, relative to the working directory
pub const DEFAULT_TEACHERS_PATH: &str = "teachers.txt";

/// Everything the server needs at startup
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Secret for signing bearer tokens. Generated per process when unset.
    pub token_secret: Option<Vec<u8>>,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Teacher credential file
    pub teachers_path: PathBuf,
    /// JSON roster to load instead of the built-in activities
    pub seed_path: Option<PathBuf>,
    /// Reject signups once an activity is at capacity
    pub enforce_capacity: bool,
}

impl ServerConfig {
    /// Signing key from the configured secret, or a random one
    pub fn signing_key(&self) -> SigningKey {
        match &self.token_secret {
            Some(secret) => SigningKey::new(secret.clone()),
            None => {
                warn!("No token secret configured, generating one; tokens will not survive a restart");
                SigningKey::generate()
            }
        }
    }
}

/// Token lifetime from a minute count given on the command line
pub fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            token_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            teachers_path: PathBuf::from(DEFAULT_TEACHERS_PATH),
            seed_path: None,
            enforce_capacity: false,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl", &self.token_ttl)
            .field("teachers_path", &self.teachers_path)
            .field("seed_path", &self.seed_path)
            .field("enforce_capacity", &self.enforce_capacity)
            .finish()
    }
}
