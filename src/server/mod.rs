//! HTTP server
//!
//! Wires the credential store, token service and enrollment service into an
//! axum router and serves it until a shutdown signal arrives.

mod auth;
mod error;
mod middleware;
mod router;

pub use auth::{bearer_token, MaybeTeacher, RequireTeacher};
pub use error::{ApiError, ErrorBody};
pub use router::{create_router, LoginRequest, LoginResponse, VerifyResponse};

use crate::auth::{CredentialStore, TokenService};
use crate::config::ServerConfig;
use crate::enrollment::EnrollmentService;
use crate::roster::{default_roster, load_seed, RosterStore};

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub enrollment: EnrollmentService,
}

impl AppState {
    pub fn new(credentials: CredentialStore, tokens: TokenService, enrollment: EnrollmentService) -> Self {
        Self {
            credentials: Arc::new(credentials),
            tokens: Arc::new(tokens),
            enrollment,
        }
    }

    /// Load credentials and seed roster named by `config`
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let credentials = CredentialStore::load(&config.teachers_path)
            .context("Failed to load teacher credentials")?;

        let seed = match &config.seed_path {
            Some(path) => load_seed(path).context("Failed to load seed roster")?,
            None => default_roster(),
        };
        let roster = Arc::new(RosterStore::new(seed).context("Invalid seed roster")?);

        let tokens = TokenService::new(config.signing_key(), config.token_ttl);
        let enrollment = EnrollmentService::new(roster).with_capacity_enforcement(config.enforce_capacity);

        Ok(Self::new(credentials, tokens, enrollment))
    }
}

/// The roster HTTP server
pub struct RosterServer {
    config: ServerConfig,
    state: AppState,
}

impl RosterServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;

        info!(
            addr = %self.config.bind_addr,
            activities = self.state.enrollment.roster().len(),
            teachers = self.state.credentials.len(),
            enforce_capacity = self.state.enrollment.enforces_capacity(),
            "Roster server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        Ok(())
    }
}
