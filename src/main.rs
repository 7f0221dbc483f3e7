//! Roster CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use roster::auth::{CredentialStore, SigningKey, TokenService};
use roster::server::{AppState, RosterServer};
use roster::config::ttl_from_minutes;
use roster::ServerConfig;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            bind,
            seed,
            token_ttl_minutes,
            enforce_capacity,
        } => {
            let config = ServerConfig {
                bind_addr: bind.parse().context("Invalid bind address")?,
                token_secret: cli.secret.map(String::into_bytes),
                token_ttl: ttl_from_minutes(token_ttl_minutes),
                teachers_path: cli.teachers,
                seed_path: seed,
                enforce_capacity,
            };
            serve(config).await
        }
        Commands::Token { username, ttl_minutes } => {
            token(cli.teachers, cli.secret, username, ttl_minutes)
        }
        Commands::Teachers => teachers(cli.teachers),
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let server = RosterServer::new(config, state);

    info!("Starting roster server...");
    server.run(shutdown_signal()).await?;

    info!("Roster server stopped");
    Ok(())
}

fn token(teachers_path: PathBuf, secret: Option<String>, username: String, ttl_minutes: u64) -> Result<()> {
    let secret = secret.context("ROSTER_SECRET or --secret required to issue tokens")?;

    let credentials = CredentialStore::load(&teachers_path)
        .context("Failed to load teacher credentials")?;
    if !credentials.contains(&username) {
        anyhow::bail!("Unknown teacher: {}", username);
    }

    let tokens = TokenService::new(SigningKey::new(secret.into_bytes()), ttl_from_minutes(ttl_minutes));
    let token = tokens.issue(&username);

    println!("{}", token);
    println!();
    println!("Teacher: {}", username);
    println!("Expires: {} (unix)", token.expires_at());

    Ok(())
}

fn teachers(teachers_path: PathBuf) -> Result<()> {
    let credentials = CredentialStore::load(&teachers_path)
        .context("Failed to load teacher credentials")?;

    println!("Teachers ({}):", credentials.len());
    for username in credentials.usernames() {
        println!("  {}", username);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
