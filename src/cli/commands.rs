//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Extracurricular activity roster with teacher authentication", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Token signing secret
    #[arg(long, env = "ROSTER_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Teacher credential file (`username:password` per line)
    #[arg(long, env = "ROSTER_TEACHERS", default_value = "teachers.txt", global = true)]
    pub teachers: PathBuf,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8000", env = "ROSTER_BIND")]
        bind: String,

        /// JSON roster to load instead of the built-in activities
        #[arg(long, env = "ROSTER_SEED")]
        seed: Option<PathBuf>,

        /// Token lifetime in minutes
        #[arg(long, default_value_t = 30, env = "ROSTER_TOKEN_TTL_MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
        token_ttl_minutes: u64,

        /// Reject signups once an activity reaches its participant limit
        #[arg(long, env = "ROSTER_ENFORCE_CAPACITY")]
        enforce_capacity: bool,
    },

    /// Issue a bearer token for a teacher without logging in
    ///
    /// Needs the same secret as the running server.
    ///
    /// Examples:
    ///   roster token admin
    ///   roster token mchen --ttl-minutes 5
    Token {
        /// Teacher username (must exist in the credential file)
        username: String,

        /// Token lifetime in minutes
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        ttl_minutes: u64,
    },

    /// List teachers loaded from the credential file
    Teachers,
}
