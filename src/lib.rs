//! Roster - extracurricular activity enrollment behind teacher authentication
//!
//! Teachers log in with a username and password to receive a short-lived
//! bearer token, then use it to sign students up for activities or remove
//! them. Anyone may read the roster.

pub mod auth;
pub mod config;
pub mod enrollment;
pub mod roster;
pub mod server;

pub use auth::{CredentialStore, Teacher, TokenService};
pub use config::ServerConfig;
pub use enrollment::{EnrollmentError, EnrollmentService};
pub use roster::{Activity, RosterSnapshot, RosterStore};
pub use server::{AppState, RosterServer};
