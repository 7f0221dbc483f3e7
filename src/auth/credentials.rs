//! Teacher credential store
//!
//! Source format is one `username:password` pair per line. Blank lines and
//! lines starting with `#` are ignored. Passwords are hashed with SHA-256 at
//! load time and the plaintext is dropped.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Username installed when no credential source exists
pub const DEFAULT_USERNAME: &str = "admin";
/// Password for [`DEFAULT_USERNAME`]
pub const DEFAULT_PASSWORD: &str = "school123";

type PasswordHash = [u8; 32];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credential source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Immutable mapping of teacher username to password digest
#[derive(Clone)]
pub struct CredentialStore {
    teachers: HashMap<String, PasswordHash>,
}

impl CredentialStore {
    /// Load credentials from a file, falling back to the built-in default
    /// teacher when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let store = Self::parse(&contents);
                info!(path = %path.display(), teachers = store.len(), "Loaded teacher credentials");
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    username = DEFAULT_USERNAME,
                    "Credential file not found, using default teacher"
                );
                Ok(Self::with_default())
            }
            Err(e) => Err(CredentialError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Parse credential lines. Malformed lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut teachers = HashMap::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once(':') {
                Some((username, password)) if !username.is_empty() => {
                    if teachers.insert(username.to_string(), hash_password(password)).is_some() {
                        debug!(line = idx + 1, username, "Duplicate teacher entry replaces earlier one");
                    }
                }
                _ => {
                    warn!(line = idx + 1, "Skipping malformed credential line");
                }
            }
        }

        Self { teachers }
    }

    /// Store holding only the built-in default teacher
    pub fn with_default() -> Self {
        let mut teachers = HashMap::new();
        teachers.insert(DEFAULT_USERNAME.to_string(), hash_password(DEFAULT_PASSWORD));
        Self { teachers }
    }

    /// Check a username/password pair against the stored digest
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.teachers.get(username) {
            Some(stored) => constant_time_eq(stored, &hash_password(password)),
            None => false,
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.teachers.contains_key(username)
    }

    /// Known usernames, sorted
    pub fn usernames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.teachers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.teachers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teachers.is_empty()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("teachers", &self.usernames())
            .finish()
    }
}

fn hash_password(password: &str) -> PasswordHash {
    Sha256::digest(password.as_bytes()).into()
}

fn constant_time_eq(a: &PasswordHash, b: &PasswordHash) -> bool {
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
