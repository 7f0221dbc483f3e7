//! Signup and unregister with roster invariants
//!
//! Each (activity, email) pair is either enrolled or not. Transitions run
//! under the activity's lock so the existence, duplicate and capacity checks
//! and the mutation happen as one step.

use crate::auth::Teacher;
use crate::roster::{RosterSnapshot, RosterStore};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    #[error("Activity not found")]
    NotFound,

    #[error("Student is already signed up")]
    AlreadySignedUp,

    #[error("Student is not signed up for this activity")]
    NotSignedUp,

    #[error("Activity is full")]
    ActivityFull,

    #[error("Email must not be empty")]
    InvalidEmail,
}

impl EnrollmentError {
    /// True for failures caused by the pair's current enrollment state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EnrollmentError::AlreadySignedUp | EnrollmentError::NotSignedUp | EnrollmentError::ActivityFull
        )
    }
}

/// Result of a successful transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub message: String,
}

enum Outcome {
    Done,
    Rejected(EnrollmentError),
}

/// Applies enrollment changes to a shared roster
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    roster: Arc<RosterStore>,
    enforce_capacity: bool,
}

impl EnrollmentService {
    pub fn new(roster: Arc<RosterStore>) -> Self {
        Self {
            roster,
            enforce_capacity: false,
        }
    }

    /// Reject signups once an activity reaches `max_participants`.
    /// Off by default: the roster accepts signups past capacity.
    pub fn with_capacity_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_capacity = enforce;
        self
    }

    pub fn enforces_capacity(&self) -> bool {
        self.enforce_capacity
    }

    pub fn roster(&self) -> &Arc<RosterStore> {
        &self.roster
    }

    /// Full roster, no authentication needed
    pub fn list_activities(&self) -> RosterSnapshot {
        self.roster.snapshot()
    }

    pub fn signup(
        &self,
        activity_name: &str,
        email: &str,
        actor: &Teacher,
    ) -> Result<Confirmation, EnrollmentError> {
        let enforce_capacity = self.enforce_capacity;
        let outcome = self
            .roster
            .with_activity_mut(activity_name, |activity| {
                if let Err(e) = validate_email(email) {
                    return Outcome::Rejected(e);
                }
                if activity.is_enrolled(email) {
                    return Outcome::Rejected(EnrollmentError::AlreadySignedUp);
                }
                if enforce_capacity && activity.is_full() {
                    return Outcome::Rejected(EnrollmentError::ActivityFull);
                }
                activity.add(email);
                Outcome::Done
            })
            .ok_or(EnrollmentError::NotFound)?;

        match outcome {
            Outcome::Done => {
                info!(teacher = %actor, activity = activity_name, email, "Signed up student");
                Ok(Confirmation {
                    message: format!("Teacher {} signed up {} for {}", actor, email, activity_name),
                })
            }
            Outcome::Rejected(e) => {
                debug!(teacher = %actor, activity = activity_name, email, error = %e, "Signup rejected");
                Err(e)
            }
        }
    }

    pub fn unregister(
        &self,
        activity_name: &str,
        email: &str,
        actor: &Teacher,
    ) -> Result<Confirmation, EnrollmentError> {
        let removed = self
            .roster
            .with_activity_mut(activity_name, |activity| {
                validate_email(email).map(|()| activity.remove(email))
            })
            .ok_or(EnrollmentError::NotFound)??;

        if !removed {
            debug!(teacher = %actor, activity = activity_name, email, "Unregister rejected, not enrolled");
            return Err(EnrollmentError::NotSignedUp);
        }

        info!(teacher = %actor, activity = activity_name, email, "Unregistered student");
        Ok(Confirmation {
            message: format!("Teacher {} unregistered {} from {}", actor, email, activity_name),
        })
    }
}

fn validate_email(email: &str) -> Result<(), EnrollmentError> {
    if email.trim().is_empty() {
        return Err(EnrollmentError::InvalidEmail);
    }
    Ok(())
}
