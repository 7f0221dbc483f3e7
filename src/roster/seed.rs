//! Seed data for the roster

use super::{Activity, RosterSnapshot, SeedError};
use std::path::Path;
use tracing::info;

/// Built-in activities used when no seed file is configured
pub fn default_roster() -> RosterSnapshot {
    let mut roster = RosterSnapshot::new();

    roster.push(
        "Chess Club",
        Activity::new(
            "Learn strategies and compete in chess tournaments",
            "Fridays, 3:30 PM - 5:00 PM",
            12,
        )
        .with_participants(["michael@mergington.edu", "daniel@mergington.edu"]),
    );
    roster.push(
        "Programming Class",
        Activity::new(
            "Learn programming fundamentals and build software projects",
            "Tuesdays and Thursdays, 3:30 PM - 4:30 PM",
            20,
        )
        .with_participants(["emma@mergington.edu", "sophia@mergington.edu"]),
    );
    roster.push(
        "Gym Class",
        Activity::new(
            "Physical education and sports activities",
            "Mondays, Wednesdays, Fridays, 2:00 PM - 3:00 PM",
            30,
        )
        .with_participants(["john@mergington.edu", "olivia@mergington.edu"]),
    );
    roster.push(
        "Soccer Team",
        Activity::new(
            "Join the school soccer team and compete in matches",
            "Tuesdays and Thursdays, 4:00 PM - 5:30 PM",
            22,
        )
        .with_participants(["liam@mergington.edu", "noah@mergington.edu"]),
    );
    roster.push(
        "Basketball Team",
        Activity::new(
            "Practice and play basketball with the school team",
            "Wednesdays and Fridays, 3:30 PM - 5:00 PM",
            15,
        )
        .with_participants(["ava@mergington.edu", "mia@mergington.edu"]),
    );
    roster.push(
        "Art Club",
        Activity::new(
            "Explore your creativity through painting and drawing",
            "Thursdays, 3:30 PM - 5:00 PM",
            15,
        )
        .with_participants(["amelia@mergington.edu", "harper@mergington.edu"]),
    );
    roster.push(
        "Drama Club",
        Activity::new(
            "Act, direct, and produce plays and performances",
            "Mondays and Wednesdays, 4:00 PM - 5:30 PM",
            20,
        )
        .with_participants(["ella@mergington.edu", "scarlett@mergington.edu"]),
    );
    roster.push(
        "Math Club",
        Activity::new(
            "Solve challenging problems and participate in math competitions",
            "Tuesdays, 3:30 PM - 4:30 PM",
            10,
        )
        .with_participants(["james@mergington.edu", "benjamin@mergington.edu"]),
    );
    roster.push(
        "Debate Team",
        Activity::new(
            "Develop public speaking and argumentation skills",
            "Fridays, 4:00 PM - 5:30 PM",
            12,
        )
        .with_participants(["charlotte@mergington.edu", "henry@mergington.edu"]),
    );

    roster
}

/// Read a seed file shaped like the `GET /activities` response
pub fn load_seed(path: impl AsRef<Path>) -> Result<RosterSnapshot, SeedError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let roster: RosterSnapshot = serde_json::from_str(&contents)?;
    info!(path = %path.display(), activities = roster.len(), "Loaded seed roster");
    Ok(roster)
}
