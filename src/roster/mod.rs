//! In-memory activity roster
//!
//! The set of activities is fixed when the store is built; only participant
//! lists change afterwards. Each activity sits behind its own mutex so a
//! check-then-modify on one activity is atomic without serializing the rest.

mod seed;

pub use seed::{default_roster, load_seed};

use parking_lot::Mutex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Errors building a roster from seed data
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("activity name must not be empty")]
    EmptyName,

    #[error("duplicate activity: {0}")]
    DuplicateActivity(String),

    #[error("activity {0} must allow at least one participant")]
    ZeroCapacity(String),
}

/// A single extracurricular activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub description: String,
    pub schedule: String,
    pub max_participants: u32,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Activity {
    pub fn new(description: impl Into<String>, schedule: impl Into<String>, max_participants: u32) -> Self {
        Self {
            description: description.into(),
            schedule: schedule.into(),
            max_participants,
            participants: Vec::new(),
        }
    }

    /// Builder-style participant list, used for seeding
    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_enrolled(&self, email: &str) -> bool {
        self.participants.iter().any(|p| p == email)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }

    pub fn spots_left(&self) -> usize {
        (self.max_participants as usize).saturating_sub(self.participants.len())
    }

    /// Add a participant. Returns false if already present.
    pub(crate) fn add(&mut self, email: &str) -> bool {
        if self.is_enrolled(email) {
            return false;
        }
        self.participants.push(email.to_string());
        true
    }

    /// Remove a participant. Returns false if not present.
    pub(crate) fn remove(&mut self, email: &str) -> bool {
        match self.participants.iter().position(|p| p == email) {
            Some(idx) => {
                self.participants.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Point-in-time copy of the roster, in seed order
///
/// Serializes as a JSON object keyed by activity name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSnapshot {
    activities: Vec<(String, Activity)>,
}

impl RosterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, activity: Activity) {
        self.activities.push((name.into(), activity));
    }

    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.activities
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Activity)> {
        self.activities.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl IntoIterator for RosterSnapshot {
    type Item = (String, Activity);
    type IntoIter = std::vec::IntoIter<(String, Activity)>;

    fn into_iter(self) -> Self::IntoIter {
        self.activities.into_iter()
    }
}

impl Serialize for RosterSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.activities.len()))?;
        for (name, activity) in &self.activities {
            map.serialize_entry(name, activity)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RosterSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = RosterSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of activity name to activity")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut snapshot = RosterSnapshot::new();
                while let Some((name, activity)) = access.next_entry::<String, Activity>()? {
                    snapshot.push(name, activity);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Shared roster of activities, one lock per activity
pub struct RosterStore {
    index: HashMap<String, usize>,
    records: Vec<(String, Mutex<Activity>)>,
}

impl RosterStore {
    /// Build a store from seed data.
    ///
    /// Rejects empty or duplicate names and zero capacities. Duplicate
    /// participants within an activity are collapsed.
    pub fn new(seed: RosterSnapshot) -> Result<Self, SeedError> {
        let mut index = HashMap::with_capacity(seed.len());
        let mut records = Vec::with_capacity(seed.len());

        for (name, mut activity) in seed {
            if name.is_empty() {
                return Err(SeedError::EmptyName);
            }
            if index.contains_key(&name) {
                return Err(SeedError::DuplicateActivity(name));
            }
            if activity.max_participants == 0 {
                return Err(SeedError::ZeroCapacity(name));
            }

            let before = activity.participants.len();
            let mut seen = HashSet::with_capacity(before);
            activity.participants.retain(|p| seen.insert(p.clone()));
            if activity.participants.len() != before {
                warn!(activity = %name, "Dropped duplicate participants from seed data");
            }

            index.insert(name.clone(), records.len());
            records.push((name, Mutex::new(activity)));
        }

        Ok(Self { index, records })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Copy of a single activity
    pub fn get(&self, name: &str) -> Option<Activity> {
        self.index
            .get(name)
            .map(|&idx| self.records[idx].1.lock().clone())
    }

    /// Activity names in seed order
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Run `f` with exclusive access to one activity.
    ///
    /// Returns `None` if the activity does not exist. The lock is held for the
    /// whole closure, so checks and mutation inside it are atomic.
    pub fn with_activity_mut<R>(&self, name: &str, f: impl FnOnce(&mut Activity) -> R) -> Option<R> {
        let &idx = self.index.get(name)?;
        let mut activity = self.records[idx].1.lock();
        Some(f(&mut *activity))
    }

    /// Copy of every activity. Each activity is read under its own lock, so
    /// the result is consistent per activity but not across activities.
    pub fn snapshot(&self) -> RosterSnapshot {
        let mut snapshot = RosterSnapshot::new();
        for (name, activity) in &self.records {
            snapshot.push(name.clone(), activity.lock().clone());
        }
        snapshot
    }
}

impl fmt::Debug for RosterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterStore")
            .field("activities", &self.names())
            .finish()
    }
}
