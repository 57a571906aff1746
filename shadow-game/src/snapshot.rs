//! The single persisted record and the stores that hold it.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::SnapshotStore;
use crate::diary::DiaryLog;
use crate::history::GameHistory;
use crate::progression::CompanionState;

/// User-facing toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound_enabled: bool,
    pub festival_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            festival_mode: false,
        }
    }
}

/// Whoever is signed in. Nothing here is ever verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
    pub joined_at: DateTime<Utc>,
}

/// Everything that survives a restart. Missing fields take their defaults
/// so older snapshots keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub companion: CompanionState,
    pub diary: DiaryLog,
    pub history: GameHistory,
    pub settings: Settings,
    pub user: Option<UserProfile>,
    pub last_daily_visit: Option<NaiveDate>,
}

impl Snapshot {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode a stored payload, treating anything unreadable as "no save".
    #[must_use]
    pub fn decode_or_default(payload: Option<&str>) -> Self {
        let Some(json) = payload else {
            return Self::default();
        };
        Self::from_json(json).unwrap_or_else(|err| {
            log::warn!("discarding unreadable snapshot: {err}");
            Self::default()
        })
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot store failed: {0}")]
    Store(String),
}

/// Shared in-memory store. Clones see the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    /// Overwrite a slot directly, bypassing encoding.
    pub fn put_raw(&self, key: &str, payload: &str) {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), payload.to_string());
    }
}

impl SnapshotStore for MemoryStore {
    type Error = Infallible;

    fn write(&self, key: &str, payload: &str) -> Result<(), Self::Error> {
        self.put_raw(key, payload);
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.raw(key))
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let snapshot = Snapshot::from_json(r#"{"settings":{"festival_mode":true}}"#).unwrap();
        assert!(snapshot.settings.sound_enabled);
        assert!(snapshot.settings.festival_mode);
        assert_eq!(snapshot.companion.level(), 1);
        assert!(snapshot.diary.is_empty());
        assert!(snapshot.user.is_none());
    }

    #[test]
    fn corrupt_payload_becomes_default() {
        let snapshot = Snapshot::decode_or_default(Some("{not json"));
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(Snapshot::decode_or_default(None), Snapshot::default());
    }

    #[test]
    fn memory_store_clones_share_slots() {
        let store = MemoryStore::new();
        let alias = store.clone();
        store.write("k", "v").unwrap();
        assert_eq!(alias.read("k").unwrap().as_deref(), Some("v"));
        alias.delete("k").unwrap();
        assert!(store.read("k").unwrap().is_none());
    }
}
