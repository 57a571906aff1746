//! Shadow Companion Engine
//!
//! Platform-agnostic core logic for Shadow Companion, a spooky virtual pet
//! with a daily diary and three minigames. This crate provides the
//! progression rules, the logs and the minigame rule engines without any UI
//! or platform-specific dependencies.

pub mod catalog;
pub mod constants;
pub mod diary;
pub mod history;
pub mod minigames;
pub mod numbers;
pub mod progression;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod snapshot;

// Re-export commonly used types
pub use catalog::{CatalogError, CatalogLoadError, CosmeticCatalog, CosmeticItem, CosmeticKind};
pub use diary::{DiaryEntry, DiaryLog, WHISPER_LINES, pick_whisper};
pub use history::{GameHistory, GameScoreRecord, GameStats, ProfileSummary};
pub use minigames::{
    Ghost, GhostPhase, MemoryCandle, MemoryPhase, MemoryTap, Minigame, MinigameId, MoveOutcome,
    PuzzleError, PuzzlePhase, RewardSink, RoundResult, SlidingPuzzle, TapTheGhost,
};
pub use progression::{
    CompanionState, LevelUpReport, Mood, ProgressionEngine, is_night_hour, mood_for_interactions,
    xp_to_next_level,
};
pub use rng::{CountingRng, RngBundle};
pub use scheduler::{Generation, Scheduler, TimerId};
pub use session::{
    AccountError, ActiveRound, CompanionSession, Route, RoundStartError, RoundTicket, TapOutcome,
};
pub use snapshot::{MemoryStore, Settings, Snapshot, SnapshotError, UserProfile};

/// Trait for abstracting snapshot persistence.
/// Platform-specific implementations should provide this
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store `payload` under `key`, replacing anything already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write(&self, key: &str, payload: &str) -> Result<(), Self::Error>;

    /// Read the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Remove the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be deleted.
    fn delete(&self, key: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[test]
    fn store_round_trips_a_session() {
        let store = MemoryStore::new();
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let mut session = CompanionSession::new(store.clone(), 0xABCD, now);
        session.login_as_guest(now);
        session.save().unwrap();

        let payload = store.read(constants::STORAGE_KEY).unwrap().expect("save exists");
        let snapshot = Snapshot::from_json(&payload).unwrap();
        assert_eq!(snapshot.companion.xp(), constants::DAILY_VISIT_XP);
        assert!(snapshot.user.unwrap().is_guest);
        assert!(store.read("missing-slot").unwrap().is_none());
    }

    #[test]
    fn default_catalog_is_valid() {
        let catalog = CosmeticCatalog::default();
        assert_eq!(catalog.validate(), Ok(()));
        assert_eq!(catalog.items(CosmeticKind::Skin).len(), 5);
        assert_eq!(catalog.items(CosmeticKind::Background).len(), 5);
    }
}
