//! Append-only log of finished minigame rounds and the profile summary
//! derived from it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::minigames::MinigameId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScoreRecord {
    pub game_id: MinigameId,
    pub game_name: String,
    pub score: u32,
    pub xp_earned: u32,
    pub played_at: DateTime<Utc>,
}

impl GameScoreRecord {
    #[must_use]
    pub fn new(game_id: MinigameId, score: u32, xp_earned: u32, played_at: DateTime<Utc>) -> Self {
        Self {
            game_id,
            game_name: game_id.display_name().to_string(),
            score,
            xp_earned,
            played_at,
        }
    }
}

/// Per-game aggregates shown on the profile screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameStats {
    pub rounds: u32,
    pub best_score: u32,
    pub latest_score: u32,
    pub xp_earned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub games_played: usize,
    pub total_xp_earned: u64,
    pub per_game: BTreeMap<MinigameId, GameStats>,
}

/// Newest-first record of every settled round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameHistory {
    records: VecDeque<GameScoreRecord>,
}

impl GameHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: GameScoreRecord) {
        log::debug!(
            "recording {} score {} (+{} xp)",
            record.game_id,
            record.score,
            record.xp_earned
        );
        self.records.push_front(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameScoreRecord> + '_ {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn latest_for(&self, game: MinigameId) -> Option<&GameScoreRecord> {
        self.records.iter().find(|record| record.game_id == game)
    }

    #[must_use]
    pub fn best_for(&self, game: MinigameId) -> Option<&GameScoreRecord> {
        self.records
            .iter()
            .filter(|record| record.game_id == game)
            .max_by_key(|record| record.score)
    }

    #[must_use]
    pub fn summary(&self) -> ProfileSummary {
        let mut summary = ProfileSummary {
            games_played: self.records.len(),
            ..ProfileSummary::default()
        };
        // Oldest first so `latest_score` ends on the newest round.
        for record in self.records.iter().rev() {
            summary.total_xp_earned += u64::from(record.xp_earned);
            let stats = summary.per_game.entry(record.game_id).or_default();
            stats.rounds += 1;
            stats.best_score = stats.best_score.max(record.score);
            stats.latest_score = record.score;
            stats.xp_earned += u64::from(record.xp_earned);
        }
        summary
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
