//! Minigame rule engines and the contract they share with the session.
//!
//! A round never touches shared state directly. When it ends it produces a
//! [`RoundResult`], and [`RoundResult::settle`] hands that result to a
//! [`RewardSink`] through exactly two calls: one XP award and one history
//! record. Abandoned rounds never produce a result.

pub mod memory;
pub mod puzzle;
pub mod tap_ghost;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::history::GameScoreRecord;

pub use memory::{MemoryCandle, MemoryPhase, MemoryTap};
pub use puzzle::{MoveOutcome, PuzzleError, PuzzlePhase, SlidingPuzzle};
pub use tap_ghost::{Ghost, GhostPhase, TapTheGhost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MinigameId {
    TapGhost,
    ShadowPuzzle,
    MemoryCandle,
}

impl MinigameId {
    pub const ALL: [Self; 3] = [Self::TapGhost, Self::ShadowPuzzle, Self::MemoryCandle];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TapGhost => "tap-ghost",
            Self::ShadowPuzzle => "shadow-puzzle",
            Self::MemoryCandle => "memory-candle",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::TapGhost => "Tap the Ghost",
            Self::ShadowPuzzle => "Shadow Puzzle",
            Self::MemoryCandle => "Memory Candle",
        }
    }

    /// Inclusive XP window a round of this game can award.
    #[must_use]
    pub const fn xp_range(self) -> (u32, u32) {
        match self {
            Self::TapGhost | Self::MemoryCandle => (6, 10),
            Self::ShadowPuzzle => (8, 10),
        }
    }
}

impl fmt::Display for MinigameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinigameId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tap-ghost" => Ok(Self::TapGhost),
            "shadow-puzzle" => Ok(Self::ShadowPuzzle),
            "memory-candle" => Ok(Self::MemoryCandle),
            _ => Err(()),
        }
    }
}

/// Final tally of a completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub game: MinigameId,
    pub score: u32,
    pub xp: u32,
    pub won: bool,
}

impl RoundResult {
    /// Report the round to shared state: award XP, then record the result.
    pub fn settle<S: RewardSink + ?Sized>(self, sink: &mut S, played_at: DateTime<Utc>) {
        sink.award_xp(self.xp);
        sink.record_game_result(GameScoreRecord::new(
            self.game, self.score, self.xp, played_at,
        ));
    }
}

/// The only two mutation entry points a minigame may use.
pub trait RewardSink {
    fn award_xp(&mut self, amount: u32);

    fn record_game_result(&mut self, record: GameScoreRecord);
}

/// Common surface of the three rule engines.
pub trait Minigame {
    fn id(&self) -> MinigameId;

    /// Short phase label for logs and reports.
    fn phase_label(&self) -> &'static str;

    /// Run the round's clock forward, firing any timers that come due.
    fn advance(&mut self, elapsed_ms: u64);

    /// Milliseconds elapsed on the round clock.
    fn clock_ms(&self) -> u64;

    /// The result, once the round has ended.
    fn result(&self) -> Option<RoundResult>;

    fn is_finished(&self) -> bool {
        self.result().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        xp_calls: Vec<u32>,
        records: Vec<GameScoreRecord>,
    }

    impl RewardSink for RecordingSink {
        fn award_xp(&mut self, amount: u32) {
            self.xp_calls.push(amount);
        }

        fn record_game_result(&mut self, record: GameScoreRecord) {
            self.records.push(record);
        }
    }

    #[test]
    fn settle_makes_exactly_two_calls() {
        let mut sink = RecordingSink::default();
        let played_at = DateTime::<Utc>::UNIX_EPOCH;
        RoundResult {
            game: MinigameId::MemoryCandle,
            score: 150,
            xp: 10,
            won: true,
        }
        .settle(&mut sink, played_at);
        assert_eq!(sink.xp_calls, vec![10]);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].game_name, "Memory Candle");
        assert_eq!(sink.records[0].xp_earned, 10);
        assert_eq!(sink.records[0].played_at, played_at);
    }

    #[test]
    fn ids_round_trip_through_labels() {
        for game in MinigameId::ALL {
            assert_eq!(game.as_str().parse::<MinigameId>(), Ok(game));
            let json = serde_json::to_string(&game).unwrap();
            assert_eq!(json, format!("\"{}\"", game.as_str()));
        }
        assert!("pong".parse::<MinigameId>().is_err());
    }
}
