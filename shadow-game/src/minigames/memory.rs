//! Memory Candle: watch the candles light up, then repeat the order.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Minigame, MinigameId, RoundResult};
use crate::constants::{
    CANDLE_COUNT, MEMORY_INPUT_SETTLE_MS, MEMORY_MAX_LEVEL, MEMORY_NEXT_LEVEL_DELAY_MS,
    MEMORY_POINTS_PER_LEVEL, MEMORY_REVEAL_LEAD_MS, MEMORY_REVEAL_LIT_MS,
    MEMORY_SEQUENCE_PADDING, MEMORY_XP_BONUS, MEMORY_XP_MAX, MEMORY_XP_MIN,
};
use crate::scheduler::Scheduler;

/// Candle indices, at most `MEMORY_MAX_LEVEL + 2` long.
pub type CandleSequence = SmallVec<[u8; 8]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPhase {
    #[default]
    Ready,
    /// Candles are being revealed, or the next level is about to be.
    Showing,
    Input,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTap {
    /// Not accepting input, or not a candle.
    Ignored,
    Correct,
    LevelCleared,
    Won,
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealStep {
    Light(usize),
    Dim(usize),
    OpenInput,
    NextLevel,
}

/// Candles shown at `level`, with `level` clamped to `1..=MEMORY_MAX_LEVEL`.
#[must_use]
pub const fn sequence_len(level: u32) -> usize {
    let level = if level < 1 {
        1
    } else if level > MEMORY_MAX_LEVEL {
        MEMORY_MAX_LEVEL
    } else {
        level
    };
    (level + MEMORY_SEQUENCE_PADDING) as usize
}

pub fn generate_sequence<R: Rng + ?Sized>(rng: &mut R, level: u32) -> CandleSequence {
    (0..sequence_len(level))
        .map(|_| rng.gen_range(0..CANDLE_COUNT))
        .collect()
}

/// `clamp(level + 5, 6, 10)`, whether the round was won or lost.
#[must_use]
pub fn xp_for(level: u32) -> u32 {
    level
        .saturating_add(MEMORY_XP_BONUS)
        .clamp(MEMORY_XP_MIN, MEMORY_XP_MAX)
}

#[derive(Debug, Clone)]
pub struct MemoryCandle<R> {
    rng: R,
    phase: MemoryPhase,
    level: u32,
    score: u32,
    sequence: CandleSequence,
    entered: CandleSequence,
    lit: Option<u8>,
    scheduler: Scheduler<RevealStep>,
    result: Option<RoundResult>,
}

impl<R: Rng> MemoryCandle<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            phase: MemoryPhase::Ready,
            level: 1,
            score: 0,
            sequence: CandleSequence::new(),
            entered: CandleSequence::new(),
            lit: None,
            scheduler: Scheduler::new(),
            result: None,
        }
    }

    /// Start a fresh round at level 1.
    pub fn start(&mut self) {
        self.start_at_level(1);
    }

    /// Start a fresh round at `level` (clamped to `1..=5`), score zero.
    pub fn start_at_level(&mut self, level: u32) {
        self.scheduler.cancel_all();
        self.level = level.clamp(1, MEMORY_MAX_LEVEL);
        self.score = 0;
        self.result = None;
        self.begin_level();
    }

    fn begin_level(&mut self) {
        self.sequence = generate_sequence(&mut self.rng, self.level);
        self.entered.clear();
        self.lit = None;
        self.phase = MemoryPhase::Showing;
        log::debug!(
            "memory level {} with {} candles",
            self.level,
            self.sequence.len()
        );
        self.scheduler
            .schedule_in(MEMORY_REVEAL_LEAD_MS, RevealStep::Light(0));
    }

    fn handle(&mut self, step: RevealStep) {
        match step {
            RevealStep::Light(index) => {
                self.lit = self.sequence.get(index).copied();
                self.scheduler
                    .schedule_in(MEMORY_REVEAL_LIT_MS, RevealStep::Dim(index));
            }
            RevealStep::Dim(index) => {
                self.lit = None;
                if index + 1 < self.sequence.len() {
                    self.scheduler
                        .schedule_in(MEMORY_REVEAL_LEAD_MS, RevealStep::Light(index + 1));
                } else {
                    self.scheduler
                        .schedule_in(MEMORY_INPUT_SETTLE_MS, RevealStep::OpenInput);
                }
            }
            RevealStep::OpenInput => self.phase = MemoryPhase::Input,
            RevealStep::NextLevel => {
                self.level += 1;
                self.begin_level();
            }
        }
    }

    pub fn tap(&mut self, candle: u8) -> MemoryTap {
        if self.phase != MemoryPhase::Input || candle >= CANDLE_COUNT {
            return MemoryTap::Ignored;
        }
        let position = self.entered.len();
        self.entered.push(candle);
        if self.sequence.get(position) != Some(&candle) {
            self.finish(false);
            return MemoryTap::Missed;
        }
        if self.entered.len() < self.sequence.len() {
            return MemoryTap::Correct;
        }

        self.score += self.level * MEMORY_POINTS_PER_LEVEL;
        if self.level >= MEMORY_MAX_LEVEL {
            self.finish(true);
            MemoryTap::Won
        } else {
            self.phase = MemoryPhase::Showing;
            self.scheduler
                .schedule_in(MEMORY_NEXT_LEVEL_DELAY_MS, RevealStep::NextLevel);
            MemoryTap::LevelCleared
        }
    }

    fn finish(&mut self, won: bool) {
        self.scheduler.cancel_all();
        self.phase = MemoryPhase::Ended;
        self.lit = None;
        let result = RoundResult {
            game: MinigameId::MemoryCandle,
            score: self.score,
            xp: xp_for(self.level),
            won,
        };
        log::info!(
            "memory round over at level {} (won: {won}): score {} xp {}",
            self.level,
            result.score,
            result.xp
        );
        self.result = Some(result);
    }

    #[must_use]
    pub const fn phase(&self) -> MemoryPhase {
        self.phase
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Candle currently highlighted by the reveal, if any.
    #[must_use]
    pub const fn lit(&self) -> Option<u8> {
        self.lit
    }

    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[must_use]
    pub fn entered(&self) -> &[u8] {
        &self.entered
    }
}

impl<R: Rng> Minigame for MemoryCandle<R> {
    fn id(&self) -> MinigameId {
        MinigameId::MemoryCandle
    }

    fn phase_label(&self) -> &'static str {
        match self.phase {
            MemoryPhase::Ready => "ready",
            MemoryPhase::Showing => "showing",
            MemoryPhase::Input => "input",
            MemoryPhase::Ended => "ended",
        }
    }

    fn advance(&mut self, elapsed_ms: u64) {
        let until = self.scheduler.now_ms().saturating_add(elapsed_ms);
        while let Some(step) = self.scheduler.pop_due(until) {
            self.handle(step);
        }
        self.scheduler.settle(until);
    }

    fn clock_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    fn result(&self) -> Option<RoundResult> {
        self.result
    }
}
