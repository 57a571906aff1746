//! Tap the Ghost: a 30 second round of catching ghosts before they fade.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Minigame, MinigameId, RoundResult};
use crate::constants::{
    GHOST_COUNTDOWN_TICK_MS, GHOST_LIFETIME_MS, GHOST_MAX_ACTIVE, GHOST_POINTS,
    GHOST_ROUND_SECONDS, GHOST_SIZE_RANGE, GHOST_SPAWN_INTERVAL_MS, GHOST_X_RANGE,
    GHOST_XP_BONUS, GHOST_XP_DIVISOR, GHOST_XP_MAX, GHOST_XP_MIN, GHOST_Y_RANGE,
};
use crate::scheduler::Scheduler;

/// One catchable ghost. Position and size are percentages of the play area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ghost {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub points: u8,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GhostPhase {
    #[default]
    Ready,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GhostTimer {
    Countdown,
    Spawn,
    Expire(u64),
}

/// `clamp(floor(score / 5) + 6, 6, 10)`.
#[must_use]
pub fn xp_for(score: u32) -> u32 {
    (score / GHOST_XP_DIVISOR)
        .saturating_add(GHOST_XP_BONUS)
        .clamp(GHOST_XP_MIN, GHOST_XP_MAX)
}

#[derive(Debug, Clone)]
pub struct TapTheGhost<R> {
    rng: R,
    phase: GhostPhase,
    time_left: u32,
    score: u32,
    caught: u32,
    spawned: u64,
    ghosts: Vec<Ghost>,
    scheduler: Scheduler<GhostTimer>,
    result: Option<RoundResult>,
}

impl<R: Rng> TapTheGhost<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            phase: GhostPhase::Ready,
            time_left: GHOST_ROUND_SECONDS,
            score: 0,
            caught: 0,
            spawned: 0,
            ghosts: Vec::with_capacity(GHOST_MAX_ACTIVE),
            scheduler: Scheduler::new(),
            result: None,
        }
    }

    pub fn start(&mut self) {
        self.scheduler.cancel_all();
        self.phase = GhostPhase::Playing;
        self.time_left = GHOST_ROUND_SECONDS;
        self.score = 0;
        self.caught = 0;
        self.ghosts.clear();
        self.result = None;
        self.scheduler
            .schedule_in(GHOST_COUNTDOWN_TICK_MS, GhostTimer::Countdown);
        self.scheduler
            .schedule_in(GHOST_SPAWN_INTERVAL_MS, GhostTimer::Spawn);
    }

    fn handle(&mut self, timer: GhostTimer) {
        match timer {
            GhostTimer::Countdown => {
                self.time_left = self.time_left.saturating_sub(1);
                if self.time_left == 0 {
                    self.finish();
                } else {
                    self.scheduler
                        .schedule_in(GHOST_COUNTDOWN_TICK_MS, GhostTimer::Countdown);
                }
            }
            GhostTimer::Spawn => {
                if self.ghosts.len() < GHOST_MAX_ACTIVE {
                    self.spawn();
                }
                self.scheduler
                    .schedule_in(GHOST_SPAWN_INTERVAL_MS, GhostTimer::Spawn);
            }
            GhostTimer::Expire(id) => self.ghosts.retain(|ghost| ghost.id != id),
        }
    }

    fn spawn(&mut self) {
        let id = self.spawned;
        self.spawned += 1;
        let lifetime = self.rng.gen_range(GHOST_LIFETIME_MS);
        let ghost = Ghost {
            id,
            x: self.rng.gen_range(GHOST_X_RANGE),
            y: self.rng.gen_range(GHOST_Y_RANGE),
            size: self.rng.gen_range(GHOST_SIZE_RANGE),
            points: self.rng.gen_range(GHOST_POINTS),
            expires_at_ms: self.scheduler.now_ms().saturating_add(lifetime),
        };
        self.scheduler.schedule_in(lifetime, GhostTimer::Expire(id));
        self.ghosts.push(ghost);
    }

    /// Catch a ghost. Returns its points, or `None` if it is already gone.
    pub fn tap(&mut self, id: u64) -> Option<u8> {
        if self.phase != GhostPhase::Playing {
            return None;
        }
        let index = self.ghosts.iter().position(|ghost| ghost.id == id)?;
        let ghost = self.ghosts.swap_remove(index);
        self.score += u32::from(ghost.points);
        self.caught += 1;
        Some(ghost.points)
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.ghosts.clear();
        self.phase = GhostPhase::Ended;
        let result = RoundResult {
            game: MinigameId::TapGhost,
            score: self.score,
            xp: xp_for(self.score),
            won: self.score > 0,
        };
        log::info!(
            "ghost round over: caught {} for {} points, {} xp",
            self.caught,
            result.score,
            result.xp
        );
        self.result = Some(result);
    }

    #[must_use]
    pub const fn phase(&self) -> GhostPhase {
        self.phase
    }

    #[must_use]
    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    #[must_use]
    pub const fn time_left(&self) -> u32 {
        self.time_left
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub const fn caught(&self) -> u32 {
        self.caught
    }

    /// Ghosts spawned since the game was created.
    #[must_use]
    pub const fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Stale timers the round has discarded.
    #[must_use]
    pub const fn dropped_timers(&self) -> u64 {
        self.scheduler.dropped_count()
    }
}

impl<R: Rng> Minigame for TapTheGhost<R> {
    fn id(&self) -> MinigameId {
        MinigameId::TapGhost
    }

    fn phase_label(&self) -> &'static str {
        match self.phase {
            GhostPhase::Ready => "ready",
            GhostPhase::Playing => "playing",
            GhostPhase::Ended => "ended",
        }
    }

    fn advance(&mut self, elapsed_ms: u64) {
        let until = self.scheduler.now_ms().saturating_add(elapsed_ms);
        while let Some(timer) = self.scheduler.pop_due(until) {
            self.handle(timer);
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
