//! Centralized balance and tuning constants for Shadow Companion.
//!
//! These values define the deterministic math for progression and the
//! minigames. Keeping them together ensures that gameplay can only be
//! adjusted via code changes reviewed in version control.

// Persistence --------------------------------------------------------------
pub const STORAGE_KEY: &str = "shadow-companion-storage";

// Progression --------------------------------------------------------------
pub(crate) const XP_CURVE_BASE: f64 = 50.0;
pub(crate) const XP_CURVE_GROWTH: f64 = 1.5;
pub const STARTING_LEVEL: u32 = 1;
pub const DAILY_VISIT_XP: u64 = 5;
pub const TAP_REWARD_XP: u64 = 2;
pub const TAP_REWARD_INTERVAL: u32 = 10;
pub(crate) const PLAYFUL_TAP_THRESHOLD: u32 = 5;
pub(crate) const EXCITED_TAP_THRESHOLD: u32 = 10;
pub(crate) const NIGHT_START_HOUR: u32 = 19;
pub(crate) const NIGHT_END_HOUR: u32 = 6;

// Sliding-tile puzzle ------------------------------------------------------
pub const PUZZLE_GRID_SIZE: usize = 3;
pub const PUZZLE_CELLS: usize = PUZZLE_GRID_SIZE * PUZZLE_GRID_SIZE;
pub const PUZZLE_SOLVED: [u8; PUZZLE_CELLS] = [1, 2, 3, 4, 5, 6, 7, 8, 0];
pub(crate) const PUZZLE_SCORE_BASE: i64 = 1_000;
pub(crate) const PUZZLE_SCORE_PER_MOVE: i64 = 10;
pub(crate) const PUZZLE_SCORE_PER_SECOND: i64 = 5;
pub(crate) const PUZZLE_EFFICIENCY_BASE: i64 = 100;
pub(crate) const PUZZLE_XP_MIN: u32 = 8;
pub(crate) const PUZZLE_XP_MAX: u32 = 10;

// Memory candle ------------------------------------------------------------
pub const CANDLE_COUNT: u8 = 4;
pub const MEMORY_MAX_LEVEL: u32 = 5;
pub(crate) const MEMORY_SEQUENCE_PADDING: u32 = 2;
pub(crate) const MEMORY_POINTS_PER_LEVEL: u32 = 10;
pub(crate) const MEMORY_XP_BONUS: u32 = 5;
pub(crate) const MEMORY_XP_MIN: u32 = 6;
pub(crate) const MEMORY_XP_MAX: u32 = 10;
pub(crate) const MEMORY_REVEAL_LEAD_MS: u64 = 600;
pub(crate) const MEMORY_REVEAL_LIT_MS: u64 = 400;
pub(crate) const MEMORY_INPUT_SETTLE_MS: u64 = 300;
pub(crate) const MEMORY_NEXT_LEVEL_DELAY_MS: u64 = 1_000;

// Tap the ghost ------------------------------------------------------------
pub const GHOST_ROUND_SECONDS: u32 = 30;
pub const GHOST_MAX_ACTIVE: usize = 5;
pub(crate) const GHOST_COUNTDOWN_TICK_MS: u64 = 1_000;
pub(crate) const GHOST_SPAWN_INTERVAL_MS: u64 = 800;
pub(crate) const GHOST_LIFETIME_MS: std::ops::Range<u64> = 1_500..2_500;
pub(crate) const GHOST_X_RANGE: std::ops::Range<f32> = 10.0..80.0;
pub(crate) const GHOST_Y_RANGE: std::ops::Range<f32> = 10.0..70.0;
pub(crate) const GHOST_SIZE_RANGE: std::ops::Range<f32> = 40.0..70.0;
pub(crate) const GHOST_POINTS: std::ops::RangeInclusive<u8> = 1..=3;
pub(crate) const GHOST_XP_DIVISOR: u32 = 5;
pub(crate) const GHOST_XP_BONUS: u32 = 6;
pub(crate) const GHOST_XP_MIN: u32 = 6;
pub(crate) const GHOST_XP_MAX: u32 = 10;

// Accounts -----------------------------------------------------------------
pub(crate) const GUEST_NAME_PREFIX: &str = "Shadow";
pub(crate) const GUEST_NAME_SPACE: u32 = 9_999;
