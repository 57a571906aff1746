//! Companion progression: XP curve, levelling and cosmetic unlocks.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{CosmeticCatalog, CosmeticKind};
use crate::constants::{
    EXCITED_TAP_THRESHOLD, NIGHT_END_HOUR, NIGHT_START_HOUR, PLAYFUL_TAP_THRESHOLD,
    STARTING_LEVEL, XP_CURVE_BASE, XP_CURVE_GROWTH,
};
use crate::numbers::floor_f64_to_u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Happy,
    Playful,
    Sleepy,
    Excited,
}

impl Mood {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Playful => "playful",
            Self::Sleepy => "sleepy",
            Self::Excited => "excited",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Self::Happy),
            "playful" => Ok(Self::Playful),
            "sleepy" => Ok(Self::Sleepy),
            "excited" => Ok(Self::Excited),
            _ => Err(()),
        }
    }
}

/// XP needed to advance from `level` to `level + 1`: `floor(50 * 1.5^(level-1))`.
#[must_use]
pub fn xp_to_next_level(level: u32) -> u64 {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    floor_f64_to_u64(XP_CURVE_BASE * XP_CURVE_GROWTH.powi(exponent)).max(1)
}

/// Mood the companion should switch to after `taps` interactions, if any.
#[must_use]
pub const fn mood_for_interactions(taps: u32) -> Option<Mood> {
    if taps > EXCITED_TAP_THRESHOLD {
        Some(Mood::Excited)
    } else if taps > PLAYFUL_TAP_THRESHOLD {
        Some(Mood::Playful)
    } else {
        None
    }
}

/// Night runs from 19:00 through 05:59 local time.
#[must_use]
pub const fn is_night_hour(hour: u32) -> bool {
    hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR
}

/// Snapshot of the companion's progress. Mutated only through
/// [`ProgressionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionState {
    level: u32,
    xp: u64,
    xp_to_next_level: u64,
    current_skin: String,
    current_background: String,
    unlocked_skins: BTreeSet<String>,
    unlocked_backgrounds: BTreeSet<String>,
    mood: Mood,
    last_interaction: DateTime<Utc>,
}

impl Default for CompanionState {
    fn default() -> Self {
        Self::fresh(&CosmeticCatalog::default(), DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl CompanionState {
    /// Level-1 state with the catalog's starter cosmetics equipped.
    #[must_use]
    pub fn fresh(catalog: &CosmeticCatalog, now: DateTime<Utc>) -> Self {
        let starter = |kind| {
            catalog
                .starter(kind)
                .map(|item| item.id.clone())
                .unwrap_or_default()
        };
        let current_skin = starter(CosmeticKind::Skin);
        let current_background = starter(CosmeticKind::Background);
        let mut state = Self {
            level: STARTING_LEVEL,
            xp: 0,
            xp_to_next_level: xp_to_next_level(STARTING_LEVEL),
            unlocked_skins: BTreeSet::from([current_skin.clone()]),
            unlocked_backgrounds: BTreeSet::from([current_background.clone()]),
            current_skin,
            current_background,
            mood: Mood::default(),
            last_interaction: now,
        };
        state.scan_unlocks(catalog);
        state
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub const fn xp_to_next_level(&self) -> u64 {
        self.xp_to_next_level
    }

    #[must_use]
    pub fn current_skin(&self) -> &str {
        &self.current_skin
    }

    #[must_use]
    pub fn current_background(&self) -> &str {
        &self.current_background
    }

    #[must_use]
    pub const fn unlocked_skins(&self) -> &BTreeSet<String> {
        &self.unlocked_skins
    }

    #[must_use]
    pub const fn unlocked_backgrounds(&self) -> &BTreeSet<String> {
        &self.unlocked_backgrounds
    }

    #[must_use]
    pub const fn unlocked(&self, kind: CosmeticKind) -> &BTreeSet<String> {
        match kind {
            CosmeticKind::Skin => &self.unlocked_skins,
            CosmeticKind::Background => &self.unlocked_backgrounds,
        }
    }

    #[must_use]
    pub fn current(&self, kind: CosmeticKind) -> &str {
        match kind {
            CosmeticKind::Skin => &self.current_skin,
            CosmeticKind::Background => &self.current_background,
        }
    }

    #[must_use]
    pub const fn mood(&self) -> Mood {
        self.mood
    }

    #[must_use]
    pub const fn last_interaction(&self) -> DateTime<Utc> {
        self.last_interaction
    }

    /// Fraction of the way to the next level, in `[0, 1)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_fraction(&self) -> f64 {
        self.xp as f64 / self.xp_to_next_level as f64
    }

    fn unlocked_mut(&mut self, kind: CosmeticKind) -> &mut BTreeSet<String> {
        match kind {
            CosmeticKind::Skin => &mut self.unlocked_skins,
            CosmeticKind::Background => &mut self.unlocked_backgrounds,
        }
    }

    fn scan_unlocks(&mut self, catalog: &CosmeticCatalog) -> Vec<(CosmeticKind, String)> {
        let mut fresh = Vec::new();
        for kind in CosmeticKind::ALL {
            let level = self.level;
            let ids: Vec<String> = catalog
                .available_at(kind, level)
                .map(|item| item.id.clone())
                .collect();
            let unlocked = self.unlocked_mut(kind);
            for id in ids {
                if unlocked.insert(id.clone()) {
                    fresh.push((kind, id));
                }
            }
        }
        fresh
    }

    fn cascade_levels(&mut self) {
        while self.xp >= self.xp_to_next_level {
            self.xp -= self.xp_to_next_level;
            self.level = self.level.saturating_add(1);
            self.xp_to_next_level = xp_to_next_level(self.level);
        }
    }
}

/// Result of one [`ProgressionEngine::apply_xp`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LevelUpReport {
    pub xp_applied: u64,
    pub previous_level: u32,
    pub new_level: u32,
    pub newly_unlocked: Vec<(CosmeticKind, String)>,
}

impl LevelUpReport {
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.new_level > self.previous_level
    }
}

/// Exclusive owner of [`CompanionState`]; every mutation goes through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionEngine {
    catalog: CosmeticCatalog,
    state: CompanionState,
}

impl ProgressionEngine {
    #[must_use]
    pub fn new(catalog: CosmeticCatalog, now: DateTime<Utc>) -> Self {
        let state = CompanionState::fresh(&catalog, now);
        Self { catalog, state }
    }

    /// Adopt a previously persisted state, repairing any broken invariants.
    #[must_use]
    pub fn from_state(catalog: CosmeticCatalog, state: CompanionState) -> Self {
        let mut engine = Self { catalog, state };
        engine.repair();
        engine
    }

    #[must_use]
    pub const fn state(&self) -> &CompanionState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &CosmeticCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn into_state(self) -> CompanionState {
        self.state
    }

    /// Add XP, level up as many times as the total allows, then unlock
    /// every cosmetic gated at or below the resulting level.
    pub fn apply_xp(&mut self, amount: u64) -> LevelUpReport {
        let previous_level = self.state.level;
        self.state.xp = self.state.xp.saturating_add(amount);
        self.state.cascade_levels();
        let newly_unlocked = self.state.scan_unlocks(&self.catalog);

        if self.state.level > previous_level {
            log::info!(
                "companion reached level {} (from {previous_level})",
                self.state.level
            );
        }
        for (kind, id) in &newly_unlocked {
            log::info!("unlocked {kind} {id}");
        }

        LevelUpReport {
            xp_applied: amount,
            previous_level,
            new_level: self.state.level,
            newly_unlocked,
        }
    }

    /// Equip an unlocked skin. Locked or unknown ids are ignored.
    pub fn set_skin(&mut self, id: &str) -> bool {
        self.equip(CosmeticKind::Skin, id)
    }

    /// Equip an unlocked background. Locked or unknown ids are ignored.
    pub fn set_background(&mut self, id: &str) -> bool {
        self.equip(CosmeticKind::Background, id)
    }

    pub fn equip(&mut self, kind: CosmeticKind, id: &str) -> bool {
        if !self.state.unlocked(kind).contains(id) {
            log::debug!("ignoring request to equip locked {kind} {id}");
            return false;
        }
        let slot = match kind {
            CosmeticKind::Skin => &mut self.state.current_skin,
            CosmeticKind::Background => &mut self.state.current_background,
        };
        id.clone_into(slot);
        true
    }

    pub fn update_mood(&mut self, mood: Mood) {
        self.state.mood = mood;
    }

    pub fn record_interaction(&mut self, now: DateTime<Utc>) {
        self.state.last_interaction = now;
    }

    /// Re-establish every state invariant. Unlocked sets never shrink.
    pub fn repair(&mut self) {
        let state = &mut self.state;
        state.level = state.level.max(STARTING_LEVEL);
        state.xp_to_next_level = xp_to_next_level(state.level);
        state.cascade_levels();

        for kind in CosmeticKind::ALL {
            if let Some(starter) = self.catalog.starter(kind) {
                let starter_id = starter.id.clone();
                state.unlocked_mut(kind).insert(starter_id.clone());
                let equipped_ok = state.unlocked(kind).contains(state.current(kind));
                if !equipped_ok {
                    log::warn!(
                        "equipped {kind} {:?} is not unlocked; reverting to {starter_id}",
                        state.current(kind)
                    );
                    match kind {
                        CosmeticKind::Skin => state.current_skin = starter_id,
                        CosmeticKind::Background => state.current_background = starter_id,
                    }
                }
            }
        }
        state.scan_unlocks(&self.catalog);
    }
}
