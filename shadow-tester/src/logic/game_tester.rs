use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::common::{day_after, simulation_epoch, visit_time};
use crate::logic::policy::{GameplayStrategy, PlayerPolicy};
use shadow_game::{
    CompanionSession, CosmeticKind, GhostPhase, MemoryPhase, MemoryStore, MemoryTap, MinigameId,
    ProgressionEngine, Route, RoundResult, RoundTicket, Snapshot, SnapshotStore, xp_to_next_level,
};

/// Virtual milliseconds a bot spends thinking between puzzle moves.
const PUZZLE_THINK_MS: u64 = 700;
/// Virtual clock step while watching or playing a timed round.
const TICK_MS: u64 = 100;
/// Ticks after which an unfinished round is abandoned.
const MAX_ROUND_TICKS: usize = 2_000;

/// Declarative plan for running a simulated player.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub days: u32,
    pub setup: Option<fn(&mut CompanionSession<MemoryStore>)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            days: 1,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut CompanionSession<MemoryStore>)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// How one minigame fared across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundTally {
    pub played: u32,
    pub won: u32,
    pub abandoned: u32,
}

/// Everything that happened on one simulated day.
#[derive(Debug, Clone)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub daily_bonus: bool,
    pub whisper: String,
    pub rounds: Vec<RoundResult>,
    pub level_after: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PlayabilityMetrics {
    pub days_played: u32,
    pub final_level: u32,
    pub final_xp: u64,
    pub lifetime_xp: u64,
    pub level_ups: u32,
    pub daily_bonuses: u32,
    pub companion_taps: u32,
    pub diary_entries: usize,
    pub favorites: usize,
    pub unlocked_skins: usize,
    pub unlocked_backgrounds: usize,
    pub per_game: BTreeMap<MinigameId, RoundTally>,
    pub invariant_violations: Vec<String>,
}

impl PlayabilityMetrics {
    #[must_use]
    pub fn tally(&self, game: MinigameId) -> RoundTally {
        self.per_game.get(&game).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn rounds_played(&self) -> u32 {
        self.per_game.values().map(|tally| tally.played).sum()
    }

    #[must_use]
    pub fn rounds_abandoned(&self) -> u32 {
        self.per_game.values().map(|tally| tally.abandoned).sum()
    }

    fn record_round(&mut self, game: MinigameId, result: Option<RoundResult>) {
        let tally = self.per_game.entry(game).or_default();
        match result {
            Some(result) => {
                tally.played += 1;
                if result.won {
                    tally.won += 1;
                }
            }
            None => tally.abandoned += 1,
        }
    }

    fn finalize<S: SnapshotStore>(&mut self, session: &CompanionSession<S>) {
        let state = session.engine().state();
        self.final_level = state.level();
        self.final_xp = state.xp();
        self.lifetime_xp = lifetime_xp(state.level(), state.xp());
        self.unlocked_skins = state.unlocked(CosmeticKind::Skin).len();
        self.unlocked_backgrounds = state.unlocked(CosmeticKind::Background).len();
        self.diary_entries = session.diary().len();
        self.favorites = session.favorites().count();
    }
}

/// Total XP ever applied to reach `xp` inside `level`.
#[must_use]
pub fn lifetime_xp(level: u32, xp: u64) -> u64 {
    (1..level)
        .map(xp_to_next_level)
        .fold(xp, u64::saturating_add)
}

/// Broken progression invariants, one message each.
#[must_use]
pub fn progression_violations(engine: &ProgressionEngine) -> Vec<String> {
    let state = engine.state();
    let mut violations = Vec::new();
    if state.level() < 1 {
        violations.push(format!("level {} below 1", state.level()));
    }
    if state.xp() >= state.xp_to_next_level() {
        violations.push(format!(
            "xp {} not below threshold {}",
            state.xp(),
            state.xp_to_next_level()
        ));
    }
    if state.xp_to_next_level() != xp_to_next_level(state.level()) {
        violations.push(format!(
            "threshold {} does not match level {}",
            state.xp_to_next_level(),
            state.level()
        ));
    }
    for kind in CosmeticKind::ALL {
        if !state.unlocked(kind).contains(state.current(kind)) {
            violations.push(format!("{kind} {} equipped but locked", state.current(kind)));
        }
        for item in engine.catalog().available_at(kind, state.level()) {
            if !state.unlocked(kind).contains(&item.id) {
                violations.push(format!(
                    "{kind} {} missing at level {}",
                    item.id,
                    state.level()
                ));
            }
        }
    }
    violations
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub days: Vec<DayOutcome>,
    pub metrics: PlayabilityMetrics,
    pub final_snapshot: Snapshot,
}

/// Headless deterministic runner for the companion core.
#[derive(Debug, Clone, Copy)]
pub struct GameTester {
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let start = simulation_epoch();
        let mut session = CompanionSession::new(MemoryStore::new(), seed, visit_time(start));
        if let Some(setup) = plan.setup {
            setup(&mut session);
        }
        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = PlayabilityMetrics::default();
        let mut days = Vec::with_capacity(usize::try_from(plan.days).unwrap_or(0));

        for offset in 0..plan.days {
            let date = day_after(start, offset);
            let outcome = self.play_day(&mut session, policy.as_mut(), date, &mut metrics);
            days.push(outcome);
        }
        metrics.finalize(&session);

        SimulationSummary {
            seed,
            strategy: plan.strategy,
            days,
            metrics,
            final_snapshot: session.snapshot(),
        }
    }

    /// One evening with the companion: sign in if needed, collect the
    /// daily bonus, tap the companion, read the diary, then play one round
    /// of each minigame.
    pub fn play_day<S: SnapshotStore>(
        &self,
        session: &mut CompanionSession<S>,
        policy: &mut dyn PlayerPolicy,
        date: NaiveDate,
        metrics: &mut PlayabilityMetrics,
    ) -> DayOutcome {
        let now = visit_time(date);
        let level_before = session.engine().state().level();
        let visited_before = session.last_daily_visit();

        if session.user().is_none() {
            session.finish_splash(now);
            session.login_as_guest(now);
        }
        session.navigate(Route::Home, now);
        let daily_bonus = session.last_daily_visit() != visited_before;

        let taps = policy.companion_taps();
        for _ in 0..taps {
            session.tap_companion(now);
        }

        session.navigate(Route::Diary, now);
        let whisper = session.today_line(date).unwrap_or_default().to_string();
        if policy.favorite_whisper()
            && let Some(entry) = session.diary().entry_for(date)
            && !entry.is_favorite
        {
            let id = entry.id.clone();
            session.toggle_favorite(&id);
        }

        session.navigate(Route::Games, now);
        let mut rounds = Vec::new();
        for game in MinigameId::ALL {
            let result = play_round(session, policy, game, now);
            metrics.record_round(game, result);
            rounds.extend(result);
        }
        session.navigate(Route::Home, now);

        let level_after = session.engine().state().level();
        metrics.days_played += 1;
        metrics.companion_taps += taps;
        metrics.level_ups += level_after.saturating_sub(level_before);
        if daily_bonus {
            metrics.daily_bonuses += 1;
        }
        for violation in progression_violations(session.engine()) {
            metrics
                .invariant_violations
                .push(format!("{date}: {violation}"));
        }

        if self.verbose {
            println!(
                "  📅 {date} [{}] level {} ({} rounds, bonus {})",
                policy.name(),
                level_after.to_string().bright_white(),
                rounds.len(),
                daily_bonus
            );
        }

        DayOutcome {
            date,
            daily_bonus,
            whisper,
            rounds,
            level_after,
        }
    }
}

/// Play one round of `game` to completion, or abandon it after
/// [`MAX_ROUND_TICKS`]. Returns the settled result.
pub fn play_round<S: SnapshotStore>(
    session: &mut CompanionSession<S>,
    policy: &mut dyn PlayerPolicy,
    game: MinigameId,
    now: DateTime<Utc>,
) -> Option<RoundResult> {
    let ticket = match session.start_round(game, now) {
        Ok(ticket) => ticket,
        Err(err) => {
            log::warn!("{} bot could not start a {game} round: {err}", policy.name());
            return None;
        }
    };
    let result = match game {
        MinigameId::ShadowPuzzle => drive_puzzle(session, policy, ticket, now),
        MinigameId::MemoryCandle => drive_memory(session, policy, ticket, now),
        MinigameId::TapGhost => drive_ghost(session, policy, ticket, now),
    };
    if result.is_none() {
        log::debug!("{} bot abandoned a {game} round", policy.name());
        session.discard_round();
    }
    result
}

fn drive_puzzle<S: SnapshotStore>(
    session: &mut CompanionSession<S>,
    policy: &mut dyn PlayerPolicy,
    ticket: RoundTicket,
    now: DateTime<Utc>,
) -> Option<RoundResult> {
    if let Some(result) = settled(session, ticket) {
        return Some(result);
    }
    for _ in 0..MAX_ROUND_TICKS {
        if let Some(result) = session.advance(ticket, PUZZLE_THINK_MS, now) {
            return Some(result);
        }
        let board = *session.active_round()?.as_puzzle()?.board();
        if let Some(index) = policy.puzzle_move(&board) {
            session.puzzle_move(ticket, index, now);
        }
        if let Some(result) = settled(session, ticket) {
            return Some(result);
        }
    }
    None
}

fn drive_memory<S: SnapshotStore>(
    session: &mut CompanionSession<S>,
    policy: &mut dyn PlayerPolicy,
    ticket: RoundTicket,
    now: DateTime<Utc>,
) -> Option<RoundResult> {
    let mut seen: Vec<u8> = Vec::new();
    let mut lit: Option<u8> = None;
    for _ in 0..MAX_ROUND_TICKS {
        if let Some(result) = session.advance(ticket, TICK_MS, now) {
            return Some(result);
        }
        let memory = session.active_round()?.as_memory()?;
        match memory.phase() {
            MemoryPhase::Showing => {
                // A new candle is only counted on the unlit-to-lit edge.
                if lit.is_none()
                    && let Some(candle) = memory.lit()
                {
                    seen.push(candle);
                }
                lit = memory.lit();
            }
            MemoryPhase::Input => {
                lit = None;
                let position = memory.entered().len();
                let expected = *seen.get(position)?;
                let Some(candle) = policy.memory_tap(expected) else {
                    continue;
                };
                match session.memory_tap(ticket, candle, now) {
                    MemoryTap::LevelCleared => seen.clear(),
                    MemoryTap::Won | MemoryTap::Missed => return settled(session, ticket),
                    MemoryTap::Correct | MemoryTap::Ignored => {}
                }
            }
            MemoryPhase::Ready | MemoryPhase::Ended => return settled(session, ticket),
        }
    }
    None
}

fn drive_ghost<S: SnapshotStore>(
    session: &mut CompanionSession<S>,
    policy: &mut dyn PlayerPolicy,
    ticket: RoundTicket,
    now: DateTime<Utc>,
) -> Option<RoundResult> {
    for _ in 0..MAX_ROUND_TICKS {
        let ghost = session.active_round()?.as_ghost()?;
        if ghost.phase() == GhostPhase::Ended {
            return settled(session, ticket);
        }
        let taps = policy.ghost_taps(ghost.ghosts());
        for id in taps {
            session.ghost_tap(ticket, id, now);
        }
        if let Some(result) = session.advance(ticket, TICK_MS, now) {
            return Some(result);
        }
    }
    None
}

/// Result of the round behind `ticket` if it has already been settled.
fn settled<S: SnapshotStore>(
    session: &CompanionSession<S>,
    ticket: RoundTicket,
) -> Option<RoundResult> {
    let finished = session.active_ticket() == Some(ticket)
        && session
            .active_round()
            .is_some_and(|round| round.as_minigame().is_finished());
    if finished {
        session.last_result()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_player_wins_every_round() {
        let tester = GameTester::new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Perfect).with_days(2);
        let summary = tester.run_plan(&plan, 1337);
        assert_eq!(summary.days.len(), 2);
        for game in MinigameId::ALL {
            let tally = summary.metrics.tally(game);
            assert_eq!(tally.played, 2, "{game}");
            assert_eq!(tally.abandoned, 0, "{game}");
        }
        assert_eq!(summary.metrics.tally(MinigameId::ShadowPuzzle).won, 2);
        assert_eq!(summary.metrics.tally(MinigameId::MemoryCandle).won, 2);
        assert!(summary.metrics.invariant_violations.is_empty());
        assert_eq!(summary.metrics.daily_bonuses, 2);
        assert_eq!(summary.final_snapshot.history.len(), 6);
    }

    #[test]
    fn idle_player_abandons_untimed_rounds() {
        let tester = GameTester::new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Idle).with_days(1);
        let summary = tester.run_plan(&plan, 7);
        let metrics = &summary.metrics;
        assert_eq!(metrics.tally(MinigameId::ShadowPuzzle).abandoned, 1);
        assert_eq!(metrics.tally(MinigameId::MemoryCandle).abandoned, 1);
        let ghost = metrics.tally(MinigameId::TapGhost);
        assert_eq!((ghost.played, ghost.won), (1, 0));
        // Daily bonus plus the minimum ghost reward.
        assert_eq!(metrics.lifetime_xp, 5 + 6);
        assert_eq!(summary.final_snapshot.history.len(), 1);
    }

    #[test]
    fn simulation_is_deterministic_per_seed() {
        let tester = GameTester::new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Sloppy).with_days(3);
        let first = tester.run_plan(&plan, 99);
        let second = tester.run_plan(&plan, 99);
        assert_eq!(first.final_snapshot, second.final_snapshot);
        assert_eq!(first.metrics.lifetime_xp, second.metrics.lifetime_xp);
    }

    #[test]
    fn lifetime_xp_sums_thresholds() {
        assert_eq!(lifetime_xp(1, 0), 0);
        assert_eq!(lifetime_xp(2, 5), 55);
        assert_eq!(lifetime_xp(3, 0), 50 + 75);
    }

    #[test]
    fn setup_runs_before_the_first_day() {
        fn sign_in(session: &mut CompanionSession<MemoryStore>) {
            session
                .sign_in("Morticia", "m@example.com", visit_time(simulation_epoch()))
                .unwrap();
        }
        let plan = SimulationPlan::new(GameplayStrategy::Idle)
            .with_days(1)
            .with_setup(sign_in);
        let summary = GameTester::new(false).run_plan(&plan, 3);
        let user = summary.final_snapshot.user.unwrap();
        assert!(!user.is_guest);
        assert_eq!(user.username, "Morticia");
        // The sign-in already paid today's bonus.
        assert!(!summary.days[0].daily_bonus);
    }

    #[test]
    fn expectations_see_the_summary() {
        let plan = SimulationPlan::new(GameplayStrategy::Idle)
            .with_days(0)
            .with_expectation(|summary: &SimulationSummary| {
                anyhow::ensure!(summary.days.is_empty(), "no days expected");
                Ok(())
            });
        let summary = GameTester::new(false).run_plan(&plan, 1);
        assert!(plan.expectations[0].evaluate(&summary).is_ok());
    }
}
