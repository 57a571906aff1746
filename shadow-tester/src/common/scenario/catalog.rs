use anyhow::{Context, Result, anyhow, bail, ensure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;

use super::TestScenario;
use crate::common::{simulation_epoch, visit_time};
use crate::logic::game_tester::{SimulationSummary, progression_violations};
use crate::logic::policy::solve_puzzle;
use crate::logic::{GameplayStrategy, SimulationPlan};
use shadow_game::constants::{
    CANDLE_COUNT, GHOST_MAX_ACTIVE, MEMORY_MAX_LEVEL, PUZZLE_SOLVED, STORAGE_KEY,
};
use shadow_game::minigames::memory::{generate_sequence, sequence_len};
use shadow_game::minigames::puzzle::{Board, shuffle_board, slide_tile, validate_board};
use shadow_game::{
    CompanionSession, CosmeticCatalog, CosmeticKind, GhostPhase, MemoryCandle, MemoryPhase,
    MemoryStore, MemoryTap, Minigame, MinigameId, ProgressionEngine, PuzzleError, Route, Snapshot,
    TapTheGhost,
};

const PUZZLE_BOARDS_PER_SEED: usize = 25;
const XP_AWARDS_PER_SEED: usize = 150;

pub fn progression_curve_scenario() -> TestScenario {
    TestScenario::simulation(
        "Progression Curve and Unlocks",
        SimulationPlan::new(GameplayStrategy::Sloppy)
            .with_days(7)
            .with_expectation(daily_levels_expectation)
            .with_expectation(xp_stream_expectation),
    )
}

pub fn puzzle_solvability_scenario() -> TestScenario {
    TestScenario::simulation(
        "Sliding Puzzle Solvability",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_days(1)
            .with_expectation(round_won_expectation(MinigameId::ShadowPuzzle))
            .with_expectation(shuffled_boards_expectation),
    )
}

pub fn memory_sequences_scenario() -> TestScenario {
    TestScenario::simulation(
        "Memory Candle Sequences",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_days(1)
            .with_expectation(round_won_expectation(MinigameId::MemoryCandle))
            .with_expectation(sequence_shape_expectation)
            .with_expectation(divergence_expectation),
    )
}

pub fn ghost_capacity_scenario() -> TestScenario {
    TestScenario::simulation(
        "Tap the Ghost Capacity and Expiry",
        SimulationPlan::new(GameplayStrategy::Sloppy)
            .with_days(1)
            .with_expectation(ghost_round_expectation),
    )
}

pub fn teardown_safety_scenario() -> TestScenario {
    TestScenario::simulation(
        "Round Teardown Safety",
        SimulationPlan::new(GameplayStrategy::Idle)
            .with_days(0)
            .with_expectation(teardown_expectation),
    )
}

pub fn snapshot_roundtrip_scenario() -> TestScenario {
    TestScenario::simulation(
        "Snapshot Round-Trip",
        SimulationPlan::new(GameplayStrategy::Sloppy)
            .with_days(3)
            .with_expectation(snapshot_expectation)
            .with_expectation(corrupt_snapshot_expectation),
    )
}

fn ensure_clean(engine: &ProgressionEngine, context: &str) -> Result<()> {
    let violations = progression_violations(engine);
    ensure!(
        violations.is_empty(),
        "{context}: {}",
        violations.join("; ")
    );
    Ok(())
}

fn daily_levels_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut previous = 1;
    for day in &summary.days {
        ensure!(
            day.level_after >= previous,
            "level fell from {previous} to {} on {}",
            day.level_after,
            day.date
        );
        previous = day.level_after;
    }
    ensure!(
        summary.metrics.invariant_violations.is_empty(),
        "invariants broken: {:?}",
        summary.metrics.invariant_violations
    );
    Ok(())
}

fn xp_stream_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(summary.seed);
    let mut engine =
        ProgressionEngine::new(CosmeticCatalog::default(), visit_time(simulation_epoch()));
    let mut unlocked: Vec<BTreeSet<String>> = CosmeticKind::ALL
        .iter()
        .map(|&kind| engine.state().unlocked(kind).clone())
        .collect();

    for _ in 0..XP_AWARDS_PER_SEED {
        let amount = match rng.gen_range(0..10) {
            0 => 0,
            1 => rng.gen_range(100..2_000),
            _ => rng.gen_range(1..15),
        };
        let level = engine.state().level();
        let report = engine.apply_xp(amount);
        ensure!(
            report.previous_level == level && engine.state().level() >= level,
            "awarding {amount} XP moved level {level} to {}",
            engine.state().level()
        );
        for (kind, before) in CosmeticKind::ALL.iter().zip(unlocked.iter_mut()) {
            let now = engine.state().unlocked(*kind);
            ensure!(
                now.is_superset(before),
                "{kind} unlocks shrank after {amount} XP"
            );
            before.clone_from(now);
        }
        ensure_clean(&engine, &format!("after {amount} XP"))?;
    }

    let mut fresh =
        ProgressionEngine::new(CosmeticCatalog::default(), visit_time(simulation_epoch()));
    fresh.apply_xp(55);
    let state = fresh.state();
    ensure!(
        (state.level(), state.xp(), state.xp_to_next_level()) == (2, 5, 75),
        "55 XP from fresh should land on level 2 with 5/75, got {} with {}/{}",
        state.level(),
        state.xp(),
        state.xp_to_next_level()
    );
    Ok(())
}

fn round_won_expectation(
    game: MinigameId,
) -> impl Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static {
    move |summary| {
        let tally = summary.metrics.tally(game);
        ensure!(
            tally.played == summary.metrics.days_played && tally.won == tally.played,
            "perfect bot won {}/{} {game} rounds",
            tally.won,
            tally.played
        );
        Ok(())
    }
}

fn first_two_tiles(board: &Board) -> Option<(usize, usize)> {
    let mut tiles = board.iter().enumerate().filter(|&(_, &tile)| tile != 0);
    let (a, _) = tiles.next()?;
    let (b, _) = tiles.next()?;
    Some((a, b))
}

fn shuffled_boards_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(summary.seed);
    for _ in 0..PUZZLE_BOARDS_PER_SEED {
        let board = shuffle_board(&mut rng);
        validate_board(&board).map_err(|err| anyhow!("{board:?} rejected: {err}"))?;
        let path = solve_puzzle(&board).with_context(|| format!("{board:?} has no solution"))?;
        let mut solved = board;
        for index in path {
            ensure!(slide_tile(&mut solved, index), "solver slid a stuck tile");
        }
        ensure!(solved == PUZZLE_SOLVED, "{board:?} did not reach the goal");

        let (a, b) = first_two_tiles(&board).context("board has fewer than two tiles")?;
        let mut swapped = board;
        swapped.swap(a, b);
        ensure!(
            validate_board(&swapped) == Err(PuzzleError::Unsolvable),
            "{swapped:?} should be flagged unsolvable"
        );
    }
    Ok(())
}

fn sequence_shape_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(summary.seed);
    for level in 1..=MEMORY_MAX_LEVEL {
        let sequence = generate_sequence(&mut rng, level);
        ensure!(
            sequence.len() == sequence_len(level),
            "level {level} produced {} candles",
            sequence.len()
        );
        ensure!(
            sequence.iter().all(|&candle| candle < CANDLE_COUNT),
            "level {level} produced an unknown candle in {sequence:?}"
        );
    }
    Ok(())
}

fn divergence_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut game = MemoryCandle::new(ChaCha20Rng::seed_from_u64(summary.seed));
    game.start();
    game.advance(10_000);
    ensure!(
        game.phase() == MemoryPhase::Input,
        "reveal still running after ten seconds"
    );
    let sequence = game.sequence().to_vec();
    let diverge_at = usize::try_from(summary.seed % 3).unwrap_or(0);
    for &candle in &sequence[..diverge_at] {
        ensure!(game.tap(candle) == MemoryTap::Correct, "correct tap rejected");
    }
    let wrong = (sequence[diverge_at] + 1) % CANDLE_COUNT;
    ensure!(game.tap(wrong) == MemoryTap::Missed, "wrong tap not caught");
    ensure!(
        game.entered().len() == diverge_at + 1,
        "round kept accepting taps"
    );
    let result = game.result().context("missed round has no result")?;
    ensure!(!result.won, "missed round counted as a win");
    Ok(())
}

fn ghost_round_expectation(summary: &SimulationSummary) -> Result<()> {
    let tally = summary.metrics.tally(MinigameId::TapGhost);
    ensure!(tally.played == 1, "ghost round did not settle");

    for step in [37 + summary.seed % 50, 250] {
        let mut game = TapTheGhost::new(ChaCha20Rng::seed_from_u64(summary.seed));
        game.start();
        while game.phase() == GhostPhase::Playing {
            game.advance(step);
            ensure!(
                game.ghosts().len() <= GHOST_MAX_ACTIVE,
                "{} ghosts on screen at {} ms",
                game.ghosts().len(),
                game.clock_ms()
            );
            ensure!(
                game.ghosts()
                    .iter()
                    .all(|ghost| ghost.expires_at_ms > game.clock_ms()),
                "expired ghost still visible at {} ms",
                game.clock_ms()
            );
            if game.clock_ms() > 60_000 {
                bail!("ghost round never ended");
            }
        }
        ensure!(
            game.clock_ms() >= 30_000,
            "round ended early at {} ms",
            game.clock_ms()
        );
        ensure!(game.ghosts().is_empty(), "ghosts outlived the round");
        let result = game.result().context("ended round has no result")?;
        ensure!(
            (6..=10).contains(&result.xp),
            "ghost round paid {} XP",
            result.xp
        );
    }
    Ok(())
}

fn teardown_expectation(summary: &SimulationSummary) -> Result<()> {
    let now = visit_time(simulation_epoch());
    let mut session = CompanionSession::new(MemoryStore::new(), summary.seed, now);
    session.login_as_guest(now);
    let xp_before = session.engine().state().xp();

    let ghost = session.start_round(MinigameId::TapGhost, now)?;
    ensure!(session.advance(ghost, 29_000, now).is_none(), "ghost ended early");
    let puzzle = session.start_round(MinigameId::ShadowPuzzle, now)?;
    ensure!(
        session.advance(ghost, 5_000, now).is_none(),
        "replaced ghost round still settled"
    );
    ensure!(
        session.ghost_tap(ghost, 0, now).is_none(),
        "replaced ghost round accepted a tap"
    );
    ensure!(session.active_ticket() == Some(puzzle), "puzzle round lost");

    session.navigate(Route::Home, now);
    ensure!(session.active_round().is_none(), "leaving games kept the round");
    ensure!(
        session.advance(puzzle, 1_000, now).is_none(),
        "discarded puzzle still advanced"
    );

    let memory = session.start_round(MinigameId::MemoryCandle, now)?;
    session.start_round(MinigameId::TapGhost, now)?;
    ensure!(
        session.memory_tap(memory, 0, now) == MemoryTap::Ignored,
        "replaced memory round accepted a tap"
    );
    session.discard_round();

    ensure!(session.history().is_empty(), "discarded rounds reached history");
    ensure!(
        session.engine().state().xp() == xp_before,
        "discarded rounds paid XP"
    );
    Ok(())
}

fn snapshot_expectation(summary: &SimulationSummary) -> Result<()> {
    let snapshot = &summary.final_snapshot;
    let json = snapshot.to_json()?;
    ensure!(
        &Snapshot::from_json(&json)? == snapshot,
        "snapshot changed across JSON"
    );

    let store = MemoryStore::new();
    store.put_raw(STORAGE_KEY, &json);
    let reopened = CompanionSession::open(store, summary.seed);
    ensure!(
        &reopened.snapshot() == snapshot,
        "reopened session differs from the saved snapshot"
    );
    let settled = usize::try_from(summary.metrics.rounds_played()).unwrap_or(usize::MAX);
    ensure!(
        reopened.history().len() == settled,
        "history holds {} rounds, {} were settled",
        reopened.history().len(),
        summary.metrics.rounds_played()
    );
    ensure_clean(reopened.engine(), "reopened snapshot")
}

fn corrupt_snapshot_expectation(summary: &SimulationSummary) -> Result<()> {
    let json = summary.final_snapshot.to_json()?;
    let keep = json.chars().count() / 2;
    let truncated: String = json.chars().take(keep).collect();

    let store = MemoryStore::new();
    store.put_raw(STORAGE_KEY, &truncated);
    let session = CompanionSession::open(store, summary.seed);
    ensure!(
        session.snapshot() == Snapshot::default(),
        "corrupt snapshot did not fall back to defaults"
    );
    ensure_clean(session.engine(), "fallback snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    fn passes(scenario: &TestScenario, seed: u64) {
        let summary = GameTester::new(false).run_plan(&scenario.plan, seed);
        for expectation in &scenario.plan.expectations {
            if let Err(err) = expectation.evaluate(&summary) {
                panic!("{} seed {seed}: {err:#}", scenario.name);
            }
        }
    }

    #[test]
    fn catalog_scenarios_pass_for_a_few_seeds() {
        let scenarios = [
            progression_curve_scenario(),
            puzzle_solvability_scenario(),
            memory_sequences_scenario(),
            ghost_capacity_scenario(),
            teardown_safety_scenario(),
            snapshot_roundtrip_scenario(),
        ];
        for scenario in &scenarios {
            for seed in [1, 1337] {
                passes(scenario, seed);
            }
        }
    }

    #[test]
    fn swapping_two_tiles_flips_solvability() {
        let (a, b) = first_two_tiles(&PUZZLE_SOLVED).unwrap();
        assert_eq!((a, b), (0, 1));
        let mut board = PUZZLE_SOLVED;
        board.swap(a, b);
        assert_eq!(validate_board(&board), Err(PuzzleError::Unsolvable));
    }
}
