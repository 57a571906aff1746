use anyhow::{Context, Result, ensure};
use std::collections::BTreeMap;

use crate::logic::game_tester::{
    GameTester, PlayabilityMetrics, SimulationPlan, SimulationSummary,
};
use crate::logic::policy::GameplayStrategy;
use crate::logic::seeds::SeedInfo;
use shadow_game::MinigameId;

#[derive(Debug, Clone)]
pub struct PlayabilityRecord {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub seed_value: u64,
    pub metrics: PlayabilityMetrics,
}

#[derive(Debug, Clone)]
pub struct PlayabilityAggregate {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub iterations: usize,
    pub mean_level: f64,
    pub std_level: f64,
    pub mean_xp: f64,
    pub std_xp: f64,
    pub mean_unlocked_skins: f64,
    pub mean_unlocked_backgrounds: f64,
    pub puzzle_win_rate: f64,
    pub memory_win_rate: f64,
    pub ghost_win_rate: f64,
    pub abandon_rate: f64,
}

/// Plan every playability run uses for `strategy`.
#[must_use]
pub fn playability_plan(strategy: GameplayStrategy, days: u32) -> SimulationPlan {
    let plan = SimulationPlan::new(strategy).with_days(days);
    match strategy {
        GameplayStrategy::Perfect => plan.with_expectation(perfect_expectation),
        GameplayStrategy::Sloppy => plan.with_expectation(clean_invariants_expectation),
        GameplayStrategy::Idle => plan.with_expectation(idle_expectation),
    }
}

fn clean_invariants_expectation(summary: &SimulationSummary) -> Result<()> {
    let violations = &summary.metrics.invariant_violations;
    ensure!(
        violations.is_empty(),
        "{} progression violations, first: {}",
        violations.len(),
        violations.first().map_or("", String::as_str)
    );
    ensure!(
        summary.metrics.daily_bonuses == summary.metrics.days_played,
        "expected one daily bonus per day, got {} over {} days",
        summary.metrics.daily_bonuses,
        summary.metrics.days_played
    );
    Ok(())
}

fn perfect_expectation(summary: &SimulationSummary) -> Result<()> {
    clean_invariants_expectation(summary)?;
    for game in [MinigameId::ShadowPuzzle, MinigameId::MemoryCandle] {
        let tally = summary.metrics.tally(game);
        ensure!(
            tally.won == summary.metrics.days_played && tally.abandoned == 0,
            "perfect bot won {} of {} {} rounds ({} abandoned)",
            tally.won,
            summary.metrics.days_played,
            game,
            tally.abandoned
        );
    }
    Ok(())
}

fn idle_expectation(summary: &SimulationSummary) -> Result<()> {
    clean_invariants_expectation(summary)?;
    let ghost = summary.metrics.tally(MinigameId::TapGhost);
    ensure!(ghost.won == 0, "idle bot won {} ghost rounds", ghost.won);
    ensure!(
        summary.metrics.rounds_played() == ghost.played,
        "idle bot settled untimed rounds"
    );
    Ok(())
}

pub fn run_playability_analysis(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
    days: u32,
) -> Result<Vec<PlayabilityRecord>> {
    let iterations = iterations.max(1);
    let mut records =
        Vec::with_capacity(seeds.len() * GameplayStrategy::ALL.len() * iterations);

    for strategy in GameplayStrategy::ALL {
        let plan = playability_plan(strategy, days);
        for seed in seeds {
            for iteration in 0..iterations {
                let iteration_offset = u64::try_from(iteration).unwrap_or(0);
                let iteration_seed = seed.seed.wrapping_add(iteration_offset);
                let summary = tester.run_plan(&plan, iteration_seed);
                let context = format!(
                    "Playability expectation failed for strategy {}, seed {} (iteration {})",
                    strategy,
                    seed.seed,
                    iteration + 1
                );
                for expectation in &plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .with_context(|| context.clone())?;
                }

                records.push(PlayabilityRecord {
                    scenario_name: format!("Playability - {strategy}"),
                    strategy,
                    seed_value: iteration_seed,
                    metrics: summary.metrics,
                });
            }
        }
    }

    Ok(records)
}

pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut aggregates: BTreeMap<String, AggregateBuilder> = BTreeMap::new();

    for record in records {
        aggregates
            .entry(record.scenario_name.clone())
            .or_insert_with(|| AggregateBuilder::new(record))
            .ingest(&record.metrics);
    }

    aggregates
        .into_values()
        .map(AggregateBuilder::finish)
        .collect()
}

/// Cross-strategy sanity checks over a finished sweep.
pub fn validate_playability_targets(
    aggregates: &[PlayabilityAggregate],
    records: &[PlayabilityRecord],
) -> Result<()> {
    for record in records {
        ensure!(
            record.metrics.invariant_violations.is_empty(),
            "Progression invariants violated for {} seed {}",
            record.scenario_name,
            record.seed_value
        );
    }

    let find = |strategy: GameplayStrategy| aggregates.iter().find(|a| a.strategy == strategy);
    if let (Some(perfect), Some(idle)) = (
        find(GameplayStrategy::Perfect),
        find(GameplayStrategy::Idle),
    ) {
        ensure!(
            perfect.mean_xp >= idle.mean_xp,
            "Perfect play earned less XP ({:.1}) than idling ({:.1})",
            perfect.mean_xp,
            idle.mean_xp
        );
    }
    Ok(())
}

struct AggregateBuilder {
    scenario_name: String,
    strategy: GameplayStrategy,
    iterations: u32,
    stats_level: RunningStats,
    stats_xp: RunningStats,
    skins_sum: usize,
    backgrounds_sum: usize,
    wins: BTreeMap<MinigameId, (u32, u32)>,
    rounds_started: u32,
    rounds_abandoned: u32,
}

impl AggregateBuilder {
    fn new(record: &PlayabilityRecord) -> Self {
        Self {
            scenario_name: record.scenario_name.clone(),
            strategy: record.strategy,
            iterations: 0,
            stats_level: RunningStats::default(),
            stats_xp: RunningStats::default(),
            skins_sum: 0,
            backgrounds_sum: 0,
            wins: BTreeMap::new(),
            rounds_started: 0,
            rounds_abandoned: 0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn ingest(&mut self, metrics: &PlayabilityMetrics) {
        self.iterations += 1;
        self.stats_level.add(f64::from(metrics.final_level));
        self.stats_xp.add(metrics.lifetime_xp as f64);
        self.skins_sum += metrics.unlocked_skins;
        self.backgrounds_sum += metrics.unlocked_backgrounds;
        for (&game, tally) in &metrics.per_game {
            let entry = self.wins.entry(game).or_default();
            entry.0 += tally.won;
            entry.1 += tally.played;
            self.rounds_started += tally.played + tally.abandoned;
            self.rounds_abandoned += tally.abandoned;
        }
    }

    fn win_rate(&self, game: MinigameId) -> f64 {
        self.wins
            .get(&game)
            .map_or(0.0, |&(won, played)| ratio(won, played))
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> PlayabilityAggregate {
        let runs = f64::from(self.iterations.max(1));
        PlayabilityAggregate {
            scenario_name: self.scenario_name.clone(),
            strategy: self.strategy,
            iterations: usize::try_from(self.iterations).unwrap_or(usize::MAX),
            mean_level: self.stats_level.mean(),
            std_level: self.stats_level.std_dev(),
            mean_xp: self.stats_xp.mean(),
            std_xp: self.stats_xp.std_dev(),
            mean_unlocked_skins: self.skins_sum as f64 / runs,
            mean_unlocked_backgrounds: self.backgrounds_sum as f64 / runs,
            puzzle_win_rate: self.win_rate(MinigameId::ShadowPuzzle),
            memory_win_rate: self.win_rate(MinigameId::MemoryCandle),
            ghost_win_rate: self.win_rate(MinigameId::TapGhost),
            abandon_rate: ratio(self.rounds_abandoned, self.rounds_started),
        }
    }
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / f64::from(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}
