use anyhow::{Result, ensure};

use super::TestScenario;
use crate::logic::game_tester::SimulationSummary;
use crate::logic::{GameplayStrategy, SimulationPlan};
use shadow_game::constants::{DAILY_VISIT_XP, TAP_REWARD_XP};

pub fn smoke_scenario() -> TestScenario {
    TestScenario::simulation(
        "Smoke Test",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_days(1)
            .with_expectation(smoke_expectation),
    )
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    let [day] = summary.days.as_slice() else {
        anyhow::bail!("expected one simulated day, got {}", summary.days.len());
    };
    ensure!(day.daily_bonus, "first visit should pay the daily bonus");
    ensure!(!day.whisper.is_empty(), "diary should hold today's whisper");
    ensure!(
        day.rounds.len() == 3,
        "expected a settled round of each minigame, got {}",
        day.rounds.len()
    );
    for round in &day.rounds {
        let (min, max) = round.game.xp_range();
        ensure!(
            (min..=max).contains(&round.xp),
            "{} paid {} XP outside {min}..={max}",
            round.game,
            round.xp
        );
    }

    let snapshot = &summary.final_snapshot;
    ensure!(
        snapshot.user.as_ref().is_some_and(|user| user.is_guest),
        "smoke run should sign in as a guest"
    );
    ensure!(snapshot.history.len() == 3, "history should hold three rounds");
    ensure!(snapshot.diary.len() == 1, "diary should hold one entry");

    let earned: u64 = day.rounds.iter().map(|round| u64::from(round.xp)).sum();
    // Perfect play taps the companion ten times, which pays one tap reward.
    let expected = DAILY_VISIT_XP + earned + TAP_REWARD_XP;
    ensure!(
        summary.metrics.lifetime_xp == expected,
        "lifetime XP {} should equal bonus plus rounds plus taps ({expected})",
        summary.metrics.lifetime_xp
    );
    ensure!(
        summary.metrics.invariant_violations.is_empty(),
        "progression invariants broken: {:?}",
        summary.metrics.invariant_violations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    #[test]
    fn smoke_passes_for_default_seed() {
        let scenario = smoke_scenario();
        let summary = GameTester::new(false).run_plan(&scenario.plan, 1337);
        for expectation in &scenario.plan.expectations {
            expectation.evaluate(&summary).unwrap();
        }
    }
}
