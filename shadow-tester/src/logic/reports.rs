use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;
use super::playability::{PlayabilityAggregate, PlayabilityRecord};
use shadow_game::MinigameId;

#[allow(clippy::cast_precision_loss)]
fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    }
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    aggregates: &[PlayabilityAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    // Overall stats
    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(
        out,
        "Success rate: {:.1}%",
        success_rate(passed_tests, total_tests)
    )?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    // Individual results
    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    // Performance summary
    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
        writeln!(out)?;
    }

    write_playability_summary(out, aggregates)
}

fn write_playability_summary(out: &mut dyn Write, aggregates: &[PlayabilityAggregate]) -> Result<()> {
    writeln!(out, "{}", "🎃 Playability Summary".bright_magenta().bold())?;
    writeln!(out, "{}", "======================".magenta())?;
    if aggregates.is_empty() {
        writeln!(out, "No simulated days.")?;
        return Ok(());
    }
    for aggregate in aggregates {
        writeln!(
            out,
            "{} ({} runs)",
            aggregate.scenario_name.bold(),
            aggregate.iterations
        )?;
        writeln!(
            out,
            "   Level: mean {:.2} ± {:.2} | Lifetime XP: mean {:.1} ± {:.1}",
            aggregate.mean_level, aggregate.std_level, aggregate.mean_xp, aggregate.std_xp
        )?;
        writeln!(
            out,
            "   Unlocks: skins {:.2} backgrounds {:.2}",
            aggregate.mean_unlocked_skins, aggregate.mean_unlocked_backgrounds
        )?;
        writeln!(
            out,
            "   Win rate: puzzle {:.0}% memory {:.0}% ghost {:.0}% | abandoned {:.0}%",
            aggregate.puzzle_win_rate * 100.0,
            aggregate.memory_win_rate * 100.0,
            aggregate.ghost_win_rate * 100.0,
            aggregate.abandon_rate * 100.0
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Shadow Companion Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(
        out,
        "- **Success rate**: {:.1}%\n",
        success_rate(passed_tests, total_tests)
    )?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(
            out,
            "### {} {} (seed {})\n",
            status, result.scenario_name, result.seed
        )?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub const CSV_HEADER: &str = "scenario,strategy,seed,days,final_level,final_xp,lifetime_xp,\
level_ups,daily_bonuses,puzzle_won,puzzle_played,memory_won,memory_played,ghost_won,\
ghost_played,abandoned,skins,backgrounds,favorites,violations";

pub fn generate_csv_report(out: &mut dyn Write, records: &[PlayabilityRecord]) -> Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for record in records {
        let metrics = &record.metrics;
        let puzzle = metrics.tally(MinigameId::ShadowPuzzle);
        let memory = metrics.tally(MinigameId::MemoryCandle);
        let ghost = metrics.tally(MinigameId::TapGhost);
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            record.scenario_name,
            record.strategy,
            record.seed_value,
            metrics.days_played,
            metrics.final_level,
            metrics.final_xp,
            metrics.lifetime_xp,
            metrics.level_ups,
            metrics.daily_bonuses,
            puzzle.won,
            puzzle.played,
            memory.won,
            memory.played,
            ghost.won,
            ghost.played,
            metrics.rounds_abandoned(),
            metrics.unlocked_skins,
            metrics.unlocked_backgrounds,
            metrics.favorites,
            metrics.invariant_violations.len()
        )?;
    }
    Ok(())
}
