mod common;
mod logic;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::scenario::{SCENARIO_KEYS, get_scenario, list_scenarios};
use common::{day_after, simulation_epoch, split_csv};
use logic::{
    FileStore, GameTester, GameplayStrategy, LogicTester, PlayabilityAggregate,
    PlayabilityMetrics, PlayabilityRecord, SeedInfo, aggregate_playability, resolve_seed_inputs,
    run_playability_analysis, validate_playability_targets,
};
use shadow_game::CompanionSession;

#[derive(Debug, Parser)]
#[command(name = "shadow-tester", version = "0.1.0")]
#[command(
    about = "Automated QA testing for Shadow Companion - scripted bots, scenarios and playability sweeps"
)]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Simulated days per playability run or profile session
    #[arg(long, default_value_t = 7)]
    days: u32,

    /// Bot strategy used for --profile runs
    #[arg(long, default_value = "perfect")]
    #[arg(value_parser = ["perfect", "sloppy", "idle"])]
    strategy: String,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Play --days days on a companion saved at this path, continuing
    /// from where the last run left off
    #[arg(long)]
    profile: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let seed_tokens = split_csv(&args.seeds);
    let seed_infos = resolve_seed_inputs(&seed_tokens)?;
    let game_tester = GameTester::new(args.verbose);

    if let Some(path) = args.profile.as_deref() {
        let seed = seed_infos.first().map_or(logic::seeds::DEFAULT_SEED, |info| info.seed);
        return run_profile(&args, path, seed, &game_tester);
    }

    let scenarios = expand_scenarios(&args.scenarios);
    let logic_seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();
    let all_results = run_logic_scenarios(&args, &scenarios, &logic_seeds, &game_tester);

    let (playability_records, playability_aggregates) =
        gather_playability(&args, &game_tester, &seed_infos)?;

    write_reports(
        &args,
        &all_results,
        playability_records.as_deref(),
        playability_aggregates.as_deref(),
        start_time,
    )?;

    if let Some(aggregates) = playability_aggregates.as_ref() {
        let record_slice = playability_records.as_deref().unwrap_or(&[]);
        validate_playability_targets(aggregates, record_slice)?;
    }

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎃 Shadow Companion Automated Tester".bright_cyan().bold());
    println!("{}", "====================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        scenarios.extend(SCENARIO_KEYS.iter().map(ToString::to_string));
    }
    scenarios
}

fn parse_strategy(name: &str) -> Result<GameplayStrategy> {
    GameplayStrategy::ALL
        .into_iter()
        .find(|strategy| strategy.label().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("unknown strategy: {name}"))
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    logic_seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(*game_tester);

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(logic_tester.run_scenario(&scenario, logic_seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

type PlayabilitySummary = (
    Option<Vec<PlayabilityRecord>>,
    Option<Vec<PlayabilityAggregate>>,
);

fn gather_playability(
    args: &Args,
    game_tester: &GameTester,
    seed_infos: &[SeedInfo],
) -> Result<PlayabilitySummary> {
    if !matches!(args.report.as_str(), "console" | "csv") {
        return Ok((None, None));
    }
    let records = run_playability_analysis(game_tester, seed_infos, args.iterations, args.days)?;
    let aggregates = aggregate_playability(&records);
    Ok((Some(records), Some(aggregates)))
}

/// Continue a saved companion for `args.days` more evenings and write it back.
fn run_profile(args: &Args, path: &Path, seed: u64, game_tester: &GameTester) -> Result<()> {
    let strategy = parse_strategy(&args.strategy)?;
    let mut session = CompanionSession::open(FileStore::new(path), seed);
    let first_day = session
        .last_daily_visit()
        .map_or_else(simulation_epoch, |last| day_after(last, 1));
    println!(
        "{} {} from {first_day} ({} days, {strategy})",
        "📂 Profile".bright_blue().bold(),
        path.display(),
        args.days
    );

    let mut policy = strategy.create_policy(seed);
    let mut metrics = PlayabilityMetrics::default();
    for offset in 0..args.days {
        let date = day_after(first_day, offset);
        let outcome = game_tester.play_day(&mut session, policy.as_mut(), date, &mut metrics);
        log::info!(
            "{date}: level {} after {} rounds",
            outcome.level_after,
            outcome.rounds.len()
        );
    }
    session
        .save()
        .with_context(|| format!("failed to save profile {}", path.display()))?;

    let state = session.engine().state();
    let summary = session.profile_summary();
    println!(
        "💾 Level {} ({}/{} XP) | {} rounds on record | {} diary entries",
        state.level().to_string().bright_white(),
        state.xp(),
        state.xp_to_next_level(),
        summary.games_played,
        session.diary().len()
    );
    if !metrics.invariant_violations.is_empty() {
        for violation in &metrics.invariant_violations {
            eprintln!("❌ {violation}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    playability_records: Option<&[PlayabilityRecord]>,
    playability_aggregates: Option<&[PlayabilityAggregate]>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Shadow Companion Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => {
            if let Some(records) = playability_records {
                logic::reports::generate_csv_report(&mut output_target, records)?;
            } else {
                writeln!(&mut output_target, "{}", logic::reports::CSV_HEADER)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else if let Some(aggregates) = playability_aggregates {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    aggregates,
                    duration,
                )?;
            } else {
                writeln!(&mut output_target, "Playability data unavailable.")?;
            }
        }
    }

    // Machine-readable reports stay parseable; their timing goes to stderr.
    let duration = start_time.elapsed();
    match args.report.as_str() {
        "json" | "csv" => eprintln!("🏁 Total time: {duration:?}"),
        _ => {
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
