use std::path::PathBuf;

use clap::Parser;

use bluff_bench::config::{BenchConfig, ResolvedOutputs};
use bluff_bench::logging::init_logging;
use bluff_bench::simulation::SessionRunner;
use bluff_core::AppInfo;

/// Headless session harness for the bluff engine.
#[derive(Debug, Parser)]
#[command(
    name = "bluff-bench",
    author,
    version,
    about = "Deterministic bluff session simulator"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of sessions to simulate.
    #[arg(long, value_name = "COUNT")]
    sessions: Option<usize>,

    /// Override the turns played per session.
    #[arg(long, value_name = "TURNS")]
    turns: Option<usize>,

    /// Override the RNG seed for session generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the opponent emotion signal.
    #[arg(long, value_name = "EMOTION")]
    emotion: Option<String>,

    /// Exit after validating the configuration (no sessions are run).
    #[arg(long)]
    validate_only: bool,

    /// Dump weight tables with each decision (same as BLUFF_DECISION_DETAILS=1).
    #[arg(long)]
    log_decision_details: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(sessions) = cli.sessions {
        config.sessions.count = sessions;
    }

    if let Some(turns) = cli.turns {
        config.sessions.turns = turns;
    }

    if let Some(seed) = cli.seed {
        config.sessions.seed = Some(seed);
    }

    if let Some(emotion) = cli.emotion {
        config.signals.emotion = emotion;
    }

    if cli.log_decision_details {
        config.logging.decision_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let sessions = config.sessions.count;
    let turns = config.sessions.turns;

    println!(
        "{} ({}) v{}",
        AppInfo::name(),
        AppInfo::codename(),
        AppInfo::version()
    );
    println!(
        "Loaded configuration '{run_id}' ({sessions} session{}, up to {turns} turns each)",
        if sessions == 1 { "" } else { "s" }
    );

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let logging = init_logging(&config.logging, &outputs)?;
    let runner = SessionRunner::new(config, outputs).with_logging(logging);
    let summary = runner.run()?;

    println!(
        "Simulation complete for '{run_id}': {} sessions, {} turns → {} rows at {}",
        summary.sessions_played,
        summary.turns_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        let decisions = &outputs.summary.decisions;
        match decisions.acted_rate() {
            Some(rate) => println!(
                "  AI decisions: {} events, acted {:.1}%, {} joker taunts",
                decisions.count,
                rate * 100.0,
                decisions.joker_taunts
            ),
            None => println!("  AI decisions: none captured"),
        }
    }

    Ok(())
}
