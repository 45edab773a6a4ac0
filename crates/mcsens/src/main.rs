use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use mcsens::report::{comparison, metric_matrix};
use mcsens::{Scenario, init_logging, run_scenario};
use mcsens_core::{ExecutionMode, SensitivityMetric};

#[derive(Parser, Debug)]
#[command(name = "mcsens")]
#[command(about = "Monte Carlo sensitivity analysis of a demo model")]
struct Args {
    /// Scenario YAML file (default: built-in plant demo)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Execution mode: batched or per-pair
    #[arg(short, long)]
    mode: Option<ExecutionMode>,

    /// Perturbations per input row
    #[arg(short)]
    n: Option<usize>,

    /// Perturbation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Also run the other mode and compare forward-call counts
    #[arg(long)]
    compare: bool,

    /// Write perturbation and metric tables as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::plant_demo(),
    };
    if let Some(n) = args.n {
        scenario.config.n = n;
    }
    if let Some(seed) = args.seed {
        scenario.config.seed = Some(seed);
    }
    let mode = args.mode.unwrap_or(scenario.config.mode);

    let table = scenario.build_table()?;
    tracing::info!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        rows = table.nrows(),
        "loaded scenario"
    );

    let run = run_scenario(&scenario, &table, mode)?;
    for metric in [SensitivityMetric::Correlation, SensitivityMetric::R2] {
        println!("{}", metric_matrix(&run.results, metric));
    }
    println!("{}", run.calls);

    if args.compare {
        let other_mode = match mode {
            ExecutionMode::Batched => ExecutionMode::PerPair,
            ExecutionMode::PerPair => ExecutionMode::Batched,
        };
        let other = run_scenario(&scenario, &table, other_mode)?;
        let (batched, per_pair) = match mode {
            ExecutionMode::Batched => (&run.calls, &other.calls),
            ExecutionMode::PerPair => (&other.calls, &run.calls),
        };
        println!();
        print!("{}", comparison(batched, per_pair));
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&run.results)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("writing results to {}", path.display()))?;
        tracing::info!(path = %path.display(), "results written");
    }

    Ok(())
}
