use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fire_mc_core::{
    run, FuelType, IgnitionPolicy, Landscape, RunConfig, RunResult, SimError, WeatherScenario,
    WeatherState,
};
use tracing::{error, info};

/// Burn-probability run over a uniform landscape
#[derive(Parser, Debug)]
#[command(name = "fire-mc")]
#[command(about = "Monte Carlo wildfire burn-probability runner", long_about = None)]
struct Args {
    /// Number of realizations
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Worker threads (0 = one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum simulated duration per realization in minutes
    #[arg(long)]
    max_duration: Option<f32>,

    /// Integration time step in minutes
    #[arg(long)]
    time_step: Option<f32>,

    /// Few realizations and a short horizon, for smoke runs
    #[arg(short, long)]
    quick: bool,

    /// Base seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// TOML run configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wall-clock limit in seconds
    #[arg(long)]
    wall_clock_limit: Option<f64>,

    /// Grid width in cells
    #[arg(long, default_value_t = 100)]
    width: usize,

    /// Grid height in cells
    #[arg(long, default_value_t = 100)]
    height: usize,

    /// Cell size in metres
    #[arg(long, default_value_t = 30.0)]
    cell_size: f32,

    /// FBP fuel type (C1-C7, D1, D2, M1-M4, S1-S3, O1a, O1b)
    #[arg(short, long, default_value = "C2")]
    fuel: String,

    /// Fine Fuel Moisture Code
    #[arg(long, default_value_t = 90.0)]
    ffmc: f32,

    /// Duff Moisture Code (with --dc, derives the buildup index)
    #[arg(long, requires = "dc", conflicts_with = "bui")]
    dmc: Option<f32>,

    /// Drought Code
    #[arg(long, requires = "dmc", conflicts_with = "bui")]
    dc: Option<f32>,

    /// Buildup Index [default: 80]
    #[arg(long)]
    bui: Option<f32>,

    /// 10 m wind speed in km/h
    #[arg(long, default_value_t = 20.0)]
    wind_speed: f32,

    /// Direction the wind blows from, degrees clockwise from north
    #[arg(long, default_value_t = 270.0)]
    wind_direction: f32,

    /// Ignition cell as x,y (repeatable); random ignition when omitted
    #[arg(long, value_parser = parse_cell)]
    ignition: Vec<(usize, usize)>,

    /// Disable ember spotting
    #[arg(long)]
    no_spotting: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn parse_cell(value: &str) -> Result<(usize, usize), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{value}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{value}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{value}': {e}"))?;
    Ok((x, y))
}

const DEFAULT_BUI: f32 = 80.0;

fn build_config(args: &Args) -> Result<RunConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_toml_file(path)?,
        None => RunConfig::default(),
    };
    if args.quick {
        let quick = RunConfig::quick();
        config.iterations = quick.iterations;
        config.simulation.time_step = quick.simulation.time_step;
        config.simulation.max_duration = quick.simulation.max_duration;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(max_duration) = args.max_duration {
        config.simulation.max_duration = max_duration;
    }
    if let Some(time_step) = args.time_step {
        config.simulation.time_step = time_step;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.wall_clock_limit.is_some() {
        config.wall_clock_limit = args.wall_clock_limit;
    }
    if !args.ignition.is_empty() {
        config.ignition = IgnitionPolicy::Fixed(args.ignition.clone());
    }
    if args.no_spotting {
        config.spotting.enabled = false;
    }
    Ok(config)
}

fn build_weather(args: &Args) -> WeatherState {
    match (args.dmc, args.dc) {
        (Some(dmc), Some(dc)) => {
            WeatherState::from_codes(args.ffmc, dmc, dc, args.wind_speed, args.wind_direction)
        }
        _ => WeatherState::with_buildup(
            args.ffmc,
            args.bui.unwrap_or(DEFAULT_BUI),
            args.wind_speed,
            args.wind_direction,
        ),
    }
}

fn execute(args: &Args) -> Result<RunResult, SimError> {
    let config = build_config(args)?;
    let fuel: FuelType = args.fuel.parse()?;
    let landscape = Landscape::uniform(args.width, args.height, args.cell_size, fuel)?;
    let weather = WeatherScenario::constant(build_weather(args));

    info!(
        fuel = fuel.name(),
        width = args.width,
        height = args.height,
        iterations = config.iterations,
        "Running burn-probability ensemble"
    );
    run(&landscape, &weather, &config)
}

fn print_report(result: &RunResult) {
    let summary = &result.summary;
    let stats = &result.statistics;
    let probabilities = stats.burn_probability_grid();
    let touched = probabilities.iter().filter(|&&p| p > 0.0).count();
    let peak_intensity = stats
        .max_intensity_grid()
        .iter()
        .copied()
        .fold(0.0_f32, f32::max);

    println!("=== Burn Probability Run ===\n");
    println!(
        "Realizations: {} requested | {} completed | {} truncated | {} failed | {} cancelled",
        summary.requested, summary.completed, summary.truncated, summary.failed, summary.cancelled
    );
    println!("Wall clock: {:.2}s", summary.wall_clock_secs);
    println!("Mean burned area: {:.2} ha", summary.mean_burned_area_ha);
    println!(
        "Cells with non-zero burn probability: {} of {}",
        touched,
        probabilities.len()
    );
    println!("Peak intensity: {peak_intensity:.0} kW/m");
    for (cause, count) in &summary.failure_causes {
        println!("  failure: {cause} x{count}");
    }
    for diagnostic in &summary.diagnostics {
        println!("  diagnostic: {diagnostic:?}");
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match execute(&args) {
        Ok(result) => {
            if args.json {
                match serde_json::to_string_pretty(&result.summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize summary");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_report(&result);
            }
            ExitCode::SUCCESS
        }
        Err(err @ SimError::TooManyFailedRealizations { .. }) => {
            error!(error = %err, "Run aborted");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(error = %err, "Run failed");
            ExitCode::FAILURE
        }
    }
}
