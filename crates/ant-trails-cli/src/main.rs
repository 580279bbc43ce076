use std::fs;
use std::path::PathBuf;

use ant_trails_core::{RunSummary, SimConfig, World};
use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "ant-trails",
    version,
    about = "Run headless ant foraging simulations and print JSON run summaries"
)]
struct Cli {
    /// JSON file with simulation settings; missing fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed. Extra runs use consecutive seeds.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// Override the initial colony size.
    #[arg(long)]
    ants: Option<usize>,

    /// Frames to simulate per run.
    #[arg(long, default_value_t = 3_600)]
    frames: usize,

    /// Seconds per frame before clamping and sub-stepping.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f64,

    /// Record metrics every N frames (the final frame is always recorded).
    #[arg(long, default_value_t = 60)]
    sample_every: usize,

    /// Frames after which a full world snapshot is captured.
    #[arg(long = "snapshot-frame")]
    snapshot_frames: Vec<usize>,

    /// Number of independent runs, executed in parallel.
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Write JSON here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<SimConfig>(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(ants) = cli.ants {
        config.initial_ants = ants;
        config.max_ants = config.max_ants.max(ants);
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

fn run_once(config: SimConfig, cli: &Cli) -> Result<RunSummary> {
    let seed = config.seed;
    let mut world = World::try_new(config)?;
    let summary = world.try_run_experiment_with_snapshots(
        cli.frames,
        cli.frame_dt,
        cli.sample_every,
        &cli.snapshot_frames,
    )?;
    info!(
        seed,
        deliveries = summary.total_deliveries,
        final_food_stored = summary.final_food_stored,
        final_ants = summary.final_ant_count,
        "run finished"
    );
    Ok(summary)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if cli.runs == 0 {
        bail!("--runs must be at least 1");
    }

    info!(
        runs = cli.runs,
        frames = cli.frames,
        seed = config.seed,
        "starting simulation"
    );
    let summaries = (0..cli.runs as u64)
        .into_par_iter()
        .map(|offset| {
            let config = SimConfig {
                seed: config.seed.wrapping_add(offset),
                ..config.clone()
            };
            run_once(config, &cli)
        })
        .collect::<Result<Vec<_>>>()?;

    let json = if summaries.len() == 1 {
        serde_json::to_string_pretty(&summaries[0])?
    } else {
        serde_json::to_string_pretty(&summaries)?
    };
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
