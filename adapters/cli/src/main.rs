#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Sprout Siege encounter headlessly.

mod autopilot;
mod encounter;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::simulation::{RunOptions, Simulation};

/// Highest accepted tick rate; the tick length stays well above a nanosecond.
const MAX_TICK_HZ: i64 = 10_000;

/// Runs a Sprout Siege encounter on a fixed tick and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "sprout-siege", version)]
struct Cli {
    /// Encounter TOML file; the bundled meadow encounter is used when omitted.
    #[arg(long, value_name = "PATH")]
    encounter: Option<PathBuf>,
    /// Game time, in seconds, after which the run is called.
    #[arg(long, default_value_t = 180.0)]
    seconds: f32,
    /// Simulation ticks per second.
    #[arg(
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TICK_HZ)
    )]
    tick_hz: u32,
    /// Overrides the wave spawner seed of the encounter.
    #[arg(long)]
    seed: Option<u64>,
    /// Lets a scripted player fight the encounter.
    #[arg(long)]
    autopilot: bool,
    /// Pauses the game for one second of frames once this much game time passed.
    #[arg(long, value_name = "SECONDS")]
    pause_at: Option<f32>,
    /// Lowers the default log filter to debug.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .try_init();
}

/// Entry point for the Sprout Siege command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let duration = Duration::try_from_secs_f32(cli.seconds)
        .with_context(|| format!("--seconds must be non-negative, got {}", cli.seconds))?;
    let pause_at = cli
        .pause_at
        .map(Duration::try_from_secs_f32)
        .transpose()
        .context("--pause-at must be non-negative")?;

    let mut encounter = match &cli.encounter {
        Some(path) => encounter::load(path)?,
        None => encounter::builtin()?,
    };
    if let Some(seed) = cli.seed {
        encounter.spawner.rng_seed = seed;
    }
    info!(
        "encounter '{}' with {} waves",
        encounter.name,
        encounter.spawner.waves.len()
    );

    let options = RunOptions {
        duration,
        tick: Duration::from_secs(1) / cli.tick_hz,
        autopilot: cli.autopilot,
        pause_at,
        pause_frames: cli.tick_hz,
    };
    let simulation = Simulation::new(encounter);
    println!("{}", simulation.banner());
    let summary = simulation.run(&options);
    print!("{summary}");
    Ok(())
}
