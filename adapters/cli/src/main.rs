#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line host that runs a Tile Tycoon session and reports on it.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tile_tycoon_core::{Difficulty, Owner};
use tile_tycoon_system_session::{Session, SessionConfig, Summary, WorldSize};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a Tile Tycoon simulation without a window and prints where it ended.
#[derive(Parser, Debug)]
#[command(name = "tile-tycoon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file holding a session configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid size preset
    #[arg(long)]
    size: Option<SizeArg>,

    /// Grid width, overrides the preset
    #[arg(long)]
    width: Option<u32>,

    /// Grid height, overrides the preset
    #[arg(long)]
    height: Option<u32>,

    /// Number of computer opponents (1-5)
    #[arg(short, long)]
    opponents: Option<usize>,

    /// Opponent pace and inflation pressure
    #[arg(short, long)]
    difficulty: Option<DifficultyArg>,

    /// Seed for every random stream
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ticks to simulate
    #[arg(short, long, default_value = "2400")]
    ticks: u32,

    /// Seconds per tick
    #[arg(long, default_value = "0.25")]
    dt: f64,

    /// Log filter, falls back to RUST_LOG and then to "info"
    #[arg(long)]
    log: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SizeArg {
    Small,
    Medium,
    Large,
}

impl From<SizeArg> for WorldSize {
    fn from(size: SizeArg) -> Self {
        match size {
            SizeArg::Small => Self::Small,
            SizeArg::Medium => Self::Medium,
            SizeArg::Large => Self::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(difficulty: DifficultyArg) -> Self {
        match difficulty {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let config = load_config(&args)?;
    if args.dump_config {
        let text = toml::to_string_pretty(&config).context("failed to encode configuration")?;
        print!("{text}");
        return Ok(());
    }

    let dt = Duration::try_from_secs_f64(args.dt)
        .ok()
        .filter(|dt| !dt.is_zero())
        .with_context(|| format!("--dt must be a positive number of seconds, got {}", args.dt))?;

    let mut session = Session::new(config).context("invalid session configuration")?;
    let mut ticks = 0;
    while ticks < args.ticks && session.outcome().is_none() {
        session.tick(dt);
        let _ = session.drain_events();
        ticks += 1;
    }
    info!(ticks, outcome = ?session.outcome(), "simulation finished");

    let summary = session.summary();
    if args.json {
        let text =
            serde_json::to_string_pretty(&summary).context("failed to encode summary as JSON")?;
        println!("{text}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn init_tracing(directive: Option<&str>) {
    let filter = directive
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    if let Some(size) = args.size {
        config = config.with_size(size.into());
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(opponents) = args.opponents {
        config.opponents = opponents;
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty.into();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn print_summary(summary: &Summary) {
    println!("elapsed: {:.1}s", summary.elapsed_secs);
    match summary.outcome {
        Some(outcome) => println!("outcome: {outcome:?}"),
        None => println!("outcome: undecided"),
    }
    println!(
        "multipliers: survey {:.3}, tile {:.3}, building {:.3}",
        summary.survey_multiplier, summary.tile_multiplier, summary.building_multiplier
    );

    println!();
    println!(
        "{:<8} {:<10} {:>10} {:>6} {:>9} {:>10} {:>10}",
        "owner", "phase", "money", "tiles", "buildings", "earned", "spent"
    );
    for standing in &summary.standings {
        let phase = standing
            .phase
            .map_or_else(|| "-".to_owned(), |phase| format!("{phase:?}").to_lowercase());
        let stats = &standing.stats;
        println!(
            "{:<8} {:<10} {:>10} {:>6} {:>9} {:>10} {:>10}",
            standing.owner.to_string(),
            phase,
            stats.money,
            stats.tiles_owned,
            stats.buildings,
            stats.money_generated,
            stats.money_spent
        );
    }

    println!();
    println!("market:");
    for (resource, price) in &summary.prices {
        println!("  {:<14} {price:>8.2}", resource.to_string());
    }

    let player_tiles = summary
        .territory
        .iter()
        .filter(|claim| claim.owner == Owner::Player)
        .count();
    println!();
    println!(
        "territory: {} tiles claimed, {player_tiles} by the player",
        summary.territory.len()
    );
}
