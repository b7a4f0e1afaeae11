//! FinishLine CLI
//!
//! Evaluates one race card and prints the recommendation as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use finishline::calibration::{FileProfileSource, ProfileLoader};
use finishline::config::{AppConfig, LoggingConfig};
use finishline::engine::{RaceCard, RecommendationEngine};

#[derive(Parser)]
#[command(name = "finishline")]
#[command(author = "FinishLine Team")]
#[command(version)]
#[command(about = "Win/place/show probabilities and calibrated wager gates for a race card", long_about = None)]
struct Cli {
    /// Race card JSON: {runners, win_probs?, confidence?, distance?, race_class?}
    race_card: PathBuf,

    /// Calibration profile (JSON or YAML), tried before configured sources
    #[arg(short, long, env = "FINISHLINE_PROFILE")]
    profile: Option<PathBuf>,

    /// Skip the Stern adjustment
    #[arg(long)]
    no_stern: bool,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},finishline={}", cfg.level, cfg.level)));

    // stdout carries the recommendation
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    init_logging(&config.logging);
    info!("⚙️  Config: {}", config);

    if cli.no_stern {
        config.harville.use_stern = false;
    }

    let mut loader = ProfileLoader::new();
    if let Some(path) = &cli.profile {
        loader = loader.with_source(Box::new(FileProfileSource::new(path)));
    }
    for path in &config.calibration.sources {
        loader = loader.with_source(Box::new(FileProfileSource::new(path)));
    }
    let loaded = loader.load();
    debug!("Profile source: {}", loaded.source);

    let document = fs::read_to_string(&cli.race_card)
        .with_context(|| format!("Failed to read race card {}", cli.race_card.display()))?;
    let card: RaceCard = serde_json::from_str(&document)
        .with_context(|| format!("Failed to parse race card {}", cli.race_card.display()))?;

    let engine = RecommendationEngine::from_config(&config, loaded.profile);
    let recommendation = engine.evaluate(&card);

    let output = if cli.pretty {
        serde_json::to_string_pretty(&recommendation)?
    } else {
        serde_json::to_string(&recommendation)?
    };
    println!("{}", output);

    Ok(())
}
