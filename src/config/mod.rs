//! Configuration management for FinishLine
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::calibration::ProfileLoader;
use crate::features::{
    FeatureScorer, NotabilityLists, ScoringWeights, DEFAULT_NOTABLE_JOCKEYS,
    DEFAULT_NOTABLE_TRAINERS,
};
use crate::harville::{HarvilleOptions, STERN_EXPONENT};
use crate::odds::probability::DEFAULT_FIELD_SIZE_ALPHA;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub harville: HarvilleConfig,
    pub calibration: CalibrationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Multiplier on the market signal
    pub odds_weight: f64,
    /// Bonus when the jockey is on the notable list
    pub jockey_bonus: f64,
    /// Bonus when the trainer is on the notable list
    pub trainer_bonus: f64,
    /// Penalty for scratched / placeholder names
    pub name_penalty: f64,
    /// Case-insensitive name fragments
    pub notable_jockeys: Vec<String>,
    pub notable_trainers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarvilleConfig {
    /// Flatten win probabilities before place/show
    pub use_stern: bool,
    pub stern_exponent: f64,
    /// Uniform-prior weight when win probabilities come from odds alone
    pub field_size_alpha: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// Profile documents, tried in order
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl AppConfig {
    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Scoring defaults
            .set_default("scoring.odds_weight", 1.0)?
            .set_default("scoring.jockey_bonus", 0.75)?
            .set_default("scoring.trainer_bonus", 0.75)?
            .set_default("scoring.name_penalty", 0.15)?
            .set_default("scoring.notable_jockeys", DEFAULT_NOTABLE_JOCKEYS.to_vec())?
            .set_default("scoring.notable_trainers", DEFAULT_NOTABLE_TRAINERS.to_vec())?
            // Harville defaults
            .set_default("harville.use_stern", true)?
            .set_default("harville.stern_exponent", STERN_EXPONENT)?
            .set_default("harville.field_size_alpha", DEFAULT_FIELD_SIZE_ALPHA)?
            // Calibration defaults
            .set_default(
                "calibration.sources",
                vec!["data/calibration_v1.json", "public/data/calibration_v1.json"],
            )?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (FINISHLINE__*)
            .add_source(
                Environment::with_prefix("FINISHLINE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scoring.notable_jockeys")
                    .with_list_parse_key("scoring.notable_trainers")
                    .with_list_parse_key("calibration.sources"),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self> {
        let config = Self::builder()?
            .build()
            .context("Failed to build default configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    /// Reject weights and exponents the engine cannot use
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        for (name, value) in [
            ("scoring.odds_weight", s.odds_weight),
            ("scoring.jockey_bonus", s.jockey_bonus),
            ("scoring.trainer_bonus", s.trainer_bonus),
            ("scoring.name_penalty", s.name_penalty),
        ] {
            if !value.is_finite() {
                bail!("{} must be finite, got {}", name, value);
            }
        }

        let e = self.harville.stern_exponent;
        if !(e.is_finite() && e > 0.0 && e <= 1.0) {
            bail!("harville.stern_exponent must be in (0, 1], got {}", e);
        }
        let alpha = self.harville.field_size_alpha;
        if !(alpha.is_finite() && alpha >= 0.0) {
            bail!("harville.field_size_alpha must be >= 0, got {}", alpha);
        }

        Ok(())
    }

    pub fn scorer(&self) -> FeatureScorer {
        let s = &self.scoring;
        FeatureScorer::new(
            NotabilityLists::new(&s.notable_jockeys, &s.notable_trainers),
            ScoringWeights {
                odds_weight: s.odds_weight,
                jockey_bonus: s.jockey_bonus,
                trainer_bonus: s.trainer_bonus,
                name_penalty: s.name_penalty,
            },
        )
    }

    pub fn harville_options(&self) -> HarvilleOptions {
        HarvilleOptions {
            use_stern: self.harville.use_stern,
            stern_exponent: self.harville.stern_exponent,
        }
    }

    /// Loader over the configured profile sources
    pub fn profile_loader(&self) -> ProfileLoader {
        ProfileLoader::from_paths(&self.calibration.sources)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "weights={}/{}/{}/{} notables={}j/{}t stern={}({}) alpha={} profiles={:?}",
            self.scoring.odds_weight,
            self.scoring.jockey_bonus,
            self.scoring.trainer_bonus,
            self.scoring.name_penalty,
            self.scoring.notable_jockeys.len(),
            self.scoring.notable_trainers.len(),
            self.harville.use_stern,
            self.harville.stern_exponent,
            self.harville.field_size_alpha,
            self.calibration.sources
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
