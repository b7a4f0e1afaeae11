//! Core types used throughout FinishLine
//!
//! Runners, probability vectors, aggregate signals and the decision objects
//! handed back to the service layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runner as it arrives from an external extractor (OCR, form, API body).
///
/// Every field is optional; the scorer decides what a missing value means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRunner {
    #[serde(default, alias = "horse")]
    pub name: Option<String>,
    /// Market odds token, e.g. "9/2", "5-2", "7 to 2"
    #[serde(default, alias = "ml_odds", alias = "odds_token")]
    pub odds: Option<String>,
    #[serde(default)]
    pub jockey: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default, alias = "speedFig")]
    pub speed_fig: Option<i64>,
}

impl RawRunner {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_odds(mut self, odds: &str) -> Self {
        self.odds = Some(odds.to_string());
        self
    }

    pub fn with_jockey(mut self, jockey: &str) -> Self {
        self.jockey = Some(jockey.to_string());
        self
    }

    pub fn with_trainer(mut self, trainer: &str) -> Self {
        self.trainer = Some(trainer.to_string());
        self
    }
}

/// Validated runner. Immutable once scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    /// Never empty
    pub name: String,
    pub odds_token: Option<String>,
    /// Decimal price (stake + profit ratio), always >= 1 when present
    pub decimal_odds: Option<f64>,
    /// Market signal used by the scorer: 0.5 when no odds were given,
    /// 0.0 when a token was given but could not be parsed
    pub implied_prob: f64,
    pub jockey: Option<String>,
    pub trainer: Option<String>,
    pub speed_fig: Option<i64>,
}

/// Runner plus its deterministic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRunner {
    #[serde(flatten)]
    pub runner: Runner,
    /// Position in the caller's input list
    pub input_index: usize,
    pub raw_score: f64,
    /// In [0, 1]; the field leader is 1.0 unless every raw score is <= 0
    pub normalized_score: f64,
    pub features: ScoreFeatures,
}

/// Which scoring terms fired for a runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFeatures {
    pub market_prob: f64,
    pub jockey_hit: bool,
    pub trainer_hit: bool,
    pub suspicious_name: bool,
}

/// Win / place / show probabilities aligned by index with the input vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProbabilities {
    pub win: Vec<f64>,
    pub place: Vec<f64>,
    pub show: Vec<f64>,
}

impl ExtendedProbabilities {
    pub fn len(&self) -> usize {
        self.win.len()
    }

    pub fn is_empty(&self) -> bool {
        self.win.is_empty()
    }
}

/// Aggregate race-level signals fed to the decision engine.
///
/// Percent-like fields may be given on a 0-1 or 0-100 scale; consumers
/// upscale values in [0, 1] by 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSignals {
    pub confidence: f64,
    #[serde(alias = "top3Mass")]
    pub top3_mass: f64,
    #[serde(alias = "gap1to2")]
    pub gap12: f64,
    #[serde(alias = "gap2to3")]
    pub gap23: f64,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default, alias = "class")]
    pub race_class: Option<String>,
}

impl Default for AggregateSignals {
    fn default() -> Self {
        Self {
            confidence: f64::NAN,
            top3_mass: f64::NAN,
            gap12: f64::NAN,
            gap23: f64::NAN,
            distance: None,
            race_class: None,
        }
    }
}

/// Outcome of the calibration-driven rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub stake_recommendation: f64,
    pub allow_win_only: bool,
    pub allow_exacta: bool,
    pub allow_trifecta: bool,
    pub rationale: Vec<String>,
}

/// Coarse status colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalColor {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalColor::Green => write!(f, "green"),
            SignalColor::Yellow => write!(f, "yellow"),
            SignalColor::Red => write!(f, "red"),
        }
    }
}

/// At-a-glance strategy status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub color: SignalColor,
    pub label: String,
    pub action: String,
}

impl fmt::Display for StrategySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.color, self.action)
    }
}

/// Inputs of the fixed-threshold classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyInputs {
    pub confidence: f64,
    pub top3_mass: f64,
    pub gap1: f64,
    pub gap2: f64,
}

impl From<&AggregateSignals> for StrategyInputs {
    fn from(signals: &AggregateSignals) -> Self {
        Self {
            confidence: signals.confidence,
            top3_mass: signals.top3_mass,
            gap1: signals.gap12,
            gap2: signals.gap23,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_runner_accepts_extractor_aliases() {
        let json = r#"{"horse":"Derek's Law","ml_odds":"2/1","speedFig":114}"#;
        let raw: RawRunner = serde_json::from_str(json).unwrap();
        assert_eq!(raw.name.as_deref(), Some("Derek's Law"));
        assert_eq!(raw.odds.as_deref(), Some("2/1"));
        assert_eq!(raw.speed_fig, Some(114));
        assert!(raw.jockey.is_none());
    }

    #[test]
    fn signal_color_serializes_lowercase() {
        let json = serde_json::to_string(&SignalColor::Green).unwrap();
        assert_eq!(json, "\"green\"");
    }
}
