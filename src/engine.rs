//! End-to-end race evaluation
//!
//! score runners -> win probabilities -> place/show -> aggregate signals ->
//! decision + strategy. Pure: the profile is a snapshot held by the engine.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::CalibrationProfile;
use crate::config::AppConfig;
use crate::decision::DecisionEngine;
use crate::features::FeatureScorer;
use crate::harville::{self, HarvilleOptions};
use crate::odds::probability::DEFAULT_FIELD_SIZE_ALPHA;
use crate::odds::{calibrated_win_probs, parse_market_odds};
use crate::strategy::StrategyClassifier;
use crate::types::{
    AggregateSignals, DecisionResult, ExtendedProbabilities, RawRunner, ScoredRunner,
    StrategySignal,
};
use crate::value::{
    compute_value_metrics, rank_descending, ValueInputs, ValueMetrics, DEFAULT_MAX_KELLY,
};

/// Fill price when no runner in the field has readable odds
pub const DEFAULT_FIELD_DECIMAL: f64 = 6.0;

const MIN_DERIVED_CONFIDENCE: f64 = 3.0;
const MAX_DERIVED_CONFIDENCE: f64 = 99.0;

/// One race as handed to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceCard {
    #[serde(default, alias = "horses")]
    pub runners: Vec<RawRunner>,
    /// Win probabilities aligned with `runners` (input order)
    #[serde(default, alias = "winProbs")]
    pub win_probs: Option<Vec<f64>>,
    /// Model confidence, 0-1 or 0-100
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default, alias = "class")]
    pub race_class: Option<String>,
}

/// Where the win-probability vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinProbSource {
    Supplied,
    Odds,
}

/// Harville exotics for the top of the win ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExoticsOutlook {
    /// Runner names in predicted finishing order
    pub order: Vec<String>,
    pub exacta: Option<f64>,
    pub trifecta: Option<f64>,
}

/// Value view of one runner, aligned by index with `Recommendation::scored`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerValue {
    pub name: String,
    /// Market price, or the field average when unreadable
    pub decimal_odds: f64,
    pub odds_filled: bool,
    #[serde(flatten)]
    pub metrics: ValueMetrics,
    pub rank_win: usize,
    /// Only runners with positive win EV are ranked
    pub rank_value: Option<usize>,
    /// Only runners with a positive Kelly stake are ranked
    pub rank_kelly: Option<usize>,
}

/// Decimal price per runner plus whether it was filled in.
///
/// Runners without readable odds take the average price of the priced
/// runners, or [`DEFAULT_FIELD_DECIMAL`] when none are priced.
pub fn field_decimal_odds(scored: &[ScoredRunner]) -> Vec<(f64, bool)> {
    let quoted: Vec<Option<f64>> = scored
        .iter()
        .map(|s| {
            s.runner.decimal_odds.or_else(|| {
                s.runner
                    .odds_token
                    .as_deref()
                    .and_then(parse_market_odds)
                    .map(|q| q.decimal)
            })
        })
        .collect();

    let priced: Vec<f64> = quoted.iter().flatten().copied().collect();
    let fill = if priced.is_empty() {
        DEFAULT_FIELD_DECIMAL
    } else {
        priced.iter().sum::<f64>() / priced.len() as f64
    };

    quoted
        .into_iter()
        .map(|q| match q {
            Some(d) => (d, false),
            None => (fill, true),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Ranked by normalised score
    pub scored: Vec<ScoredRunner>,
    /// Aligned by index with `scored`
    pub probabilities: ExtendedProbabilities,
    pub win_prob_source: WinProbSource,
    pub signals: AggregateSignals,
    pub decision: DecisionResult,
    pub strategy: StrategySignal,
    pub exotics: ExoticsOutlook,
    pub value: Vec<RunnerValue>,
    pub profile_version: String,
}

pub struct RecommendationEngine {
    scorer: FeatureScorer,
    options: HarvilleOptions,
    field_size_alpha: f64,
    profile: CalibrationProfile,
    decision: DecisionEngine,
    classifier: StrategyClassifier,
}

impl RecommendationEngine {
    pub fn new(scorer: FeatureScorer, options: HarvilleOptions, profile: CalibrationProfile) -> Self {
        Self {
            scorer,
            options,
            field_size_alpha: DEFAULT_FIELD_SIZE_ALPHA,
            profile,
            decision: DecisionEngine::new(),
            classifier: StrategyClassifier::default(),
        }
    }

    pub fn from_config(config: &AppConfig, profile: CalibrationProfile) -> Self {
        Self::new(config.scorer(), config.harville_options(), profile)
            .with_field_size_alpha(config.harville.field_size_alpha)
    }

    pub fn with_field_size_alpha(mut self, alpha: f64) -> Self {
        self.field_size_alpha = alpha;
        self
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    fn win_probabilities(&self, card: &RaceCard, scored: &[ScoredRunner]) -> (Vec<f64>, WinProbSource) {
        if let Some(supplied) = &card.win_probs {
            if supplied.len() == card.runners.len() {
                let aligned = scored
                    .iter()
                    .map(|s| supplied[s.input_index])
                    .collect();
                return (aligned, WinProbSource::Supplied);
            }
            warn!(
                "win_probs has {} entries for {} runners, deriving from odds",
                supplied.len(),
                card.runners.len()
            );
        }

        let decimals: Vec<f64> = field_decimal_odds(scored).into_iter().map(|(d, _)| d).collect();
        let probs = calibrated_win_probs(&decimals, self.field_size_alpha)
            .into_iter()
            .map(|c| c.p_win)
            .collect();
        (probs, WinProbSource::Odds)
    }

    /// Confidence from the card, else the top win probability as a percent.
    fn confidence(card: &RaceCard, win: &[f64]) -> f64 {
        if let Some(c) = card.confidence {
            return c;
        }
        let top = win.iter().copied().fold(f64::NAN, f64::max);
        if top.is_finite() {
            (top * 100.0).clamp(MIN_DERIVED_CONFIDENCE, MAX_DERIVED_CONFIDENCE)
        } else {
            f64::NAN
        }
    }

    fn exotics(scored: &[ScoredRunner], win: &[f64]) -> ExoticsOutlook {
        let mut ranked: Vec<usize> = (0..win.len()).collect();
        ranked.sort_by(|&a, &b| win[b].total_cmp(&win[a]));
        ranked.truncate(3);

        let exacta = match ranked[..] {
            [i, j, ..] => Some(harville::exacta_probability(win, i, j)),
            _ => None,
        };
        let trifecta = match ranked[..] {
            [i, j, k] => Some(harville::trifecta_probability(win, i, j, k)),
            _ => None,
        };

        ExoticsOutlook {
            order: ranked.iter().map(|&i| scored[i].runner.name.clone()).collect(),
            exacta,
            trifecta,
        }
    }

    fn value(scored: &[ScoredRunner], probabilities: &ExtendedProbabilities) -> Vec<RunnerValue> {
        let prices = field_decimal_odds(scored);
        let metrics: Vec<ValueMetrics> = prices
            .iter()
            .enumerate()
            .map(|(i, &(win_odds, _))| {
                compute_value_metrics(
                    &ValueInputs {
                        p_win: probabilities.win[i],
                        p_place: probabilities.place[i],
                        p_show: probabilities.show[i],
                        win_odds,
                        place_odds: None,
                        show_odds: None,
                    },
                    DEFAULT_MAX_KELLY,
                )
            })
            .collect();

        let rank_win = rank_descending(&probabilities.win, |_| true);
        let evs: Vec<f64> = metrics.iter().map(|m| m.ev_win).collect();
        let kellys: Vec<f64> = metrics.iter().map(|m| m.kelly_win).collect();
        let rank_value = rank_descending(&evs, |ev| ev > 0.0);
        let rank_kelly = rank_descending(&kellys, |k| k > 0.0);

        scored
            .iter()
            .zip(prices)
            .zip(metrics)
            .enumerate()
            .map(|(i, ((s, (decimal_odds, odds_filled)), metrics))| RunnerValue {
                name: s.runner.name.clone(),
                decimal_odds,
                odds_filled,
                metrics,
                rank_win: rank_win[i].unwrap_or(i + 1),
                rank_value: rank_value[i],
                rank_kelly: rank_kelly[i],
            })
            .collect()
    }

    pub fn evaluate(&self, card: &RaceCard) -> Recommendation {
        let scored = self.scorer.score_runners(&card.runners);
        let (win_probs, win_prob_source) = self.win_probabilities(card, &scored);
        let probabilities = harville::extend_with(&win_probs, &self.options);

        let signals = AggregateSignals::from_ranked_probabilities(
            &probabilities.win,
            Self::confidence(card, &probabilities.win),
            card.distance,
            card.race_class.clone(),
        );
        let decision = self.decision.decide(&signals, &self.profile);
        let strategy = self.classifier.classify_signals(&signals);
        let exotics = Self::exotics(&scored, &probabilities.win);
        let value = Self::value(&scored, &probabilities);

        info!(
            "🏇 {} runners ({} scored, {:?}) | {} | stake={} win_only={} exacta={} trifecta={} | profile={}",
            card.runners.len(),
            scored.len(),
            win_prob_source,
            strategy,
            decision.stake_recommendation,
            decision.allow_win_only,
            decision.allow_exacta,
            decision.allow_trifecta,
            self.profile.version
        );

        Recommendation {
            scored,
            probabilities,
            win_prob_source,
            signals,
            decision,
            strategy,
            exotics,
            value,
            profile_version: self.profile.version.clone(),
        }
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(
            FeatureScorer::default(),
            HarvilleOptions::default(),
            CalibrationProfile::default(),
        )
    }
}
