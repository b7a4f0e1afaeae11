//! Deterministic feature scoring
//!
//! Turns raw odds / jockey / trainer strings into a per-runner score and
//! max-normalises it across the field. The notable-name lists are injected
//! so callers and tests can swap them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::odds::{parse_fractional, parse_speed_figure, strip_speed_figure};
use crate::types::{RawRunner, Runner, ScoreFeatures, ScoredRunner};

lazy_static! {
    static ref SUSPICIOUS_NAME_RE: Regex =
        Regex::new(r"scr|scratch|tbd|unknown|\?{2,}|^-$").unwrap();
}

/// Market signal used when a runner carries no odds at all
pub const NEUTRAL_MARKET_PROB: f64 = 0.5;
/// Market signal for odds that are present but unreadable
pub const UNPARSEABLE_MARKET_PROB: f64 = 0.0;

const NORMALIZATION_FLOOR: f64 = 1e-6;

pub const DEFAULT_NOTABLE_JOCKEYS: [&str; 20] = [
    "saez", "prat", "gallardo", "rosario", "velazquez", "smith", "riso", "gomez", "murphy",
    "ortiz", "reyes", "torres", "garcia", "lopez", "ramos", "colon", "mccarthy", "morelos",
    "pincay", "west",
];

pub const DEFAULT_NOTABLE_TRAINERS: [&str; 19] = [
    "asmussen", "cox", "brown", "pletcher", "baffert", "mott", "rivali", "boyce", "campbell",
    "deville", "hartman", "amoss", "maker", "walden", "navarro", "durkin", "russell", "harty",
    "robb",
];

/// Weights of the deterministic score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier on the market signal
    pub odds_weight: f64,
    pub jockey_bonus: f64,
    pub trainer_bonus: f64,
    /// Subtracted for scratched / placeholder names
    pub name_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            odds_weight: 1.0,
            jockey_bonus: 0.75,
            trainer_bonus: 0.75,
            name_penalty: 0.15,
        }
    }
}

/// Notable jockey and trainer name fragments, stored lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotabilityLists {
    jockeys: Vec<String>,
    trainers: Vec<String>,
}

impl NotabilityLists {
    pub fn new<J, T>(jockeys: J, trainers: T) -> Self
    where
        J: IntoIterator,
        J::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        Self {
            jockeys: normalize_names(jockeys),
            trainers: normalize_names(trainers),
        }
    }

    pub fn empty() -> Self {
        Self {
            jockeys: Vec::new(),
            trainers: Vec::new(),
        }
    }

    pub fn is_notable_jockey(&self, jockey: Option<&str>) -> bool {
        matches_any(jockey, &self.jockeys)
    }

    pub fn is_notable_trainer(&self, trainer: Option<&str>) -> bool {
        matches_any(trainer, &self.trainers)
    }

    pub fn jockeys(&self) -> &[String] {
        &self.jockeys
    }

    pub fn trainers(&self) -> &[String] {
        &self.trainers
    }
}

impl Default for NotabilityLists {
    fn default() -> Self {
        Self::new(DEFAULT_NOTABLE_JOCKEYS, DEFAULT_NOTABLE_TRAINERS)
    }
}

fn normalize_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        // an empty fragment would match every name
        .filter(|n| !n.is_empty())
        .collect()
}

/// Case-insensitive substring match against a list of fragments
fn matches_any(term: Option<&str>, bag: &[String]) -> bool {
    let Some(term) = term else {
        return false;
    };
    let lower = term.to_lowercase();
    bag.iter().any(|fragment| lower.contains(fragment.as_str()))
}

/// Placeholder or scratched names: "scr", "scratch", "tbd", "unknown",
/// two or more '?', or exactly "-".
pub fn is_suspicious_name(name: &str) -> bool {
    SUSPICIOUS_NAME_RE.is_match(&name.to_lowercase())
}

/// Market signal for an odds token.
///
/// A missing (or blank) token is neutral, a present but unreadable one
/// scores zero.
pub fn market_probability(odds: Option<&str>) -> f64 {
    match odds.map(str::trim).filter(|t| !t.is_empty()) {
        None => NEUTRAL_MARKET_PROB,
        Some(token) => parse_fractional(token)
            .map(|o| o.implied_probability())
            .unwrap_or(UNPARSEABLE_MARKET_PROB),
    }
}

/// Build a validated runner. `None` when the name is missing or blank.
pub fn runner_from_raw(raw: &RawRunner) -> Option<Runner> {
    let raw_name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;

    let speed_fig = raw.speed_fig.or_else(|| parse_speed_figure(raw_name));
    let name = match strip_speed_figure(raw_name) {
        stripped if stripped.is_empty() => raw_name.to_string(),
        stripped => stripped,
    };

    let odds_token = raw
        .odds
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let decimal_odds = odds_token
        .as_deref()
        .and_then(parse_fractional)
        .map(|o| o.decimal());

    Some(Runner {
        name,
        implied_prob: market_probability(odds_token.as_deref()),
        odds_token,
        decimal_odds,
        jockey: raw.jockey.clone(),
        trainer: raw.trainer.clone(),
        speed_fig,
    })
}

/// Deterministic per-runner scorer
#[derive(Debug, Clone, Default)]
pub struct FeatureScorer {
    notables: NotabilityLists,
    weights: ScoringWeights,
}

impl FeatureScorer {
    pub fn new(notables: NotabilityLists, weights: ScoringWeights) -> Self {
        Self { notables, weights }
    }

    pub fn notables(&self) -> &NotabilityLists {
        &self.notables
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Raw score and the terms that produced it
    pub fn raw_score(&self, runner: &Runner) -> (f64, ScoreFeatures) {
        let features = ScoreFeatures {
            market_prob: runner.implied_prob,
            jockey_hit: self.notables.is_notable_jockey(runner.jockey.as_deref()),
            trainer_hit: self.notables.is_notable_trainer(runner.trainer.as_deref()),
            suspicious_name: is_suspicious_name(&runner.name),
        };

        let w = &self.weights;
        let mut score = w.odds_weight * features.market_prob;
        if features.jockey_hit {
            score += w.jockey_bonus;
        }
        if features.trainer_hit {
            score += w.trainer_bonus;
        }
        if features.suspicious_name {
            score -= w.name_penalty;
        }
        (score, features)
    }

    /// Score, normalise and rank a field.
    ///
    /// Runners without a usable name are dropped. The result is sorted by
    /// normalised score, descending, keeping input order on ties.
    pub fn score_runners(&self, runners: &[RawRunner]) -> Vec<ScoredRunner> {
        let mut scored: Vec<ScoredRunner> = runners
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let Some(runner) = runner_from_raw(raw) else {
                    debug!("Dropping runner #{} without a name", idx);
                    return None;
                };
                let (raw_score, features) = self.raw_score(&runner);
                Some(ScoredRunner {
                    runner,
                    input_index: idx,
                    raw_score,
                    normalized_score: 0.0,
                    features,
                })
            })
            .collect();

        let max_score = scored
            .iter()
            .map(|s| s.raw_score)
            .fold(NORMALIZATION_FLOOR, f64::max);
        for s in &mut scored {
            s.normalized_score = (s.raw_score / max_score).max(0.0);
        }

        // sort_by is stable, so ties keep input order
        scored.sort_by(|a, b| {
            b.normalized_score
                .partial_cmp(&a.normalized_score)
                .unwrap_or(Ordering::Equal)
        });
        scored
    }
}

/// Score a field with the default notable lists and weights.
pub fn score_runners(runners: &[RawRunner]) -> Vec<ScoredRunner> {
    FeatureScorer::default().score_runners(runners)
}
