//! Win-probability preparation from market prices.
//!
//! Used when the ranking step upstream supplies no win-probability vector
//! and the engine has to fall back to odds alone.

use serde::{Deserialize, Serialize};

/// Logit intercept of the empirical favourite/longshot correction
const CALIBRATION_A: f64 = 0.04;
/// Logit slope of the empirical favourite/longshot correction
const CALIBRATION_B: f64 = 0.92;

const MIN_PROB: f64 = 0.0005;
/// Even heavy favourites are not locks
const MAX_PROB: f64 = 0.85;

const WILSON_Z: f64 = 1.96;
const WILSON_TRIALS: f64 = 100.0;

/// Default uniform-prior weight for field-size smoothing
pub const DEFAULT_FIELD_SIZE_ALPHA: f64 = 0.6;

/// Win probability with a 95% Wilson interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedWinProb {
    pub p_win: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Raw implied probability `1 / decimal`; invalid prices (<= 1) map to the cap.
pub fn implied_from_decimal(decimal_odds: f64) -> f64 {
    if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
        return MAX_PROB;
    }
    1.0 / decimal_odds
}

/// Remove the bookmaker overround by proportional renormalisation.
pub fn overround_correction(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        let n = raw.len() as f64;
        return vec![1.0 / n; raw.len()];
    }
    raw.iter().map(|p| p / total).collect()
}

/// Field-size smoothing: `(p_i + alpha/n) / sum(p_j + alpha/n)`.
pub fn field_size_adjust(win_probs: &[f64], n_runners: usize, alpha: f64) -> Vec<f64> {
    if win_probs.is_empty() || n_runners == 0 {
        return Vec::new();
    }
    let prior = alpha / n_runners as f64;
    let smoothed: Vec<f64> = win_probs.iter().map(|p| p + prior).collect();
    let total: f64 = smoothed.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return vec![1.0 / n_runners as f64; win_probs.len()];
    }
    smoothed.iter().map(|p| p / total).collect()
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(MIN_PROB, 1.0 - MIN_PROB);
    (p / (1.0 - p)).ln()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic favourite/longshot correction `sigma(a + b * logit(p))`.
///
/// Pulls short favourites down and longshots up slightly.
pub fn empirical_calibration(probs: &[f64]) -> Vec<f64> {
    probs
        .iter()
        .map(|&p| {
            let safe = p.clamp(MIN_PROB, MAX_PROB);
            let adjusted = sigmoid(CALIBRATION_A + CALIBRATION_B * logit(safe));
            adjusted.clamp(MIN_PROB, MAX_PROB)
        })
        .collect()
}

fn wilson_interval(p: f64) -> (f64, f64) {
    let p = p.clamp(MIN_PROB, 1.0 - MIN_PROB);
    let z2 = WILSON_Z * WILSON_Z;
    let n = WILSON_TRIALS;
    let denominator = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denominator;
    let margin = WILSON_Z * ((p * (1.0 - p) / n) + z2 / (4.0 * n * n)).sqrt() / denominator;
    ((center - margin).max(MIN_PROB), (center + margin).min(MAX_PROB))
}

/// Odds-only win probabilities: implied, de-overrounded, calibrated and
/// field-size smoothed, each with a Wilson interval.
pub fn calibrated_win_probs(decimal_odds: &[f64], alpha: f64) -> Vec<CalibratedWinProb> {
    let raw: Vec<f64> = decimal_odds.iter().map(|&d| implied_from_decimal(d)).collect();
    let corrected = overround_correction(&raw);
    let calibrated = empirical_calibration(&corrected);
    let smoothed = field_size_adjust(&calibrated, decimal_odds.len(), alpha);

    smoothed
        .into_iter()
        .map(|p_win| {
            let (ci_low, ci_high) = wilson_interval(p_win);
            CalibratedWinProb {
                p_win,
                ci_low,
                ci_high,
            }
        })
        .collect()
}
