//! Harville place/show extension
//!
//! Given win probabilities, computes the probability that each runner
//! finishes in the top two (place) and top three (show), assuming finishers
//! are drawn by sequential elimination. An optional Stern adjustment
//! flattens extreme win probabilities before the place/show math.
//!
//! Every denominator is guarded with the same epsilon used for clamping.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ExtendedProbabilities;

/// Clamp bound and denominator guard
pub const EPSILON: f64 = 1e-9;
/// Default Stern exponent
pub const STERN_EXPONENT: f64 = 0.95;

/// How win probabilities are prepared before the place/show sums
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvilleOptions {
    pub use_stern: bool,
    pub stern_exponent: f64,
}

impl Default for HarvilleOptions {
    fn default() -> Self {
        Self {
            use_stern: true,
            stern_exponent: STERN_EXPONENT,
        }
    }
}

impl HarvilleOptions {
    pub fn without_stern() -> Self {
        Self {
            use_stern: false,
            ..Default::default()
        }
    }
}

/// Clamp to `[EPSILON, 1 - EPSILON]`; non-finite values count as zero.
pub fn clamp_probability(p: f64) -> f64 {
    let p = if p.is_finite() { p } else { 0.0 };
    p.clamp(EPSILON, 1.0 - EPSILON)
}

/// `p^exponent`, renormalised to sum to 1 unless the total is <= EPSILON.
pub fn stern_adjust(probs: &[f64], exponent: f64) -> Vec<f64> {
    let adjusted: Vec<f64> = probs.iter().map(|p| p.powf(exponent)).collect();
    let total: f64 = adjusted.iter().sum();
    if total > EPSILON {
        adjusted.iter().map(|p| p / total).collect()
    } else {
        adjusted
    }
}

/// P(i finishes 1st or 2nd) = p_i + sum_{j != i} p_j * p_i / (1 - p_j)
fn place_probability(p: &[f64], i: usize) -> f64 {
    let p_i = p[i];
    let mut total = p_i;
    for (j, &p_j) in p.iter().enumerate() {
        if j == i {
            continue;
        }
        let denom = 1.0 - p_j;
        if denom > EPSILON {
            total += p_j * p_i / denom;
        }
    }
    total
}

/// P(i finishes 3rd) = sum_{j != i} sum_{k != i, j} p_j p_k p_i / ((1 - p_j)(1 - p_j - p_k))
fn third_place_probability(p: &[f64], i: usize) -> f64 {
    let p_i = p[i];
    let mut total = 0.0;
    for (j, &p_j) in p.iter().enumerate() {
        if j == i {
            continue;
        }
        let denom1 = 1.0 - p_j;
        for (k, &p_k) in p.iter().enumerate() {
            if k == i || k == j {
                continue;
            }
            let denom2 = 1.0 - p_j - p_k;
            if denom1 > EPSILON && denom2 > EPSILON {
                total += p_j * p_k * p_i / (denom1 * denom2);
            }
        }
    }
    total
}

/// Extend win probabilities to place and show with explicit options.
///
/// The returned `win` array is the clamped input, never the Stern-adjusted
/// vector. Win probabilities are not renormalised.
pub fn extend_with(win_probs: &[f64], options: &HarvilleOptions) -> ExtendedProbabilities {
    let n = win_probs.len();
    match n {
        0 => {
            debug!("Harville: empty field");
            return ExtendedProbabilities::default();
        }
        1 => {
            debug!("Harville: single runner, certain finish");
            return ExtendedProbabilities {
                win: vec![1.0],
                place: vec![1.0],
                show: vec![1.0],
            };
        }
        _ => {}
    }

    let win: Vec<f64> = win_probs.iter().map(|&p| clamp_probability(p)).collect();
    let adjusted = if options.use_stern {
        stern_adjust(&win, options.stern_exponent)
    } else {
        win.clone()
    };

    let mut place = Vec::with_capacity(n);
    let mut show = Vec::with_capacity(n);
    for i in 0..n {
        let top_two = place_probability(&adjusted, i);
        let top_three = top_two + third_place_probability(&adjusted, i);
        place.push(top_two.clamp(0.0, 1.0));
        show.push(top_three.clamp(0.0, 1.0));
    }

    ExtendedProbabilities { win, place, show }
}

/// Extend win probabilities to place and show (Stern adjustment on request).
pub fn extend_win_probabilities(win_probs: &[f64], use_stern: bool) -> ExtendedProbabilities {
    let options = HarvilleOptions {
        use_stern,
        ..Default::default()
    };
    extend_with(win_probs, &options)
}

/// P(i wins, j second) = p_i * p_j / (1 - p_i)
pub fn exacta_probability(win_probs: &[f64], i: usize, j: usize) -> f64 {
    let n = win_probs.len();
    if i == j || i >= n || j >= n {
        return 0.0;
    }
    let p_i = clamp_probability(win_probs[i]);
    let p_j = clamp_probability(win_probs[j]);
    let denom = 1.0 - p_i;
    if denom <= EPSILON {
        return 0.0;
    }
    (p_i * p_j / denom).clamp(0.0, 1.0)
}

/// P(i wins, j second, k third) = p_i p_j p_k / ((1 - p_i)(1 - p_i - p_j))
pub fn trifecta_probability(win_probs: &[f64], i: usize, j: usize, k: usize) -> f64 {
    let n = win_probs.len();
    if i == j || i == k || j == k || i >= n || j >= n || k >= n {
        return 0.0;
    }
    let p_i = clamp_probability(win_probs[i]);
    let p_j = clamp_probability(win_probs[j]);
    let p_k = clamp_probability(win_probs[k]);
    let denom1 = 1.0 - p_i;
    let denom2 = 1.0 - p_i - p_j;
    if denom1 <= EPSILON || denom2 <= EPSILON {
        return 0.0;
    }
    (p_i * p_j * p_k / (denom1 * denom2)).clamp(0.0, 1.0)
}
