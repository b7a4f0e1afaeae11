//! Percent normalisation and aggregate-signal derivation

use crate::types::AggregateSignals;

/// Bring a percent-like value onto the 0-100 scale.
///
/// Values in `[0, 1]` are treated as fractions and scaled by 100; anything
/// else is taken as already being a percent. Non-finite input yields NaN.
pub fn normalize_pct(value: f64) -> f64 {
    if !value.is_finite() {
        return f64::NAN;
    }
    if (0.0..=1.0).contains(&value) {
        value * 100.0
    } else {
        value
    }
}

impl AggregateSignals {
    /// Derive top-3 mass and rank gaps from a win-probability vector.
    ///
    /// Probabilities are ranked descending; missing ranks count as zero.
    /// The resulting mass and gaps are fractions.
    pub fn from_ranked_probabilities(
        win_probs: &[f64],
        confidence: f64,
        distance: Option<f64>,
        race_class: Option<String>,
    ) -> Self {
        let mut ranked: Vec<f64> = win_probs
            .iter()
            .map(|p| if p.is_finite() { *p } else { 0.0 })
            .collect();
        ranked.sort_by(|a, b| b.total_cmp(a));

        let rank = |i: usize| ranked.get(i).copied().unwrap_or(0.0);
        let (p1, p2, p3) = (rank(0), rank(1), rank(2));

        Self {
            confidence,
            top3_mass: p1 + p2 + p3,
            gap12: (p1 - p2).max(0.0),
            gap23: (p2 - p3).max(0.0),
            distance,
            race_class,
        }
    }
}
