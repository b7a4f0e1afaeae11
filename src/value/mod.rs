//! Expected value and Kelly sizing per runner

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quarter-Kelly cap
pub const DEFAULT_MAX_KELLY: f64 = 0.25;
/// Model probability must beat the implied probability by this much
pub const DEFAULT_MIN_EDGE: f64 = 0.01;

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Expected profit per unit staked, `p * decimal - 1`, rounded to 4 places.
/// Non-positive prices lose the whole stake.
pub fn expected_value(p_win: f64, decimal_odds: f64) -> f64 {
    if !(decimal_odds > 0.0) {
        return -1.0;
    }
    round4(p_win * decimal_odds - 1.0)
}

/// Kelly fraction `(b*p - q) / b`, clamped to `[0, max_kelly]`.
///
/// Zero when the price is <= 1 or the edge over the implied probability is
/// below `min_edge`.
pub fn kelly_fraction(p_win: f64, decimal_odds: f64, max_kelly: f64, min_edge: f64) -> f64 {
    if !(decimal_odds > 1.0) || !p_win.is_finite() {
        return 0.0;
    }
    let b = decimal_odds - 1.0;
    let q = 1.0 - p_win;
    let kelly = (b * p_win - q) / b;

    let edge = p_win - 1.0 / decimal_odds;
    if edge < min_edge {
        return 0.0;
    }
    kelly.max(0.0).min(max_kelly)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Win,
    Place,
    Show,
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Win => write!(f, "win"),
            BetType::Place => write!(f, "place"),
            BetType::Show => write!(f, "show"),
        }
    }
}

/// EV and Kelly for each pool. Place/show fields are `None` without a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueMetrics {
    pub ev_win: f64,
    pub ev_place: Option<f64>,
    pub ev_show: Option<f64>,
    pub kelly_win: f64,
    pub kelly_place: Option<f64>,
    pub kelly_show: Option<f64>,
    /// Highest-EV pool with a positive EV and Kelly stake
    pub best_bet: Option<BetType>,
}

/// Win/place/show probabilities and the prices on offer for one runner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueInputs {
    pub p_win: f64,
    pub p_place: f64,
    pub p_show: f64,
    pub win_odds: f64,
    pub place_odds: Option<f64>,
    pub show_odds: Option<f64>,
}

fn pool_metrics(p: f64, odds: Option<f64>, max_kelly: f64) -> (Option<f64>, Option<f64>) {
    match odds.filter(|o| *o > 1.0) {
        Some(o) => (
            Some(expected_value(p, o)),
            Some(round4(kelly_fraction(p, o, max_kelly, DEFAULT_MIN_EDGE))),
        ),
        None => (None, None),
    }
}

pub fn compute_value_metrics(inputs: &ValueInputs, max_kelly: f64) -> ValueMetrics {
    let ev_win = expected_value(inputs.p_win, inputs.win_odds);
    let kelly_win = round4(kelly_fraction(
        inputs.p_win,
        inputs.win_odds,
        max_kelly,
        DEFAULT_MIN_EDGE,
    ));
    let (ev_place, kelly_place) = pool_metrics(inputs.p_place, inputs.place_odds, max_kelly);
    let (ev_show, kelly_show) = pool_metrics(inputs.p_show, inputs.show_odds, max_kelly);

    let candidates = [
        (BetType::Win, Some(ev_win), Some(kelly_win)),
        (BetType::Place, ev_place, kelly_place),
        (BetType::Show, ev_show, kelly_show),
    ];
    // first pool wins ties
    let mut best: Option<(BetType, f64)> = None;
    for (bet, ev, kelly) in candidates {
        let (Some(ev), Some(kelly)) = (ev, kelly) else {
            continue;
        };
        if ev > 0.0 && kelly > 0.0 && best.map_or(true, |(_, top)| ev > top) {
            best = Some((bet, ev));
        }
    }

    ValueMetrics {
        ev_win,
        ev_place,
        ev_show,
        kelly_win,
        kelly_place,
        kelly_show,
        best_bet: best.map(|(bet, _)| bet),
    }
}

/// 1-based ranks of `scores` (descending), input order on ties.
/// Entries failing `eligible` get `None`.
pub fn rank_descending(scores: &[f64], eligible: impl Fn(f64) -> bool) -> Vec<Option<usize>> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&i| eligible(scores[i])).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut ranks = vec![None; scores.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = Some(rank + 1);
    }
    ranks
}
