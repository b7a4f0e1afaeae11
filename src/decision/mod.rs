//! Calibration-driven decision engine
//!
//! Turns aggregate race signals into wager-type eligibility and a stake
//! multiplier, with a human-readable rationale for each gate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::CalibrationProfile;
use crate::signals::normalize_pct;
use crate::types::{AggregateSignals, DecisionResult};

/// Minimum gap between ranks 1 and 2 (percent) for trifecta coverage
pub const TRIFECTA_MIN_GAP12: f64 = 40.0;
/// Minimum gap between ranks 2 and 3 (percent) for trifecta coverage
pub const TRIFECTA_MIN_GAP23: f64 = 35.0;

/// Fixed (non-calibrated) gap requirements for the trifecta gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapRequirements {
    pub min_gap12: f64,
    pub min_gap23: f64,
}

impl Default for GapRequirements {
    fn default() -> Self {
        Self {
            min_gap12: TRIFECTA_MIN_GAP12,
            min_gap23: TRIFECTA_MIN_GAP23,
        }
    }
}

/// Signals after percent normalisation and distance penalties
#[derive(Debug, Clone, Copy, PartialEq)]
struct AdjustedSignals {
    confidence: f64,
    top3_mass: f64,
    gap12: f64,
    gap23: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    gaps: GapRequirements,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gaps(gaps: GapRequirements) -> Self {
        Self { gaps }
    }

    fn adjust(&self, signals: &AggregateSignals, profile: &CalibrationProfile) -> AdjustedSignals {
        let mut top3_mass = normalize_pct(signals.top3_mass);
        if let Some(penalty) =
            profile.distance_penalty(signals.distance, signals.race_class.as_deref())
        {
            if top3_mass.is_finite() {
                debug!(
                    "Distance penalty {:.3} applied to top-3 mass {:.1}",
                    penalty, top3_mass
                );
                top3_mass = (top3_mass - penalty * 100.0).max(0.0);
            }
        }

        AdjustedSignals {
            confidence: normalize_pct(signals.confidence),
            top3_mass,
            gap12: normalize_pct(signals.gap12),
            gap23: normalize_pct(signals.gap23),
        }
    }

    /// Evaluate every gate against `profile`.
    ///
    /// NaN comparisons are false, so a missing signal closes its gate.
    pub fn decide(&self, signals: &AggregateSignals, profile: &CalibrationProfile) -> DecisionResult {
        let adjusted = self.adjust(signals, profile);
        let rules = &profile.exotics_rules;
        let mut rationale = Vec::with_capacity(3);

        let allow_win_only = adjusted.confidence >= rules.win_only_gate();
        if allow_win_only {
            rationale.push(format!(
                "Confidence {:.0}% clears Win-only gate",
                adjusted.confidence
            ));
        }

        let exacta_gate = rules.exacta_gate();
        let allow_exacta = adjusted.top3_mass >= exacta_gate;
        if allow_exacta {
            rationale.push(format!(
                "Top-3 mass {:.0}% ≥ {}%",
                adjusted.top3_mass, exacta_gate
            ));
        } else {
            rationale.push("Exacta gated off (mass below threshold or penalties applied)".to_string());
        }

        let allow_trifecta = adjusted.top3_mass >= rules.trifecta_gate()
            && adjusted.gap12 >= self.gaps.min_gap12
            && adjusted.gap23 >= self.gaps.min_gap23;
        if allow_trifecta {
            rationale.push("Gap strength supports trifecta coverage".to_string());
        } else {
            rationale.push("Trifecta gated off (needs higher mass & gap support)".to_string());
        }

        let stake_recommendation = profile.stake_for(adjusted.confidence);

        debug!(
            "Decision: conf={:.1} top3={:.1} gaps={:.1}/{:.1} -> win_only={} exacta={} trifecta={} stake={}",
            adjusted.confidence,
            adjusted.top3_mass,
            adjusted.gap12,
            adjusted.gap23,
            allow_win_only,
            allow_exacta,
            allow_trifecta,
            stake_recommendation
        );

        DecisionResult {
            stake_recommendation,
            allow_win_only,
            allow_exacta,
            allow_trifecta,
            rationale,
        }
    }
}

/// Decide with the fixed gap requirements.
pub fn decide(signals: &AggregateSignals, profile: &CalibrationProfile) -> DecisionResult {
    DecisionEngine::new().decide(signals, profile)
}
