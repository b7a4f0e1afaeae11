//! Strategy classifier
//!
//! Fixed-threshold traffic light over confidence, top-3 mass and the larger
//! of the two rank gaps. Independent of the calibration profile.

use serde::{Deserialize, Serialize};

use crate::signals::normalize_pct;
use crate::types::{AggregateSignals, SignalColor, StrategyInputs, StrategySignal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyThresholds {
    pub green_confidence: f64,
    pub green_top3_mass: f64,
    pub green_max_gap: f64,
    pub yellow_confidence: f64,
    pub yellow_top3_mass: f64,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            green_confidence: 82.0,
            green_top3_mass: 40.0,
            green_max_gap: 1.8,
            yellow_confidence: 68.0,
            yellow_top3_mass: 33.0,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn go_signal() -> StrategySignal {
    StrategySignal {
        color: SignalColor::Green,
        label: "Go".to_string(),
        action: "Go: Win-Only or ATB (bankroll-scaled)".to_string(),
    }
}

pub fn caution_signal() -> StrategySignal {
    StrategySignal {
        color: SignalColor::Yellow,
        label: "Caution".to_string(),
        action: "Caution: Light ATB ($1–$3) or Win-Only if Confidence ≥ 80%".to_string(),
    }
}

pub fn avoid_signal() -> StrategySignal {
    StrategySignal {
        color: SignalColor::Red,
        label: "Avoid".to_string(),
        action: "Avoid: Low edge".to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyClassifier {
    thresholds: StrategyThresholds,
}

impl StrategyClassifier {
    pub fn new(thresholds: StrategyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &StrategyThresholds {
        &self.thresholds
    }

    /// Classify a race. Non-finite confidence or top-3 mass is always
    /// Caution; non-finite gaps count as zero.
    pub fn classify(&self, inputs: &StrategyInputs) -> StrategySignal {
        let t = &self.thresholds;
        let confidence = normalize_pct(inputs.confidence);
        let top3_mass = normalize_pct(inputs.top3_mass);
        if !confidence.is_finite() || !top3_mass.is_finite() {
            return caution_signal();
        }

        let max_gap = finite_or_zero(normalize_pct(inputs.gap1))
            .max(finite_or_zero(normalize_pct(inputs.gap2)));

        if confidence >= t.green_confidence
            && top3_mass >= t.green_top3_mass
            && max_gap >= t.green_max_gap
        {
            go_signal()
        } else if confidence >= t.yellow_confidence || top3_mass >= t.yellow_top3_mass {
            caution_signal()
        } else {
            avoid_signal()
        }
    }

    pub fn classify_signals(&self, signals: &AggregateSignals) -> StrategySignal {
        self.classify(&StrategyInputs::from(signals))
    }
}

/// Classify with the fixed thresholds.
pub fn classify(inputs: &StrategyInputs) -> StrategySignal {
    StrategyClassifier::default().classify(inputs)
}
