//! Calibration profile
//!
//! Versioned thresholds that drive stake sizing and wager-type eligibility.
//! The document is produced by an external calibration job; the engine
//! only reads it. A hard-coded default profile stands in whenever the
//! document is missing or malformed.
//!
//! Fallback precedence for every rule: explicit value in the document,
//! then the default profile (when the whole document is unusable), then the
//! constant baked into the accessor.

pub mod loader;

pub use loader::{FileProfileSource, LoadedProfile, ProfileLoader, ProfileSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Exacta gate when a document omits it
pub const DEFAULT_EXACTA_MIN_TOP3: f64 = 45.0;
/// Trifecta gate when a document omits it
pub const DEFAULT_TRIFECTA_MIN_TOP3: f64 = 55.0;
/// Win-only confidence gate when a document omits it
pub const DEFAULT_MIN_CONFIDENCE_FOR_WIN_ONLY: f64 = 80.0;
/// Stake multiplier below every threshold
pub const DEFAULT_STAKE: f64 = 1.0;

/// Distance-mod key for short maiden sprints
pub const SHORT_MAIDEN_KEY: &str = "≤250y_maiden";
/// Upper distance bound (inclusive) of a short sprint
pub const SHORT_SPRINT_MAX_DISTANCE: f64 = 250.0;

const FALLBACK_VERSION: &str = "fallback-v1";

/// Errors raised while reading or parsing a profile document
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read calibration profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid calibration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid calibration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("calibration profile document is empty")]
    Empty,
    #[error("calibration profile rejected: {0}")]
    Invalid(String),
}

/// One step of the stake curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeStep {
    /// Confidence percent (0-100)
    pub threshold: f64,
    pub multiplier: f64,
}

/// Confidence threshold -> stake multiplier, kept sorted ascending.
///
/// Documents store the curve as a map keyed by stringified percent; key
/// order in the source is irrelevant. Steps whose key or multiplier is not
/// numeric are dropped on their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, serde_json::Value>",
    into = "BTreeMap<String, f64>"
)]
pub struct StakeCurve {
    steps: Vec<StakeStep>,
}

impl StakeCurve {
    pub fn new(steps: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut steps: Vec<StakeStep> = steps
            .into_iter()
            .filter(|(threshold, _)| threshold.is_finite())
            .map(|(threshold, multiplier)| StakeStep {
                threshold,
                multiplier,
            })
            .collect();
        steps.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self { steps }
    }

    pub fn steps(&self) -> &[StakeStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Multiplier of the highest threshold <= `confidence_pct`.
    ///
    /// Non-finite confidence, or confidence below every threshold, yields
    /// [`DEFAULT_STAKE`]. Steps with a non-positive multiplier are skipped.
    pub fn stake_for(&self, confidence_pct: f64) -> f64 {
        if !confidence_pct.is_finite() {
            return DEFAULT_STAKE;
        }
        let mut stake = DEFAULT_STAKE;
        for step in &self.steps {
            if confidence_pct >= step.threshold && step.multiplier.is_finite() && step.multiplier > 0.0
            {
                stake = step.multiplier;
            }
        }
        stake
    }
}

impl From<BTreeMap<String, f64>> for StakeCurve {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self::new(
            map.into_iter()
                .filter_map(|(key, multiplier)| Some((key.trim().parse::<f64>().ok()?, multiplier))),
        )
    }
}

impl From<BTreeMap<String, serde_json::Value>> for StakeCurve {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self::new(map.into_iter().filter_map(|(key, value)| {
            let threshold = key.trim().parse::<f64>().ok()?;
            let multiplier = match value {
                serde_json::Value::Number(n) => n.as_f64()?,
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            Some((threshold, multiplier))
        }))
    }
}

impl From<StakeCurve> for BTreeMap<String, f64> {
    fn from(curve: StakeCurve) -> Self {
        curve
            .steps
            .into_iter()
            .map(|step| (step.threshold.to_string(), step.multiplier))
            .collect()
    }
}

/// Wager-type eligibility gates (percent, 0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExoticsRules {
    #[serde(default, alias = "exactaMinTop3", skip_serializing_if = "Option::is_none")]
    pub exacta_min_top3: Option<f64>,
    #[serde(default, alias = "trifectaMinTop3", skip_serializing_if = "Option::is_none")]
    pub trifecta_min_top3: Option<f64>,
    #[serde(
        default,
        rename = "min_conf_for_win_only",
        alias = "min_confidence_for_win_only",
        alias = "minConfidenceForWinOnly",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_confidence_for_win_only: Option<f64>,
}

impl ExoticsRules {
    pub fn exacta_gate(&self) -> f64 {
        finite_or(self.exacta_min_top3, DEFAULT_EXACTA_MIN_TOP3)
    }

    pub fn trifecta_gate(&self) -> f64 {
        finite_or(self.trifecta_min_top3, DEFAULT_TRIFECTA_MIN_TOP3)
    }

    pub fn win_only_gate(&self) -> f64 {
        finite_or(
            self.min_confidence_for_win_only,
            DEFAULT_MIN_CONFIDENCE_FOR_WIN_ONLY,
        )
    }
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

/// Penalties applied for a race context
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceMod {
    /// Fraction (0-1) subtracted from top-3 mass
    #[serde(default, alias = "exoticsPenalty")]
    pub exotics_penalty: f64,
}

/// Per-confidence-bin outcome metrics written by the calibration job.
/// Informational only; the engine does not read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMetric {
    pub bin: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub top3_rate: f64,
    #[serde(default)]
    pub avg_roi_atb2: Option<f64>,
    #[serde(default)]
    pub exotic_hit_rate: Option<f64>,
}

/// Context key of a race, if any distance mod can apply to it.
///
/// Currently only short maiden sprints (distance <= 250 and a class
/// containing "maiden") have a key.
pub fn distance_context_key(distance: Option<f64>, race_class: Option<&str>) -> Option<&'static str> {
    let distance = distance.filter(|d| d.is_finite())?;
    let class = race_class?.to_lowercase();
    if distance <= SHORT_SPRINT_MAX_DISTANCE && class.contains("maiden") {
        Some(SHORT_MAIDEN_KEY)
    } else {
        None
    }
}

/// Versioned calibration thresholds. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "stakeCurve")]
    pub stake_curve: StakeCurve,
    #[serde(default, alias = "exoticsRules")]
    pub exotics_rules: ExoticsRules,
    #[serde(default, alias = "distanceMods")]
    pub distance_mods: BTreeMap<String, DistanceMod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bin_metrics: Vec<BinMetric>,
}

impl Default for CalibrationProfile {
    /// Profile used whenever no usable document is available
    fn default() -> Self {
        let mut distance_mods = BTreeMap::new();
        distance_mods.insert(
            SHORT_MAIDEN_KEY.to_string(),
            DistanceMod {
                exotics_penalty: 0.05,
            },
        );

        Self {
            version: FALLBACK_VERSION.to_string(),
            generated_at: None,
            stake_curve: StakeCurve::new([
                (50.0, 1.0),
                (55.0, 1.0),
                (60.0, 1.0),
                (65.0, 1.0),
                (70.0, 2.0),
                (75.0, 2.0),
                (80.0, 2.0),
                (85.0, 2.0),
            ]),
            exotics_rules: ExoticsRules {
                exacta_min_top3: Some(45.0),
                trifecta_min_top3: Some(50.0),
                min_confidence_for_win_only: Some(80.0),
            },
            distance_mods,
            bin_metrics: Vec::new(),
        }
    }
}

impl CalibrationProfile {
    pub fn from_json_str(document: &str) -> Result<Self, ProfileError> {
        if document.trim().is_empty() {
            return Err(ProfileError::Empty);
        }
        let profile: Self = serde_json::from_str(document)?;
        profile.validate()
    }

    pub fn from_yaml_str(document: &str) -> Result<Self, ProfileError> {
        if document.trim().is_empty() {
            return Err(ProfileError::Empty);
        }
        let profile: Self = serde_yaml::from_str(document)?;
        profile.validate()
    }

    fn validate(self) -> Result<Self, ProfileError> {
        if self.version.trim().is_empty() {
            return Err(ProfileError::Invalid("missing version".to_string()));
        }
        Ok(self)
    }

    pub fn is_fallback(&self) -> bool {
        self.version == FALLBACK_VERSION
    }

    /// Stake multiplier for a confidence percent (0-100)
    pub fn stake_for(&self, confidence_pct: f64) -> f64 {
        self.stake_curve.stake_for(confidence_pct)
    }

    /// Exotics penalty (fraction) for a race context, if a mod matches
    pub fn distance_penalty(&self, distance: Option<f64>, race_class: Option<&str>) -> Option<f64> {
        let key = distance_context_key(distance, race_class)?;
        self.distance_mods
            .get(key)
            .map(|m| m.exotics_penalty)
            .filter(|p| p.is_finite())
    }
}

impl fmt::Display for CalibrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} stake_steps={} exacta>={} trifecta>={} win_only>={} distance_mods={}",
            self.version,
            self.stake_curve.steps().len(),
            self.exotics_rules.exacta_gate(),
            self.exotics_rules.trifecta_gate(),
            self.exotics_rules.win_only_gate(),
            self.distance_mods.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "version": "v1",
        "generated_at": "2025-11-02T06:00:00Z",
        "bin_metrics": [{"bin": "80-84", "count": 12, "win_rate": 0.5, "top3_rate": 0.75, "avg_roi_atb2": null, "exotic_hit_rate": null}],
        "stake_curve": {"85": 3, "50": 1, "70": 2, "junk": 9},
        "exotics_rules": {"exacta_min_top3": 45, "trifecta_min_top3": 55, "min_conf_for_win_only": 80},
        "distance_mods": {"≤250y_maiden": {"exotics_penalty": 0.05}}
    }"#;

    #[test]
    fn test_parse_document() {
        let profile = CalibrationProfile::from_json_str(DOCUMENT).unwrap();
        assert_eq!(profile.version, "v1");
        assert!(profile.generated_at.is_some());
        assert_eq!(profile.bin_metrics.len(), 1);
        // sorted numerically, junk key dropped
        let thresholds: Vec<f64> = profile.stake_curve.steps().iter().map(|s| s.threshold).collect();
        assert_eq!(thresholds, vec![50.0, 70.0, 85.0]);
        assert_eq!(profile.exotics_rules.trifecta_gate(), 55.0);
        assert_eq!(profile.distance_penalty(Some(220.0), Some("Maiden Special Weight")), Some(0.05));
    }

    #[test]
    fn test_stake_lookup() {
        let curve = CalibrationProfile::default().stake_curve;
        assert_eq!(curve.stake_for(49.9), 1.0);
        assert_eq!(curve.stake_for(69.9), 1.0);
        assert_eq!(curve.stake_for(70.0), 2.0);
        assert_eq!(curve.stake_for(99.0), 2.0);
        assert_eq!(curve.stake_for(f64::NAN), 1.0);
        assert_eq!(StakeCurve::default().stake_for(90.0), DEFAULT_STAKE);
    }

    #[test]
    fn test_stake_lookup_ignores_key_order() {
        let mut map = BTreeMap::new();
        // lexicographic order would put "100" before "60"
        map.insert("100".to_string(), 4.0);
        map.insert("60".to_string(), 2.0);
        map.insert("9".to_string(), 1.5);
        let curve = StakeCurve::from(map);
        assert_eq!(curve.stake_for(65.0), 2.0);
        assert_eq!(curve.stake_for(100.0), 4.0);
        assert_eq!(curve.stake_for(10.0), 1.5);
    }

    #[test]
    fn test_bad_multiplier_drops_only_its_step() {
        let profile = CalibrationProfile::from_json_str(
            r#"{"version": "v", "stake_curve": {"50": 1, "70": null, "80": "3", "85": true, "90": "x"}}"#,
        )
        .unwrap();
        let thresholds: Vec<f64> = profile.stake_curve.steps().iter().map(|s| s.threshold).collect();
        assert_eq!(thresholds, vec![50.0, 80.0]);
        assert_eq!(profile.stake_for(75.0), 1.0);
        assert_eq!(profile.stake_for(95.0), 3.0);
        assert!(!profile.is_fallback());

        let yaml = CalibrationProfile::from_yaml_str("version: v\nstake_curve:\n  \"60\": ~\n  \"70\": 2\n").unwrap();
        assert_eq!(yaml.stake_curve.steps().len(), 1);
        assert_eq!(yaml.stake_for(72.0), 2.0);
    }

    #[test]
    fn test_zero_multiplier_keeps_previous_step() {
        let curve = StakeCurve::new([(50.0, 2.0), (60.0, 0.0)]);
        assert_eq!(curve.stake_for(65.0), 2.0);
    }

    #[test]
    fn test_missing_rules_fall_back_to_constants() {
        let profile = CalibrationProfile::from_json_str(r#"{"version": "bare"}"#).unwrap();
        assert!(profile.stake_curve.is_empty());
        assert_eq!(profile.exotics_rules.exacta_gate(), DEFAULT_EXACTA_MIN_TOP3);
        assert_eq!(profile.exotics_rules.trifecta_gate(), DEFAULT_TRIFECTA_MIN_TOP3);
        assert_eq!(profile.exotics_rules.win_only_gate(), DEFAULT_MIN_CONFIDENCE_FOR_WIN_ONLY);
        assert_eq!(profile.distance_penalty(Some(200.0), Some("maiden")), None);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(CalibrationProfile::from_json_str("  "), Err(ProfileError::Empty)));
        assert!(matches!(CalibrationProfile::from_json_str("{"), Err(ProfileError::Json(_))));
        assert!(matches!(CalibrationProfile::from_json_str("[1,2]"), Err(ProfileError::Json(_))));
        assert!(matches!(
            CalibrationProfile::from_json_str(r#"{"version": " "}"#),
            Err(ProfileError::Invalid(_))
        ));
    }

    #[test]
    fn test_yaml_document() {
        let yaml = "version: v2\nstake_curve:\n  \"60\": 1\n  \"80\": 2\nexotics_rules:\n  exacta_min_top3: 50\n";
        let profile = CalibrationProfile::from_yaml_str(yaml).unwrap();
        assert_eq!(profile.stake_for(81.0), 2.0);
        assert_eq!(profile.exotics_rules.exacta_gate(), 50.0);
    }

    #[test]
    fn test_distance_context() {
        assert_eq!(distance_context_key(Some(250.0), Some("MAIDEN")), Some(SHORT_MAIDEN_KEY));
        assert_eq!(distance_context_key(Some(251.0), Some("maiden")), None);
        assert_eq!(distance_context_key(Some(200.0), Some("allowance")), None);
        assert_eq!(distance_context_key(None, Some("maiden")), None);
        assert_eq!(distance_context_key(Some(200.0), None), None);
    }

    #[test]
    fn test_round_trip_keeps_curve() {
        let profile = CalibrationProfile::default();
        let json = serde_json::to_string(&profile).unwrap();
        let back = CalibrationProfile::from_json_str(&json).unwrap();
        assert_eq!(back, profile);
        assert!(back.is_fallback());
    }
}
