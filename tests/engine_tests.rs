//! Tests for the public FinishLine surface

#[cfg(test)]
mod tests {
    use finishline::calibration::{CalibrationProfile, ProfileLoader};
    use finishline::decision::decide;
    use finishline::engine::{RaceCard, RecommendationEngine, WinProbSource};
    use finishline::features::{score_runners, FeatureScorer, NotabilityLists, ScoringWeights};
    use finishline::harville::extend_win_probabilities;
    use finishline::strategy::classify;
    use finishline::types::{AggregateSignals, RawRunner, SignalColor, StrategyInputs};

    static RACE_CARD_JSON: &str = include_str!("fixtures/race_card.json");
    static PROFILE_JSON: &str = include_str!("fixtures/calibration_v1.json");

    fn signals(confidence: f64, top3_mass: f64, gap12: f64, gap23: f64) -> AggregateSignals {
        AggregateSignals {
            confidence,
            top3_mass,
            gap12,
            gap23,
            ..Default::default()
        }
    }

    // ============================================================================
    // Harville
    // ============================================================================

    #[test]
    fn test_harville_edge_fields() {
        let empty = extend_win_probabilities(&[], true);
        assert!(empty.win.is_empty() && empty.place.is_empty() && empty.show.is_empty());

        let single = extend_win_probabilities(&[0.42], false);
        assert_eq!(single.win, vec![1.0]);
        assert_eq!(single.place, vec![1.0]);
        assert_eq!(single.show, vec![1.0]);
    }

    #[test]
    fn test_harville_reference_field() {
        let input = [0.35, 0.375, 0.19, 0.085];
        let out = extend_win_probabilities(&input, true);
        assert_eq!(out.win, input.to_vec());
        for i in 0..4 {
            assert!(out.place[i] >= out.win[i]);
            assert!(out.show[i] >= out.place[i]);
        }
        assert!(out.show[0].min(out.show[1]) > out.show[2].max(out.show[3]));
    }

    #[test]
    fn test_harville_idempotent() {
        let input = [0.3, 0.25, 0.2, 0.15, 0.1];
        let a = serde_json::to_string(&extend_win_probabilities(&input, true)).unwrap();
        let b = serde_json::to_string(&extend_win_probabilities(&input, true)).unwrap();
        assert_eq!(a, b);
    }

    // ============================================================================
    // Scoring
    // ============================================================================

    #[test]
    fn test_score_runners_reference_pair() {
        let runners = vec![
            RawRunner::new("A").with_odds("1/1").with_jockey("Saez"),
            RawRunner::new("B").with_odds("20/1"),
        ];
        let scored = score_runners(&runners);
        assert_eq!(scored[0].runner.name, "A");
        assert_eq!(scored[0].normalized_score, 1.0);
        assert!((scored[0].raw_score - 1.25).abs() < 1e-12);
        assert!(scored[1].normalized_score < 1.0);
    }

    #[test]
    fn test_missing_and_garbled_odds_differ() {
        let runners = vec![
            RawRunner::new("Garbled").with_odds("n/a"),
            RawRunner::new("Unpriced"),
        ];
        let scored = score_runners(&runners);
        assert_eq!(scored[0].runner.name, "Unpriced");
        assert_eq!(scored[0].features.market_prob, 0.5);
        assert_eq!(scored[1].features.market_prob, 0.0);
    }

    #[test]
    fn test_score_runners_idempotent() {
        let card: RaceCard = serde_json::from_str(RACE_CARD_JSON).unwrap();
        let a = serde_json::to_string(&score_runners(&card.runners)).unwrap();
        let b = serde_json::to_string(&score_runners(&card.runners)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_injected_notables() {
        let scorer = FeatureScorer::new(
            NotabilityLists::new(["fixture jockey"], Vec::<String>::new()),
            ScoringWeights::default(),
        );
        let runners = vec![
            RawRunner::new("A").with_odds("1/1").with_jockey("Saez"),
            RawRunner::new("B").with_odds("1/1").with_jockey("Fixture Jockey"),
        ];
        let scored = scorer.score_runners(&runners);
        assert_eq!(scored[0].runner.name, "B");
        assert!(scored[0].features.jockey_hit);
        assert!(!scored[1].features.jockey_hit);
    }

    // ============================================================================
    // Decision + strategy
    // ============================================================================

    #[test]
    fn test_decide_reference_cases() {
        let profile = CalibrationProfile::default();

        let open = decide(&signals(85.0, 50.0, 45.0, 40.0), &profile);
        assert!(open.allow_win_only && open.allow_exacta && open.allow_trifecta);
        assert_eq!(open.stake_recommendation, 2.0);

        let gated = decide(&signals(85.0, 44.9, 45.0, 40.0), &profile);
        assert!(!gated.allow_exacta);
        assert!(gated.rationale.iter().any(|r| r.contains("gated off")));
    }

    #[test]
    fn test_decide_with_loaded_profile() {
        let profile = CalibrationProfile::from_json_str(PROFILE_JSON).unwrap();
        assert_eq!(profile.stake_for(86.0), 3.0);
        // trifecta gate is 55 in this document
        let result = decide(&signals(86.0, 50.0, 45.0, 40.0), &profile);
        assert!(result.allow_exacta);
        assert!(!result.allow_trifecta);
        assert_eq!(result.stake_recommendation, 3.0);
    }

    #[test]
    fn test_classify_reference_cases() {
        let green = classify(&StrategyInputs {
            confidence: 82.0,
            top3_mass: 40.0,
            gap1: 1.8,
            gap2: 0.0,
        });
        assert_eq!(green.color, SignalColor::Green);

        let caution = classify(&StrategyInputs {
            confidence: f64::NAN,
            top3_mass: 50.0,
            gap1: 10.0,
            gap2: 10.0,
        });
        assert_eq!(caution.color, SignalColor::Yellow);
    }

    #[test]
    fn test_classify_idempotent() {
        let inputs = StrategyInputs {
            confidence: 0.74,
            top3_mass: 38.0,
            gap1: 2.5,
            gap2: f64::NAN,
        };
        let a = serde_json::to_string(&classify(&inputs)).unwrap();
        let b = serde_json::to_string(&classify(&inputs)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_loader_without_sources_uses_default() {
        let loaded = ProfileLoader::from_paths(["/definitely/missing.json"]).load();
        assert_eq!(loaded.source, "default");
        assert_eq!(loaded.profile, CalibrationProfile::default());
    }

    // ============================================================================
    // Pipeline
    // ============================================================================

    #[test]
    fn test_race_card_pipeline() {
        let card: RaceCard = serde_json::from_str(RACE_CARD_JSON).unwrap();
        let profile = CalibrationProfile::from_json_str(PROFILE_JSON).unwrap();
        let engine = RecommendationEngine::new(
            FeatureScorer::default(),
            Default::default(),
            profile,
        );
        let rec = engine.evaluate(&card);

        // nameless runner dropped
        assert_eq!(rec.scored.len(), 6);
        assert_eq!(rec.probabilities.len(), 6);
        assert_eq!(rec.win_prob_source, WinProbSource::Odds);

        let leader = &rec.scored[0];
        assert_eq!(leader.runner.name, "Derek's Law");
        assert_eq!(leader.runner.speed_fig, Some(114));
        assert_eq!(leader.normalized_score, 1.0);

        let last = rec.scored.last().unwrap();
        assert_eq!(last.runner.name, "SCR Late Entry");
        assert!(last.features.suspicious_name);
        assert_eq!(last.normalized_score, 0.0);

        assert_eq!(rec.signals.confidence, 0.84);
        assert!(rec.decision.allow_win_only);
        assert!(rec.decision.allow_exacta);
        assert!(!rec.decision.allow_trifecta);
        assert_eq!(rec.decision.stake_recommendation, 2.0);
        assert_eq!(rec.strategy.color, SignalColor::Green);
        assert_eq!(rec.profile_version, "2025-11-02");
        assert_eq!(rec.exotics.order[0], "Derek's Law");

        // the scratched runner is priced at the field average of the other five
        let scratched = rec.value.last().unwrap();
        assert!(scratched.odds_filled);
        assert!((scratched.decimal_odds - 7.1).abs() < 1e-12);
        assert_eq!(rec.value[0].rank_win, 1);
    }

    #[test]
    fn test_pipeline_output_is_stable() {
        let card: RaceCard = serde_json::from_str(RACE_CARD_JSON).unwrap();
        let engine = RecommendationEngine::default();
        let a = serde_json::to_string(&engine.evaluate(&card)).unwrap();
        let b = serde_json::to_string(&engine.evaluate(&card)).unwrap();
        assert_eq!(a, b);
    }
}
