use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use finishline::engine::{RaceCard, RecommendationEngine};
use finishline::harville::extend_win_probabilities;

fn field(n: usize) -> Vec<f64> {
    // descending weights 1/1, 1/2, ... normalised
    let raw: Vec<f64> = (1..=n).map(|i| 1.0 / i as f64).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|p| p / total).collect()
}

fn bench_harville_field_sizes(c: &mut Criterion) {
    for n in [8, 14, 20] {
        let probs = field(n);
        c.bench_function(&format!("harville_stern_{}", n), |b| {
            b.iter(|| {
                let out = extend_win_probabilities(black_box(&probs), true);
                black_box(out.show.len());
            })
        });
    }
}

fn bench_race_card_pipeline(c: &mut Criterion) {
    let card: RaceCard = serde_json::from_str(RACE_CARD_JSON).unwrap();
    let engine = RecommendationEngine::default();
    c.bench_function("race_card_pipeline", |b| {
        b.iter(|| {
            let rec = engine.evaluate(black_box(&card));
            black_box(rec.decision.stake_recommendation);
        })
    });
}

criterion_group!(perf, bench_harville_field_sizes, bench_race_card_pipeline);
criterion_main!(perf);

static RACE_CARD_JSON: &str = include_str!("../tests/fixtures/race_card.json");
