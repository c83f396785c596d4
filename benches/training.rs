use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use raksor::ensemble::{EnsembleBuilder, EnsembleTask};
use raksor::training::{LearnerKind, TrainingConfig};

fn create_ranking_data(n_rows: usize, n_features: usize, n_targets: usize) -> (Array2<f64>, Array2<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>());
    let span = (n_targets - 1) as f64;
    let y = Array2::from_shape_fn((n_rows, n_targets), |(i, t)| {
        1.0 - (x[[i, 0]] - t as f64 / span).abs() + rng.gen::<f64>() * 0.05
    });
    (x, y)
}

fn bench_ensemble_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble_fit");
    group.sample_size(10);

    for &n_rows in &[100, 500] {
        let (x, y) = create_ranking_data(n_rows, 20, 10);
        let relevance = y.mapv(|v| if v > 0.8 { 1.0 } else { 0.0 });

        for (name, kind, stacking) in [
            ("forest", LearnerKind::RandomForest, false),
            ("forest_stacked", LearnerKind::RandomForest, true),
            ("ridge_stacked", LearnerKind::Ridge, true),
        ] {
            let config = TrainingConfig::default()
                .with_regressor(kind)
                .with_n_estimators(20)
                .with_stacking(stacking);
            group.bench_with_input(BenchmarkId::new(name, n_rows), &n_rows, |b, _| {
                b.iter(|| {
                    EnsembleBuilder::new(EnsembleTask::Regression, &config)
                        .fit(black_box(&x), black_box(&y))
                        .unwrap()
                })
            });
        }

        let config = TrainingConfig::default().with_n_estimators(20);
        group.bench_with_input(BenchmarkId::new("classifier", n_rows), &n_rows, |b, _| {
            b.iter(|| {
                EnsembleBuilder::new(EnsembleTask::BinaryRelevance, &config)
                    .fit(black_box(&x), black_box(&relevance))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let (x, y) = create_ranking_data(500, 20, 10);
    let config = TrainingConfig::default().with_n_estimators(20);
    let ensemble = EnsembleBuilder::new(EnsembleTask::Regression, &config).fit(&x, &y).unwrap();

    for &n_rows in &[1, 100, 1000] {
        let (batch, _) = create_ranking_data(n_rows, 20, 10);
        group.bench_with_input(BenchmarkId::new("sequential", n_rows), &batch, |b, batch| {
            b.iter(|| ensemble.predict_scores(black_box(batch), false).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", n_rows), &batch, |b, batch| {
            b.iter(|| ensemble.predict_scores(black_box(batch), true).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ensemble_fit, bench_prediction);
criterion_main!(benches);
