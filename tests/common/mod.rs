//! Shared fixtures for the integration tests
#![allow(dead_code)]

use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use raksor::dataset::arff::write_dataset;
use raksor::dataset::{Attribute, Dataset, Labels, Schema};
use raksor::training::{LearnerKind, TrainingConfig};
use std::path::{Path, PathBuf};

pub const FEATURES: [&str; 3] = ["axioms", "depth", "noise"];

/// Relevance cut-off on the synthetic scores
pub const RELEVANCE_THRESHOLD: f64 = 0.8;

pub fn target_names(n_targets: usize) -> Vec<String> {
    (0..n_targets).map(|t| format!("reasoner_{}", t)).collect()
}

fn schema(n_targets: usize, target: fn(String) -> Attribute) -> Schema {
    Schema::new(
        "ontologies",
        FEATURES.iter().map(|&f| Attribute::numeric(f)).collect(),
        target_names(n_targets).into_iter().map(target).collect(),
    )
    .unwrap()
}

pub fn features(n_instances: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n_instances, FEATURES.len()), |_| rng.gen::<f64>())
}

/// Synthetic ranking problem: target `t` scores `1 - |f0 - t/(N-1)|`, so the
/// best reasoner is the one whose position matches the first feature
pub fn scores(features: &Array2<f64>, n_targets: usize) -> Array2<f64> {
    let span = (n_targets.max(2) - 1) as f64;
    Array2::from_shape_fn((features.nrows(), n_targets), |(i, t)| {
        1.0 - (features[[i, 0]] - t as f64 / span).abs()
    })
}

/// `(mlc, mtr)` datasets over the same features
pub fn synthetic(n_instances: usize, n_targets: usize, seed: u64) -> (Dataset, Dataset) {
    synthetic_with(n_instances, n_targets, seed, false)
}

/// Like [`synthetic`]; with `degenerate` the last target is never relevant
pub fn synthetic_with(n_instances: usize, n_targets: usize, seed: u64, degenerate: bool) -> (Dataset, Dataset) {
    let x = features(n_instances, seed);
    let rank = scores(&x, n_targets);
    let mut relevance = rank.mapv(|v| if v > RELEVANCE_THRESHOLD { 1.0 } else { 0.0 });
    if degenerate {
        relevance.column_mut(n_targets - 1).fill(0.0);
    }

    let mlc = Dataset::new(
        "mlc",
        schema(n_targets, Attribute::binary),
        x.clone(),
        Some(Labels::relevance(relevance)),
    )
    .unwrap();
    let mtr = Dataset::new("mtr", schema(n_targets, Attribute::numeric), x, Some(Labels::rank(rank))).unwrap();
    (mlc, mtr)
}

/// Unlabeled dataset with the synthetic schema
pub fn unlabeled(n_instances: usize, n_targets: usize, seed: u64) -> Dataset {
    Dataset::new(
        "unlabeled",
        schema(n_targets, Attribute::numeric),
        features(n_instances, seed),
        None,
    )
    .unwrap()
}

/// Write both datasets as ARFF into `dir`
pub fn write_pair(dir: &Path, mlc: &Dataset, mtr: &Dataset) -> (PathBuf, PathBuf) {
    let mlc_path = dir.join("train_mlc.arff");
    let mtr_path = dir.join("train_mtr.arff");
    write_dataset(mlc, &mlc_path).unwrap();
    write_dataset(mtr, &mtr_path).unwrap();
    (mlc_path, mtr_path)
}

/// Small forests, sequential, for quick deterministic tests
pub fn fast_config() -> TrainingConfig {
    TrainingConfig::default()
        .with_regressor(LearnerKind::RandomForest)
        .with_classifier(LearnerKind::RandomForest)
        .with_n_estimators(10)
        .with_max_depth(Some(6))
        .with_parallel(false)
}
