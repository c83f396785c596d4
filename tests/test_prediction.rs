//! Integration test: prediction manager

mod common;

use raksor::dataset::arff::{read_dataset, write_dataset};
use raksor::dataset::{Attribute, Dataset, FeatureVector, LabelKind, Schema};
use raksor::error::{RaksorError, Result};
use raksor::inference::{InferenceConfig, PredictionManager};
use raksor::model::RankingModel;
use raksor::profiler::FeatureProfiler;
use raksor::ranking::rank_order;
use raksor::training::TrainingManager;
use std::fs;
use std::path::Path;

fn trained(dir: &Path, n_targets: usize) -> RankingModel {
    let (mlc, mtr) = common::synthetic(40, n_targets, 21);
    TrainingManager::new(common::fast_config())
        .train(&mlc, &mtr, n_targets, dir, false)
        .unwrap()
}

/// Profiler returning a fixed vector regardless of the ontology
struct FixedProfiler {
    names: Vec<String>,
    values: FeatureVector,
}

impl FeatureProfiler for FixedProfiler {
    fn compute_feature_vector(&self, _ontology: &Path, _all_features: bool) -> Result<FeatureVector> {
        Ok(self.values.clone())
    }

    fn feature_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

#[test]
fn test_predict_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 4);
    let input = common::unlabeled(6, 4, 99);

    let predictions = PredictionManager::default().predict(&model, &input).unwrap();

    assert_eq!(predictions.len(), 6);
    assert_eq!(predictions.target_names(), model.target_names());
    for result in predictions.results() {
        assert_eq!(result.scores.len(), 4);
        assert_eq!(result.relevance.len(), 4);
        assert_eq!(result.rank, rank_order(&result.scores));
    }
}

#[test]
fn test_predict_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(&dir.path().join("model"), 3);

    let input_path = dir.path().join("test.arff");
    write_dataset(&common::unlabeled(5, 3, 42), &input_path).unwrap();

    let rank_out = dir.path().join("pred/rank.arff");
    let bip_out = dir.path().join("pred/bip.arff");
    let predictions = PredictionManager::default()
        .predict_to_files(&model, &input_path, &rank_out, &bip_out)
        .unwrap();

    let ranks = read_dataset(&rank_out, 3, LabelKind::Rank).unwrap();
    let flags = read_dataset(&bip_out, 3, LabelKind::Relevance).unwrap();
    assert_eq!(ranks.n_instances(), 5);
    assert_eq!(flags.n_instances(), 5);
    assert_eq!(ranks.labels().unwrap().values(), &predictions.score_matrix());
    assert_eq!(flags.labels().unwrap().values(), &predictions.relevance_matrix());
}

#[test]
fn test_prediction_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 4);
    let input = common::unlabeled(8, 4, 3);

    let manager = PredictionManager::default();
    let a = manager.predict(&model, &input).unwrap();
    let b = manager.predict(&model, &input).unwrap();
    assert_eq!(a.results(), b.results());
}

#[test]
fn test_threshold_controls_relevance() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 4);
    let features = [0.5, 0.5, 0.5];

    let strict = PredictionManager::new(InferenceConfig::new().with_threshold(1.1))
        .rank_single(&model, &features)
        .unwrap();
    let lenient = PredictionManager::new(InferenceConfig::new().with_threshold(0.0))
        .rank_single(&model, &features)
        .unwrap();

    assert_eq!(strict.n_relevant(), 0);
    assert_eq!(lenient.n_relevant(), 4);
    assert_eq!(strict.rank, lenient.rank);
}

#[test]
fn test_wrong_feature_count_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 3);

    let err = PredictionManager::default().rank_single(&model, &[0.1, 0.2]).unwrap_err();
    assert!(matches!(err, RaksorError::SchemaMismatch { .. }));

    let wrong_targets = common::unlabeled(3, 4, 1);
    let err = PredictionManager::default().predict(&model, &wrong_targets).unwrap_err();
    assert!(matches!(err, RaksorError::SchemaMismatch { .. }));
}

#[test]
fn test_renamed_feature_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 3);

    let schema = Schema::new(
        "renamed",
        vec![Attribute::numeric("axioms"), Attribute::numeric("DEPTH"), Attribute::numeric("noise")],
        common::target_names(3).into_iter().map(Attribute::numeric).collect(),
    )
    .unwrap();
    let input = Dataset::new("renamed", schema, common::features(4, 5), None).unwrap();

    let err = PredictionManager::default().predict(&model, &input).unwrap_err();
    match err {
        RaksorError::SchemaMismatch { expected, found, .. } => {
            assert!(expected.contains("depth"));
            assert!(found.contains("DEPTH"));
        }
        other => panic!("expected a schema mismatch, got {:?}", other),
    }
}

#[test]
fn test_rank_ontology_writes_table() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(&dir.path().join("model"), 4);
    let profiler = FixedProfiler {
        names: common::FEATURES.iter().map(|s| s.to_string()).collect(),
        values: vec![0.95, 0.3, 0.6],
    };

    let out = dir.path().join("rankings");
    let result = PredictionManager::default()
        .rank_ontology(&model, &profiler, Path::new("onto/pizza.owl"), true, &out)
        .unwrap();

    let table = fs::read_to_string(out.join("pizza_ranking.csv")).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("position,reasoner,score,relevant"));
    let best = result.top_target().unwrap();
    assert!(lines.next().unwrap().starts_with(&format!("1,{},", model.target_names()[best])));
    assert_eq!(table.lines().count(), 5);
}

#[test]
fn test_rank_ontology_rejects_foreign_profiler() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained(dir.path(), 3);
    let profiler = FixedProfiler {
        names: vec!["a".into(), "b".into(), "c".into()],
        values: vec![0.1, 0.2, 0.3],
    };

    let err = PredictionManager::default()
        .rank_ontology(&model, &profiler, Path::new("x.owl"), false, dir.path())
        .unwrap_err();
    assert!(matches!(err, RaksorError::SchemaMismatch { .. }));
}

#[test]
fn test_missing_model_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PredictionManager::default()
        .load_model(dir.path().join("nope.json"))
        .unwrap_err();
    assert!(matches!(err, RaksorError::ModelNotFound { .. }));
}

#[test]
fn test_foreign_model_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, r#"{"format":"something-else","format_version":"1.0.0","model":{}}"#).unwrap();

    let err = PredictionManager::default().load_model(&path).unwrap_err();
    assert!(matches!(err, RaksorError::ModelIncompatible { .. }));

    fs::write(&path, "not json at all").unwrap();
    let err = PredictionManager::default().load_model(&path).unwrap_err();
    assert!(matches!(err, RaksorError::ModelIncompatible { .. }));
}
