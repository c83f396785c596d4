//! Integration test: train, predict and evaluate end-to-end

mod common;

use raksor::cli::{cmd_evaluate, cmd_predict, cmd_rank, cmd_score, cmd_train, ModeArg, BIPARTITION_LABEL, RANK_LABEL};
use raksor::dataset::arff::{read_dataset, write_dataset};
use raksor::dataset::LabelKind;
use raksor::evaluation::{RankingEvaluation, MEAN_HAMMING_ACCURACY, MEAN_SPEARMAN_RHO, TOP1_HIT_RATE};
use raksor::inference::PredictionManager;
use raksor::training::TrainingManager;
use std::fs;

#[test]
fn test_train_predict_evaluate() {
    let dir = tempfile::tempdir().unwrap();
    let (mlc, mtr) = common::synthetic(50, 10, 1);
    let (mlc_test, mtr_test) = common::synthetic(30, 10, 2);

    let manager = TrainingManager::new(common::fast_config());
    let model = manager.train(&mlc, &mtr, 10, dir.path(), true).unwrap();
    assert!(manager.cv_report_path(dir.path()).exists());

    let predictions = PredictionManager::default().predict(&model, &mtr_test).unwrap();
    let rank_predicted = predictions.rank_dataset(&mtr_test).unwrap();
    let bip_predicted = predictions.bipartition_dataset(&mlc_test).unwrap();

    let evaluation = RankingEvaluation::new(dir.path().join("evaluation.csv"), 10);
    let rank = evaluation.evaluate_ranking(&mtr_test, &rank_predicted, RANK_LABEL).unwrap();
    let bip = evaluation.evaluate_bipartition(&mlc_test, &bip_predicted, BIPARTITION_LABEL).unwrap();

    assert!(rank.aggregate(TOP1_HIT_RATE).unwrap() > 0.1);
    assert!(rank.aggregate(MEAN_SPEARMAN_RHO).unwrap() > 0.0);
    assert!(bip.aggregate(MEAN_HAMMING_ACCURACY).unwrap() > 0.5);
}

#[test]
fn test_cli_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (mlc, mtr) = common::synthetic(40, 4, 3);
    let (mlc_path, mtr_path) = common::write_pair(dir.path(), &mlc, &mtr);
    let (mlc_test, mtr_test) = common::synthetic(10, 4, 4);
    let mlc_test_path = dir.path().join("test_mlc.arff");
    let mtr_test_path = dir.path().join("test_mtr.arff");
    write_dataset(&mlc_test, &mlc_test_path).unwrap();
    write_dataset(&mtr_test, &mtr_test_path).unwrap();

    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"n_estimators": 8, "cv_folds": 4, "parallel": false}"#).unwrap();

    let out = dir.path().join("run");
    cmd_train(&mlc_path, &mtr_path, 4, Some(out.as_path()), true, Some(config_path.as_path())).unwrap();
    let model_path = out.join("raksor_model.json");
    assert!(model_path.exists());
    assert!(out.join("raksor_cross_validation.csv").exists());

    cmd_predict(&model_path, &mtr_test_path, 4, Some(out.as_path())).unwrap();
    let rank_out = out.join("rank_predictions.arff");
    assert_eq!(read_dataset(&rank_out, 4, LabelKind::Rank).unwrap().n_instances(), 10);

    cmd_evaluate(&mtr_test_path, &mlc_test_path, &model_path, 4, Some(out.as_path())).unwrap();
    let report = fs::read_to_string(out.join("raksor_evaluation.csv")).unwrap();
    assert!(report.contains(RANK_LABEL));
    assert!(report.contains(BIPARTITION_LABEL));

    let score_report = dir.path().join("scores.csv");
    cmd_score(&mtr_test_path, &rank_out, 4, ModeArg::Rank, "rescored", &score_report).unwrap();
    assert!(fs::read_to_string(&score_report).unwrap().contains("rescored,rank,"));

    let features_path = dir.path().join("profiled.arff");
    write_dataset(&common::unlabeled(2, 4, 8), &features_path).unwrap();
    let rank_dir = dir.path().join("ranked");
    cmd_rank(&model_path, &features_path, Some(rank_dir.as_path())).unwrap();
    assert!(rank_dir.join("profiled_0_ranking.csv").exists());
    assert!(rank_dir.join("profiled_1_ranking.csv").exists());
}

#[test]
fn test_cli_rank_ignores_relation_name_in_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (mlc, mtr) = common::synthetic(20, 3, 6);
    let (mlc_path, mtr_path) = common::write_pair(dir.path(), &mlc, &mtr);
    let out = dir.path().join("run");
    cmd_train(&mlc_path, &mtr_path, 3, Some(out.as_path()), false, None).unwrap();

    // Relation names may hold separators and spaces
    let features = common::unlabeled(1, 3, 2);
    let text = raksor::dataset::arff::to_arff_string(&features)
        .replacen("@relation ontologies", "@relation 'ore/sub set'", 1);
    let features_path = dir.path().join("batch.arff");
    fs::write(&features_path, text).unwrap();

    let rank_dir = dir.path().join("ranked");
    cmd_rank(&out.join("raksor_model.json"), &features_path, Some(rank_dir.as_path())).unwrap();
    assert!(rank_dir.join("batch_0_ranking.csv").exists());
    assert!(!rank_dir.join("ore").exists());
}

#[test]
fn test_cli_rejects_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.arff");

    let err = cmd_train(&missing, &missing, 3, Some(dir.path()), false, None).unwrap_err();
    assert!(err.to_string().contains("usage: raksor train"));

    let err = cmd_predict(&missing, &missing, 3, None).unwrap_err();
    assert!(err.to_string().contains("--model"));
}

#[test]
fn test_cli_predict_rejects_wrong_target_count() {
    let dir = tempfile::tempdir().unwrap();
    let (mlc, mtr) = common::synthetic(20, 3, 5);
    let (mlc_path, mtr_path) = common::write_pair(dir.path(), &mlc, &mtr);
    let out = dir.path().join("run");
    cmd_train(&mlc_path, &mtr_path, 3, Some(out.as_path()), false, None).unwrap();

    let err = cmd_predict(&out.join("raksor_model.json"), &mtr_path, 4, Some(out.as_path())).unwrap_err();
    assert!(err.to_string().contains("Schema mismatch"));
}
