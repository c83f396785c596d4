//! Training manager
//!
//! Fits the classifier ensemble on the MLC dataset and the regressor ensemble
//! on the MTR dataset, optionally runs k-fold cross-validation on each, and
//! persists the resulting model. The returned model is always fitted on the
//! full datasets; cross-validation only produces a report.

use super::config::TrainingConfig;
use super::cross_validation::{CVResults, CVSplit, CrossValidator};
use crate::dataset::arff::read_dataset;
use crate::dataset::{Dataset, LabelKind, Labels};
use crate::ensemble::{derive_seed, EnsembleBuilder, EnsembleTask, TargetEnsemble};
use crate::error::Result;
use crate::evaluation::{
    evaluate, EvaluationMode, EvaluationReport, MEAN_HAMMING_ACCURACY, MEAN_SPEARMAN_RHO,
    TOP1_HIT_RATE,
};
use crate::export::save_model;
use crate::model::{ModelMetadata, RankingModel};
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Report label of cross-validated rank predictions
pub const CV_RANK_LABEL: &str = "RakSOR-Rank-CV";
/// Report label of cross-validated bipartition predictions
pub const CV_BIPARTITION_LABEL: &str = "RakSOR-Bip-CV";

/// Out-of-fold predictions and their evaluation
#[derive(Debug, Clone)]
pub struct CrossValidationOutcome {
    /// MTR features with out-of-fold predicted scores
    pub rank_predictions: Dataset,
    /// MLC features with out-of-fold predicted relevance flags
    pub bipartition_predictions: Dataset,
    pub rank_report: EvaluationReport,
    pub bipartition_report: EvaluationReport,
    /// Mean Spearman rho of each fold
    pub rank_folds: CVResults,
    /// Mean Hamming accuracy of each fold
    pub bipartition_folds: CVResults,
}

/// Trains ranking models from MLC and MTR datasets
#[derive(Debug, Clone, Default)]
pub struct TrainingManager {
    config: TrainingConfig,
}

impl TrainingManager {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Preconditions shared by training and cross-validation
    fn check_inputs(mlc: &Dataset, mtr: &Dataset, n_targets: usize) -> Result<()> {
        mlc.require_targets(n_targets)?;
        mtr.require_targets(n_targets)?;
        mlc.require_non_empty()?;
        mtr.require_non_empty()?;
        mlc.require_labels(LabelKind::Relevance)?;
        mtr.require_labels(LabelKind::Rank)?;
        mlc.schema().check_compatible(mtr.schema(), mtr.name())
    }

    fn builder(&self, task: EnsembleTask, dataset: &Dataset, seed: u64) -> EnsembleBuilder {
        EnsembleBuilder::new(task, &self.config)
            .with_seed(seed)
            .with_target_names(dataset.schema().target_names())
    }

    fn fit_ensemble(&self, task: EnsembleTask, dataset: &Dataset, seed: u64) -> Result<TargetEnsemble> {
        let kind = match task {
            EnsembleTask::Regression => LabelKind::Rank,
            EnsembleTask::BinaryRelevance => LabelKind::Relevance,
        };
        let labels = dataset.require_labels(kind)?;
        self.builder(task, dataset, seed)
            .fit(dataset.features(), labels.values())
    }

    /// Fit both ensembles on the full datasets
    fn fit_model(&self, mlc: &Dataset, mtr: &Dataset) -> Result<RankingModel> {
        let start = Instant::now();
        let seed = self.config.seed;

        tracing::info!(
            learner = %self.config.classifier,
            n_instances = mlc.n_instances(),
            n_targets = mlc.n_targets(),
            "Fitting classifier ensemble"
        );
        let classifier = self.fit_ensemble(EnsembleTask::BinaryRelevance, mlc, seed)?;

        tracing::info!(
            learner = %self.config.regressor,
            n_instances = mtr.n_instances(),
            stacking = self.config.stacking,
            "Fitting regressor ensemble"
        );
        let regressor = self.fit_ensemble(EnsembleTask::Regression, mtr, seed)?;

        let metadata = ModelMetadata {
            name: mtr.schema().relation().to_string(),
            trained_at: chrono::Utc::now(),
            n_mlc_instances: mlc.n_instances(),
            n_mtr_instances: mtr.n_instances(),
            regressor: self.config.regressor,
            classifier: self.config.classifier,
            stacked: regressor.stacking().is_some(),
            training_secs: start.elapsed().as_secs_f64(),
            degenerate_regressors: regressor.degenerate().to_vec(),
            degenerate_classifiers: classifier.degenerate().to_vec(),
        };

        RankingModel::new(
            mtr.schema().with_target_kind(LabelKind::Rank),
            regressor,
            classifier,
            metadata,
        )
    }

    /// Train on `mlc` (relevance labels) and `mtr` (rank labels), write the
    /// model (and, with `cross_validate`, the cross-validation report) to
    /// `output_dir`, and return the model fitted on the full datasets
    pub fn train(
        &self,
        mlc: &Dataset,
        mtr: &Dataset,
        n_targets: usize,
        output_dir: impl AsRef<Path>,
        cross_validate: bool,
    ) -> Result<RankingModel> {
        self.config.validate()?;
        Self::check_inputs(mlc, mtr, n_targets)?;

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        if cross_validate {
            let outcome = self.cross_validate(mlc, mtr, n_targets)?;
            let report_path = self.cv_report_path(output_dir);
            outcome.rank_report.append_to_csv(&report_path)?;
            outcome.bipartition_report.append_to_csv(&report_path)?;
            tracing::info!(
                folds = self.config.cv_folds,
                mean_spearman_rho = outcome.rank_folds.mean_score,
                mean_hamming_accuracy = outcome.bipartition_folds.mean_score,
                report = %report_path.display(),
                "Cross-validation finished"
            );
        }

        let model = self.fit_model(mlc, mtr)?;
        let model_path = self.model_path(output_dir);
        save_model(&model, &model_path)?;

        tracing::info!(
            n_targets,
            degenerate = model.metadata().degenerate_regressors.len()
                + model.metadata().degenerate_classifiers.len(),
            secs = model.metadata().training_secs,
            "Training finished"
        );
        Ok(model)
    }

    /// Read both ARFF files and [`train`](Self::train)
    pub fn train_from_files(
        &self,
        mlc_path: impl AsRef<Path>,
        mtr_path: impl AsRef<Path>,
        n_targets: usize,
        output_dir: impl AsRef<Path>,
        cross_validate: bool,
    ) -> Result<RankingModel> {
        let mlc = read_dataset(mlc_path, n_targets, LabelKind::Relevance)?;
        let mtr = read_dataset(mtr_path, n_targets, LabelKind::Rank)?;
        self.train(&mlc, &mtr, n_targets, output_dir, cross_validate)
    }

    pub fn model_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.config.model_file_name)
    }

    pub fn cv_report_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.config.cv_report_file_name)
    }

    /// Out-of-fold predictions of one ensemble over `config.cv_folds` folds
    fn out_of_fold(&self, task: EnsembleTask, dataset: &Dataset) -> Result<(Array2<f64>, Vec<CVSplit>)> {
        let splits = CrossValidator::new(self.config.cv_folds)
            .with_shuffle(self.config.shuffle)
            .with_random_state(self.config.seed)
            .split(dataset.n_instances())?;

        let run_fold = |split: &CVSplit| -> Result<Array2<f64>> {
            let train = dataset.subset(&split.train_indices);
            let seed = derive_seed(self.config.seed, &[split.fold_idx as u64 + 1]);
            let ensemble = self.fit_ensemble(task, &train, seed)?;
            let test_x = dataset.features().select(Axis(0), &split.test_indices);
            ensemble.predict_with_threshold(&test_x, 0.5, false)
        };

        let per_fold: Vec<Array2<f64>> = if self.config.parallel {
            splits.par_iter().map(run_fold).collect::<Result<_>>()?
        } else {
            splits.iter().map(run_fold).collect::<Result<_>>()?
        };

        let mut oof = Array2::zeros((dataset.n_instances(), dataset.n_targets()));
        for (split, preds) in splits.iter().zip(per_fold.iter()) {
            for (local, &global) in split.test_indices.iter().enumerate() {
                oof.row_mut(global).assign(&preds.row(local));
            }
            tracing::debug!(fold = split.fold_idx, task = %task, n_test = split.test_indices.len(), "Fold predicted");
        }
        Ok((oof, splits))
    }

    /// Per-fold aggregate of `metric`
    fn fold_scores(
        truth: &Dataset,
        predicted: &Dataset,
        splits: &[CVSplit],
        mode: EvaluationMode,
        metric: &str,
    ) -> Result<CVResults> {
        let scores = splits
            .iter()
            .map(|split| {
                let report = evaluate(
                    &truth.subset(&split.test_indices),
                    &predicted.subset(&split.test_indices),
                    truth.n_targets(),
                    "fold",
                    mode,
                )?;
                Ok(report.aggregate(metric).unwrap_or_default())
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(CVResults::from_scores(scores))
    }

    /// k-fold cross-validation of both ensembles, each on its own dataset.
    ///
    /// Every instance is predicted exactly once, by the ensemble fitted on
    /// the other folds.
    pub fn cross_validate(&self, mlc: &Dataset, mtr: &Dataset, n_targets: usize) -> Result<CrossValidationOutcome> {
        self.config.validate()?;
        Self::check_inputs(mlc, mtr, n_targets)?;

        tracing::info!(folds = self.config.cv_folds, seed = self.config.seed, "Cross-validating");

        let (relevance_oof, mlc_splits) = self.out_of_fold(EnsembleTask::BinaryRelevance, mlc)?;
        let (rank_oof, mtr_splits) = self.out_of_fold(EnsembleTask::Regression, mtr)?;

        let bipartition_predictions =
            mlc.with_labels(format!("{} (cross-validated)", mlc.name()), Labels::relevance(relevance_oof))?;
        let rank_predictions =
            mtr.with_labels(format!("{} (cross-validated)", mtr.name()), Labels::rank(rank_oof))?;

        let rank_report = evaluate(mtr, &rank_predictions, n_targets, CV_RANK_LABEL, EvaluationMode::Rank)?;
        let bipartition_report = evaluate(
            mlc,
            &bipartition_predictions,
            n_targets,
            CV_BIPARTITION_LABEL,
            EvaluationMode::Bipartition,
        )?;

        let rank_folds = Self::fold_scores(mtr, &rank_predictions, &mtr_splits, EvaluationMode::Rank, MEAN_SPEARMAN_RHO)?;
        let bipartition_folds = Self::fold_scores(
            mlc,
            &bipartition_predictions,
            &mlc_splits,
            EvaluationMode::Bipartition,
            MEAN_HAMMING_ACCURACY,
        )?;

        tracing::info!(
            top1_hit_rate = rank_report.aggregate(TOP1_HIT_RATE).unwrap_or_default(),
            spearman_std_across_folds = rank_folds.std_score,
            "Cross-validated rank predictions"
        );

        Ok(CrossValidationOutcome {
            rank_predictions,
            bipartition_predictions,
            rank_report,
            bipartition_report,
            rank_folds,
            bipartition_folds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attribute, Schema};
    use crate::error::RaksorError;

    fn datasets(n: usize) -> (Dataset, Dataset) {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| ((i * 13 + j * 5) % n) as f64 / n as f64);
        let rank = Array2::from_shape_fn((n, 3), |(i, t)| 1.0 - (features[[i, 0]] - t as f64 / 2.0).abs());
        let relevance = rank.mapv(|v| if v > 0.6 { 1.0 } else { 0.0 });

        let schema = |kind: fn(String) -> Attribute| {
            Schema::new(
                "toy",
                vec![Attribute::numeric("f0"), Attribute::numeric("f1")],
                (0..3).map(|t| kind(format!("r{}", t))).collect(),
            )
            .unwrap()
        };
        let mlc = Dataset::new("mlc", schema(Attribute::binary), features.clone(), Some(Labels::relevance(relevance))).unwrap();
        let mtr = Dataset::new("mtr", schema(Attribute::numeric), features, Some(Labels::rank(rank))).unwrap();
        (mlc, mtr)
    }

    fn manager() -> TrainingManager {
        TrainingManager::new(TrainingConfig::default().with_n_estimators(5).with_cv_folds(4))
    }

    #[test]
    fn test_train_writes_model() {
        let dir = tempfile::tempdir().unwrap();
        let (mlc, mtr) = datasets(24);

        let model = manager().train(&mlc, &mtr, 3, dir.path(), false).unwrap();
        assert_eq!(model.n_targets(), 3);
        assert!(dir.path().join("raksor_model.json").exists());
        assert!(!dir.path().join("raksor_cross_validation.csv").exists());
    }

    #[test]
    fn test_wrong_target_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mlc, mtr) = datasets(12);
        let err = manager().train(&mlc, &mtr, 4, dir.path(), false).unwrap_err();
        assert!(matches!(err, RaksorError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("mlc"));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mlc, mtr) = datasets(12);
        let empty = mtr.subset(&[]);
        let err = manager().train(&mlc, &empty, 3, dir.path(), false).unwrap_err();
        assert!(matches!(err, RaksorError::EmptyDataset(_)));
    }

    #[test]
    fn test_cross_validation_predicts_every_instance_once() {
        let (mlc, mtr) = datasets(22);
        let outcome = manager().cross_validate(&mlc, &mtr, 3).unwrap();

        assert_eq!(outcome.rank_predictions.n_instances(), 22);
        assert_eq!(outcome.bipartition_predictions.n_instances(), 22);
        assert_eq!(outcome.rank_report.instance_values("spearman_rho").len(), 22);
        assert_eq!(outcome.rank_folds.n_folds, 4);
        assert_eq!(outcome.bipartition_folds.n_folds, 4);
    }
}
