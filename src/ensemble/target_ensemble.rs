//! N independent base learners, one per target

use super::derive_seed;
use super::stacking::MultiTargetStacking;
use crate::error::{RaksorError, Result};
use crate::training::{LearnerKind, TrainingConfig};
use crate::training::cross_validation::{k_fold, CVSplit};
use crate::training::models::{single_value, BaseLearner, ConstantPredictor, Learner, TaskType};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Stream id for the stacking fold shuffle, kept apart from target indices
const STACKING_STREAM: u64 = u64::MAX;

/// Which half of the ranking model an ensemble is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsembleTask {
    /// Multi-target regression over rank scores
    Regression,
    /// Multi-label classification, one binary classifier per target
    BinaryRelevance,
}

impl EnsembleTask {
    pub fn task_type(&self) -> TaskType {
        match self {
            EnsembleTask::Regression => TaskType::Regression,
            EnsembleTask::BinaryRelevance => TaskType::BinaryClassification,
        }
    }
}

impl std::fmt::Display for EnsembleTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnsembleTask::Regression => write!(f, "regression"),
            EnsembleTask::BinaryRelevance => write!(f, "binary relevance"),
        }
    }
}

/// Why a target ended up with a constant predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DegenerateReason {
    /// Every training label had the same value
    SingleValue,
    /// The learner's fit returned an error
    FitFailed(String),
}

/// Record of a target that was replaced by a constant predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateTarget {
    pub target: usize,
    pub name: String,
    pub value: f64,
    pub reason: DegenerateReason,
}

/// Fitted per-target ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEnsemble {
    task: EnsembleTask,
    learner: LearnerKind,
    members: Vec<BaseLearner>,
    stacking: Option<MultiTargetStacking>,
    degenerate: Vec<DegenerateTarget>,
    n_features: usize,
}

impl TargetEnsemble {
    pub fn task(&self) -> EnsembleTask {
        self.task
    }

    pub fn learner(&self) -> LearnerKind {
        self.learner
    }

    pub fn n_targets(&self) -> usize {
        self.members.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn members(&self) -> &[BaseLearner] {
        &self.members
    }

    pub fn stacking(&self) -> Option<&MultiTargetStacking> {
        self.stacking.as_ref()
    }

    pub fn degenerate(&self) -> &[DegenerateTarget] {
        &self.degenerate
    }

    /// Raw scores for one feature row: one value per target.
    ///
    /// Regression scores pass through the stacking layer when present;
    /// classification scores are the positive-class vote in `[0, 1]`.
    pub fn predict_row(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(RaksorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", features.len()),
            });
        }
        let base = self
            .members
            .iter()
            .map(|m| m.predict_one(features))
            .collect::<Result<Vec<f64>>>()?;

        match &self.stacking {
            Some(stacking) => stacking.predict_row(&base, features),
            None => Ok(base),
        }
    }

    /// Raw scores for every row of `x` (n × N); row order is preserved
    pub fn predict_scores(&self, x: &Array2<f64>, parallel: bool) -> Result<Array2<f64>> {
        let predict = |i: usize| self.predict_row(&x.row(i).to_vec());
        let rows: Vec<Vec<f64>> = if parallel {
            (0..x.nrows()).into_par_iter().map(predict).collect::<Result<_>>()?
        } else {
            (0..x.nrows()).map(predict).collect::<Result<_>>()?
        };

        let n_targets = self.n_targets();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), n_targets), flat)?)
    }

    /// Predictions for every row of `x`; classification scores are
    /// thresholded to {0, 1} at `threshold`
    pub fn predict_with_threshold(&self, x: &Array2<f64>, threshold: f64, parallel: bool) -> Result<Array2<f64>> {
        let scores = self.predict_scores(x, parallel)?;
        Ok(match self.task {
            EnsembleTask::Regression => scores,
            EnsembleTask::BinaryRelevance => scores.mapv(|s| if s >= threshold { 1.0 } else { 0.0 }),
        })
    }

    /// Predictions for every row of `x` at the default 0.5 threshold
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.predict_with_threshold(x, 0.5, true)
    }
}

/// Fits a [`TargetEnsemble`] from a feature matrix and an n × N label block
#[derive(Debug, Clone)]
pub struct EnsembleBuilder {
    task: EnsembleTask,
    learner: LearnerKind,
    config: TrainingConfig,
    seed: u64,
    stacking: bool,
    target_names: Vec<String>,
}

impl EnsembleBuilder {
    /// Builder for `task`, taking the learner family and stacking switch from `config`.
    ///
    /// Stacking only applies to regression ensembles.
    pub fn new(task: EnsembleTask, config: &TrainingConfig) -> Self {
        let learner = match task {
            EnsembleTask::Regression => config.regressor,
            EnsembleTask::BinaryRelevance => config.classifier,
        };
        Self {
            task,
            learner,
            config: config.clone(),
            seed: config.seed,
            stacking: config.stacking && task == EnsembleTask::Regression,
            target_names: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_stacking(mut self, stacking: bool) -> Self {
        self.stacking = stacking && self.task == EnsembleTask::Regression;
        self
    }

    pub fn with_target_names(mut self, names: Vec<String>) -> Self {
        self.target_names = names;
        self
    }

    fn target_name(&self, target: usize) -> String {
        self.target_names
            .get(target)
            .cloned()
            .unwrap_or_else(|| format!("target_{}", target))
    }

    /// Fit one target; degeneracy becomes a constant member plus a record
    fn fit_target(
        &self,
        target: usize,
        x: &Array2<f64>,
        y: &Array1<f64>,
        seed: u64,
    ) -> Result<(BaseLearner, Option<DegenerateTarget>)> {
        let task = self.task.task_type();

        if let Some(value) = single_value(y) {
            let record = DegenerateTarget {
                target,
                name: self.target_name(target),
                value,
                reason: DegenerateReason::SingleValue,
            };
            return Ok((BaseLearner::constant(value), Some(record)));
        }

        let mut learner = BaseLearner::build(self.learner, task, &self.config, seed)?;
        match learner.fit(x, y) {
            Ok(()) => Ok((learner, None)),
            Err(e) => {
                let fallback = ConstantPredictor::fallback(task, y);
                let record = DegenerateTarget {
                    target,
                    name: self.target_name(target),
                    value: fallback.value,
                    reason: DegenerateReason::FitFailed(e.to_string()),
                };
                Ok((BaseLearner::Constant(fallback), Some(record)))
            }
        }
    }

    /// Fit every target's member; `fold` distinguishes seed streams of internal folds
    fn fit_members(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        fold: u64,
    ) -> Result<Vec<(BaseLearner, Option<DegenerateTarget>)>> {
        let fit = |target: usize| {
            let y_t = y.column(target).to_owned();
            let seed = derive_seed(self.seed, &[target as u64, fold]);
            self.fit_target(target, x, &y_t, seed)
        };

        if self.config.parallel {
            (0..y.ncols()).into_par_iter().map(fit).collect()
        } else {
            (0..y.ncols()).map(fit).collect()
        }
    }

    /// Out-of-fold base predictions (n × N) over `folds` internal folds
    fn out_of_fold_predictions(&self, x: &Array2<f64>, y: &Array2<f64>, folds: usize) -> Result<Array2<f64>> {
        let splits = k_fold(x.nrows(), folds, derive_seed(self.seed, &[STACKING_STREAM]))?;

        let fold_predictions = |split: &CVSplit| -> Result<(Vec<usize>, Array2<f64>)> {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);

            let members = self.fit_members(&x_train, &y_train, split.fold_idx as u64 + 1)?;
            let mut preds = Array2::zeros((x_test.nrows(), y.ncols()));
            for (target, (member, degenerate)) in members.iter().enumerate() {
                if let Some(d) = degenerate {
                    tracing::debug!(target, fold = split.fold_idx, value = d.value, "Constant member inside stacking fold");
                }
                preds.column_mut(target).assign(&member.predict(&x_test)?);
            }
            Ok((split.test_indices.clone(), preds))
        };

        let per_fold: Vec<(Vec<usize>, Array2<f64>)> = if self.config.parallel {
            splits.par_iter().map(fold_predictions).collect::<Result<_>>()?
        } else {
            splits.iter().map(fold_predictions).collect::<Result<_>>()?
        };

        let mut oof = Array2::zeros(y.dim());
        for (indices, preds) in per_fold {
            for (local, &global) in indices.iter().enumerate() {
                oof.row_mut(global).assign(&preds.row(local));
            }
        }
        Ok(oof)
    }

    /// Fit the ensemble on `x` (n × F) and `y` (n × N)
    pub fn fit(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<TargetEnsemble> {
        if x.nrows() != y.nrows() {
            return Err(RaksorError::ShapeError {
                expected: format!("{} label rows", x.nrows()),
                actual: format!("{}", y.nrows()),
            });
        }
        if x.nrows() == 0 {
            return Err(RaksorError::EmptyDataset(format!("{} training set", self.task)));
        }
        if !self.target_names.is_empty() && self.target_names.len() != y.ncols() {
            return Err(RaksorError::schema_mismatch(
                format!("{} label block", self.task),
                format!("N={} target columns", self.target_names.len()),
                format!("N={}", y.ncols()),
            ));
        }

        let fitted = self.fit_members(x, y, 0)?;
        let mut members = Vec::with_capacity(fitted.len());
        let mut degenerate = Vec::new();
        for (member, record) in fitted {
            if let Some(record) = record {
                tracing::warn!(
                    target = record.target,
                    name = %record.name,
                    value = record.value,
                    reason = ?record.reason,
                    "Degenerate target, using constant predictor"
                );
                degenerate.push(record);
            }
            members.push(member);
        }

        // Meta layer strictly after every base member is fitted
        let stacking = if self.stacking {
            let folds = self.config.stacking_folds;
            if x.nrows() < folds.max(2) {
                tracing::warn!(
                    n_instances = x.nrows(),
                    folds,
                    "Too few instances for stacking folds, skipping meta layer"
                );
                None
            } else {
                let oof = self.out_of_fold_predictions(x, y, folds)?;
                Some(MultiTargetStacking::fit(&oof, x, y, self.config.ridge_alpha, self.config.parallel)?)
            }
        } else {
            None
        };

        tracing::debug!(
            task = %self.task,
            learner = %self.learner,
            n_targets = members.len(),
            degenerate = degenerate.len(),
            stacked = stacking.is_some(),
            "Fitted target ensemble"
        );

        Ok(TargetEnsemble {
            task: self.task,
            learner: self.learner,
            members,
            stacking,
            degenerate,
            n_features: x.ncols(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy() -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| ((i * 7 + j * 3) % 20) as f64 / 20.0);
        let rank = Array2::from_shape_fn((20, 3), |(i, t)| {
            let f = x[[i, 0]];
            if t == 2 { 0.0 } else { (f - t as f64 * 0.5).abs() }
        });
        let relevance = rank.mapv(|v| if v > 0.3 { 1.0 } else { 0.0 });
        (x, rank, relevance)
    }

    fn config() -> TrainingConfig {
        TrainingConfig::default().with_n_estimators(5)
    }

    #[test]
    fn test_degenerate_target_becomes_constant() {
        let (x, rank, _) = toy();
        let ensemble = EnsembleBuilder::new(EnsembleTask::Regression, &config())
            .with_stacking(false)
            .fit(&x, &rank)
            .unwrap();

        assert_eq!(ensemble.n_targets(), 3);
        assert_eq!(ensemble.degenerate().len(), 1);
        assert_eq!(ensemble.degenerate()[0].target, 2);
        assert!(ensemble.members()[2].is_constant());
        assert!(!ensemble.members()[0].is_constant());

        let preds = ensemble.predict(&x).unwrap();
        assert!(preds.column(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_binary_relevance_outputs_flags() {
        let (x, _, relevance) = toy();
        let ensemble = EnsembleBuilder::new(EnsembleTask::BinaryRelevance, &config())
            .fit(&x, &relevance)
            .unwrap();

        assert!(ensemble.stacking().is_none());
        let preds = ensemble.predict(&x).unwrap();
        assert_eq!(preds.dim(), (20, 3));
        assert!(preds.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_stacking_is_fitted_for_regression() {
        let (x, rank, _) = toy();
        let ensemble = EnsembleBuilder::new(EnsembleTask::Regression, &config())
            .fit(&x, &rank)
            .unwrap();
        let stacking = ensemble.stacking().unwrap();
        assert_eq!(stacking.n_targets(), 3);

        let preds = ensemble.predict(&x).unwrap();
        assert!(preds.column(2).iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_stacking_skipped_with_too_few_instances() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![[0.1], [0.5], [0.9]];
        let ensemble = EnsembleBuilder::new(EnsembleTask::Regression, &config())
            .fit(&x, &y)
            .unwrap();
        assert!(ensemble.stacking().is_none());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (x, rank, _) = toy();
        let par = EnsembleBuilder::new(EnsembleTask::Regression, &config())
            .fit(&x, &rank)
            .unwrap();
        let seq = EnsembleBuilder::new(EnsembleTask::Regression, &config().with_parallel(false))
            .fit(&x, &rank)
            .unwrap();

        assert_eq!(
            par.predict_scores(&x, true).unwrap(),
            seq.predict_scores(&x, false).unwrap()
        );
    }

    #[test]
    fn test_row_width_checked() {
        let (x, rank, _) = toy();
        let ensemble = EnsembleBuilder::new(EnsembleTask::Regression, &config())
            .with_stacking(false)
            .fit(&x, &rank)
            .unwrap();
        assert!(matches!(
            ensemble.predict_row(&[0.1]),
            Err(RaksorError::ShapeError { .. })
        ));
    }
}
