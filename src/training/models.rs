//! Base learners behind one per-target interface
//!
//! Every target of an ensemble owns one [`BaseLearner`]. The enum keeps the
//! ensemble a plain `Vec` of serializable values, so the number of targets is
//! runtime data and the fitted models persist without trait objects.

use super::config::{LearnerKind, TrainingConfig};
use super::decision_tree::DecisionTree;
use super::linear_models::RidgeRegression;
use super::random_forest::RandomForest;
use crate::error::{RaksorError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of ML task a learner is fitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Continuous target
    Regression,
    /// Binary {0, 1} target
    BinaryClassification,
}

/// Trait for per-target models
pub trait Learner: Send + Sync {
    /// Fit the model to one target column
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict a single feature row
    fn predict_one(&self, features: &[f64]) -> Result<f64>;

    /// Predict every row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let predictions = x
            .rows()
            .into_iter()
            .map(|row| self.predict_one(&row.to_vec()))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool;
}

/// Predictor that ignores its input and returns one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantPredictor {
    pub value: f64,
}

impl ConstantPredictor {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// Mean for regression, majority class for classification (ties go to 0)
    pub fn fallback(task: TaskType, y: &Array1<f64>) -> Self {
        let value = match task {
            TaskType::Regression => y.mean().unwrap_or(0.0),
            TaskType::BinaryClassification => {
                let ones = y.iter().filter(|&&v| v >= 0.5).count();
                if ones * 2 > y.len() { 1.0 } else { 0.0 }
            }
        };
        Self { value }
    }
}

impl Learner for ConstantPredictor {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.value = y.mean().unwrap_or(self.value);
        Ok(())
    }

    fn predict_one(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.value)
    }

    fn is_fitted(&self) -> bool {
        true
    }
}

/// Single distinct value of a label column, if it has exactly one
pub fn single_value(y: &Array1<f64>) -> Option<f64> {
    let mut distinct: BTreeMap<u64, f64> = BTreeMap::new();
    for &v in y.iter() {
        distinct.insert(v.to_bits(), v);
        if distinct.len() > 1 {
            return None;
        }
    }
    distinct.into_values().next()
}

/// A fitted or unfitted per-target model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum BaseLearner {
    Constant(ConstantPredictor),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Ridge(RidgeRegression),
}

impl BaseLearner {
    /// Build an unfitted learner of `kind` for `task`, seeded with `seed`
    pub fn build(kind: LearnerKind, task: TaskType, config: &TrainingConfig, seed: u64) -> Result<Self> {
        let classification = task == TaskType::BinaryClassification;
        let learner = match kind {
            LearnerKind::DecisionTree => {
                let mut tree = if classification {
                    DecisionTree::new_classifier()
                } else {
                    DecisionTree::new_regressor()
                };
                if let Some(depth) = config.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                BaseLearner::DecisionTree(
                    tree.with_min_samples_split(config.min_samples_split)
                        .with_min_samples_leaf(config.min_samples_leaf)
                        .with_random_state(seed),
                )
            }
            LearnerKind::RandomForest => {
                let forest = if classification {
                    RandomForest::new_classifier(config.n_estimators)
                } else {
                    RandomForest::new_regressor(config.n_estimators)
                };
                BaseLearner::RandomForest(
                    forest
                        .with_max_depth(config.max_depth)
                        .with_min_samples_split(config.min_samples_split)
                        .with_min_samples_leaf(config.min_samples_leaf)
                        .with_random_state(seed)
                        .with_parallel(config.parallel),
                )
            }
            LearnerKind::Ridge => {
                if classification {
                    return Err(RaksorError::InvalidParameter {
                        name: "classifier".to_string(),
                        value: kind.to_string(),
                        reason: "ridge cannot fit binary relevance labels".to_string(),
                    });
                }
                BaseLearner::Ridge(RidgeRegression::new(config.ridge_alpha))
            }
        };
        Ok(learner)
    }

    pub fn constant(value: f64) -> Self {
        BaseLearner::Constant(ConstantPredictor::new(value))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, BaseLearner::Constant(_))
    }

    /// Short name used in logs and metadata
    pub fn name(&self) -> &'static str {
        match self {
            BaseLearner::Constant(_) => "constant",
            BaseLearner::DecisionTree(_) => "decision_tree",
            BaseLearner::RandomForest(_) => "random_forest",
            BaseLearner::Ridge(_) => "ridge",
        }
    }
}

impl Learner for BaseLearner {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            BaseLearner::Constant(m) => m.fit(x, y),
            BaseLearner::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            BaseLearner::RandomForest(m) => m.fit(x, y).map(|_| ()),
            BaseLearner::Ridge(m) => m.fit(x, y).map(|_| ()),
        }
    }

    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        match self {
            BaseLearner::Constant(m) => m.predict_one(features),
            BaseLearner::DecisionTree(m) => m.predict_row(features),
            BaseLearner::RandomForest(m) => m.predict_row(features),
            BaseLearner::Ridge(m) => m.predict_row(features),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            BaseLearner::Constant(_) => true,
            BaseLearner::DecisionTree(m) => m.is_fitted(),
            BaseLearner::RandomForest(m) => m.n_trees() > 0,
            BaseLearner::Ridge(m) => m.is_fitted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_value() {
        assert_eq!(single_value(&array![0.0, 0.0, 0.0]), Some(0.0));
        assert_eq!(single_value(&array![0.0, 1.0]), None);
        assert_eq!(single_value(&array![]), None);
    }

    #[test]
    fn test_fallback_majority_class() {
        let y = array![1.0, 1.0, 0.0];
        assert_eq!(ConstantPredictor::fallback(TaskType::BinaryClassification, &y).value, 1.0);
        let tie = array![1.0, 0.0];
        assert_eq!(ConstantPredictor::fallback(TaskType::BinaryClassification, &tie).value, 0.0);
        assert_eq!(ConstantPredictor::fallback(TaskType::Regression, &y).value, 2.0 / 3.0);
    }

    #[test]
    fn test_build_and_fit_each_kind() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.2, 0.8], [0.9, 0.1], [0.5, 0.5], [0.7, 0.2]];
        let y = array![0.1, 0.9, 0.2, 0.8, 0.5, 0.7];
        let config = TrainingConfig::default().with_n_estimators(5);

        for kind in [LearnerKind::DecisionTree, LearnerKind::RandomForest, LearnerKind::Ridge] {
            let mut learner = BaseLearner::build(kind, TaskType::Regression, &config, 1).unwrap();
            assert!(!learner.is_fitted());
            learner.fit(&x, &y).unwrap();
            assert!(learner.is_fitted());
            assert_eq!(learner.predict(&x).unwrap().len(), 6);
        }
    }

    #[test]
    fn test_min_samples_split_reaches_trees() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let config = TrainingConfig::default().with_n_estimators(3).with_min_samples_split(10);

        let mut tree = BaseLearner::build(LearnerKind::DecisionTree, TaskType::Regression, &config, 1).unwrap();
        tree.fit(&x, &y).unwrap();
        let preds = tree.predict(&x).unwrap();
        assert!(preds.iter().all(|&p| (p - 0.5).abs() < 1e-12));

        match BaseLearner::build(LearnerKind::RandomForest, TaskType::Regression, &config, 1).unwrap() {
            BaseLearner::RandomForest(forest) => assert_eq!(forest.min_samples_split, 10),
            other => panic!("expected a forest, got {}", other.name()),
        }
    }

    #[test]
    fn test_ridge_classifier_rejected() {
        let config = TrainingConfig::default();
        assert!(BaseLearner::build(LearnerKind::Ridge, TaskType::BinaryClassification, &config, 0).is_err());
    }

    #[test]
    fn test_serde_tagged() {
        let learner = BaseLearner::constant(0.25);
        let json = serde_json::to_string(&learner).unwrap();
        assert!(json.contains("\"Constant\""));
        let back: BaseLearner = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict_one(&[1.0]).unwrap(), 0.25);
    }
}
