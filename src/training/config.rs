//! Training configuration

use crate::error::{RaksorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Family of base learner fitted for every target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnerKind {
    /// Single CART tree
    DecisionTree,
    /// Bagged CART trees with per-split feature sampling
    RandomForest,
    /// L2-regularized linear model (regression targets only)
    Ridge,
}

impl std::fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearnerKind::DecisionTree => write!(f, "decision_tree"),
            LearnerKind::RandomForest => write!(f, "random_forest"),
            LearnerKind::Ridge => write!(f, "ridge"),
        }
    }
}

/// Configuration for fitting the regressor and classifier ensembles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Base learner for the rank (MTR) ensemble
    pub regressor: LearnerKind,

    /// Base learner for the relevance (MLC) ensemble
    pub classifier: LearnerKind,

    /// Number of trees (for forests)
    pub n_estimators: usize,

    /// Maximum depth of trees
    pub max_depth: Option<usize>,

    /// Minimum samples a tree node needs before it may split
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// L2 penalty of ridge learners, including the stacking meta-regressors
    pub ridge_alpha: f64,

    /// Fit the multi-target stacking layer over the base regressors
    pub stacking: bool,

    /// Internal folds used to build out-of-fold meta features
    pub stacking_folds: usize,

    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Shuffle instances before cutting folds
    pub shuffle: bool,

    /// Random seed for reproducibility
    pub seed: u64,

    /// Fit targets, folds and trees on the rayon pool
    pub parallel: bool,

    /// File name of the persisted model inside the output directory
    pub model_file_name: String,

    /// File name of the cross-validation report inside the output directory
    pub cv_report_file_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            regressor: LearnerKind::RandomForest,
            classifier: LearnerKind::RandomForest,
            n_estimators: 50,
            max_depth: Some(8),
            min_samples_split: 2,
            min_samples_leaf: 1,
            ridge_alpha: 1.0,
            stacking: true,
            stacking_folds: 5,
            cv_folds: 10,
            shuffle: true,
            seed: 42,
            parallel: true,
            model_file_name: "raksor_model.json".to_string(),
            cv_report_file_name: "raksor_cross_validation.csv".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            RaksorError::SerializationError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the regressor family
    pub fn with_regressor(mut self, kind: LearnerKind) -> Self {
        self.regressor = kind;
        self
    }

    /// Builder method to set the classifier family
    pub fn with_classifier(mut self, kind: LearnerKind) -> Self {
        self.classifier = kind;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to toggle the stacking layer
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_stacking(mut self, stacking: bool) -> Self {
        self.stacking = stacking;
        self
    }

    /// Builder method to set CV folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to toggle rayon parallelism
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject parameter combinations that cannot train
    pub fn validate(&self) -> Result<()> {
        if self.classifier == LearnerKind::Ridge {
            return Err(RaksorError::InvalidParameter {
                name: "classifier".to_string(),
                value: self.classifier.to_string(),
                reason: "ridge is a regressor; use decision_tree or random_forest".to_string(),
            });
        }
        if self.n_estimators == 0 {
            return Err(RaksorError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_samples_split < 2 {
            return Err(RaksorError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: self.min_samples_split.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(RaksorError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.stacking && self.stacking_folds < 2 {
            return Err(RaksorError::InvalidParameter {
                name: "stacking_folds".to_string(),
                value: self.stacking_folds.to_string(),
                reason: "must be at least 2 when stacking is enabled".to_string(),
            });
        }
        if !(self.ridge_alpha >= 0.0) {
            return Err(RaksorError::InvalidParameter {
                name: "ridge_alpha".to_string(),
                value: self.ridge_alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}
