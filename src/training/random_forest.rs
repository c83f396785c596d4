//! Random Forest implementation

use super::decision_tree::DecisionTree;
use crate::error::{RaksorError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest model
///
/// Regression forests average tree outputs. Classification forests return
/// the fraction of trees voting for class 1, so a binary target yields a
/// score in `[0, 1]` that callers threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: u64,
    /// Build trees on the rayon pool
    pub parallel: bool,
    /// Is classification task
    is_classification: bool,
    /// Number of features
    n_features: usize,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// All features
    All,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_regressor(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: 42,
            parallel: true,
            is_classification: true,
            n_features: 0,
        }
    }

    /// Create a new regressor forest
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            // Regression forests look at a third of the features, as is customary
            max_features: MaxFeatures::Fraction(1.0 / 3.0),
            is_classification: false,
            ..Self::new_classifier(n_estimators)
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Toggle parallel tree construction
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        let k = match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }

    fn build_tree(&self, x: &Array2<f64>, y: &Array1<f64>, tree_idx: usize, max_features: usize) -> Result<DecisionTree> {
        let n_samples = x.nrows();
        let seed = self.random_state.wrapping_add(tree_idx as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let sample_indices: Vec<usize> = if self.bootstrap {
            (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
        } else {
            (0..n_samples).collect()
        };

        let x_boot = x.select(Axis(0), &sample_indices);
        let y_boot = Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

        let mut tree = if self.is_classification {
            DecisionTree::new_classifier()
        } else {
            DecisionTree::new_regressor()
        };
        if let Some(d) = self.max_depth {
            tree = tree.with_max_depth(d);
        }
        tree = tree
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(max_features)
            .with_random_state(rng.gen());

        tree.fit(&x_boot, &y_boot)?;
        Ok(tree)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(RaksorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || self.n_estimators == 0 {
            return Err(RaksorError::ValidationError(format!(
                "Cannot fit a forest of {} trees on {} samples",
                self.n_estimators, n_samples
            )));
        }

        self.n_features = x.ncols();
        let max_features = self.compute_max_features(self.n_features);

        // Each tree owns its seed, so parallel and sequential builds agree
        let trees: Result<Vec<DecisionTree>> = if self.parallel {
            (0..self.n_estimators)
                .into_par_iter()
                .map(|tree_idx| self.build_tree(x, y, tree_idx, max_features))
                .collect()
        } else {
            (0..self.n_estimators)
                .map(|tree_idx| self.build_tree(x, y, tree_idx, max_features))
                .collect()
        };

        self.trees = trees?;
        Ok(self)
    }

    /// Predict a single feature row
    pub fn predict_row(&self, sample: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(RaksorError::ModelNotFitted);
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            let value = tree.predict_row(sample)?;
            sum += if self.is_classification {
                if value >= 0.5 { 1.0 } else { 0.0 }
            } else {
                value
            };
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let predictions = x
            .rows()
            .into_iter()
            .map(|row| self.predict_row(&row.to_vec()))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from_vec(predictions))
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
