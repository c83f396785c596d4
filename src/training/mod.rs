//! Model training module
//!
//! Provides the per-target base learners and the training manager:
//! - Decision trees and Random Forests
//! - Ridge regression (also the stacking meta-learner)
//! - Seeded k-fold cross-validation
//! - [`TrainingManager`], which fits and persists ranking models

mod config;
mod manager;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;
pub mod models;
pub mod random_forest;

pub use config::{LearnerKind, TrainingConfig};
pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use linear_models::RidgeRegression;
pub use manager::{CrossValidationOutcome, TrainingManager, CV_BIPARTITION_LABEL, CV_RANK_LABEL};
pub use models::{BaseLearner, ConstantPredictor, Learner, TaskType};
pub use random_forest::{MaxFeatures, RandomForest};
