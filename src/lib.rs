//! RakSOR - ranking ontology reasoners
//!
//! Predicts, for an ontology described by a numeric feature vector, how well
//! each of N candidate reasoners will perform on it:
//! - a multi-target regressor ensemble yields a continuous score per reasoner,
//!   sorted into a ranking
//! - a multi-label classifier ensemble yields a relevant / not relevant flag
//!   per reasoner
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Tabular datasets with a trailing target block, ARFF codec
//! - [`ranking`] - Deterministic score-to-rank conversion
//!
//! ## Learning
//! - [`training`] - Base learners, cross-validation, [`training::TrainingManager`]
//! - [`ensemble`] - Per-target ensembles and multi-target stacking
//! - [`model`] - The persisted model bundle
//! - [`export`] - Versioned model files
//!
//! ## Use
//! - [`inference`] - [`inference::PredictionManager`]
//! - [`evaluation`] - Rank and bipartition metrics, CSV reports
//! - [`profiler`] - Ontology feature extraction interface
//! - [`cli`] - Command-line interface

pub mod error;

pub mod dataset;
pub mod ranking;

pub mod ensemble;
pub mod export;
pub mod model;
pub mod training;

pub mod evaluation;
pub mod inference;
pub mod profiler;

pub mod cli;

pub use error::{RaksorError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{RaksorError, Result};

    pub use crate::dataset::arff::{read_dataset, write_dataset};
    pub use crate::dataset::{Attribute, Dataset, LabelKind, Labels, Schema};
    pub use crate::ranking::{rank_order, rank_positions};

    pub use crate::training::{LearnerKind, TrainingConfig, TrainingManager};
    pub use crate::ensemble::{EnsembleBuilder, EnsembleTask, TargetEnsemble};
    pub use crate::model::{ModelMetadata, RankingModel};
    pub use crate::export::{load_model, save_model};

    pub use crate::inference::{InferenceConfig, PredictionManager, PredictionResult, PredictionSet};
    pub use crate::evaluation::{EvaluationMode, EvaluationReport, RankingEvaluation};
    pub use crate::profiler::FeatureProfiler;
}
