//! Prediction module
//!
//! Loads persisted ranking models and applies them to datasets, single
//! feature vectors, or profiled ontologies.

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{write_ranking_table, PredictionManager, PredictionResult, PredictionSet};
