//! Prediction manager
//!
//! Applies a [`RankingModel`] to unlabeled instances:
//! - rank scores from the regressor ensemble (through stacking when present)
//! - relevance flags from the classifier ensemble
//! - a total order over targets derived from the scores alone
//!
//! Relevance flags are reported next to the rank and never reorder it.

use super::InferenceConfig;
use crate::dataset::arff::{read_dataset, write_dataset};
use crate::dataset::{Dataset, LabelKind, Labels};
use crate::error::{RaksorError, Result};
use crate::export::load_model;
use crate::model::RankingModel;
use crate::profiler::FeatureProfiler;
use crate::ranking::{positions_from_order, rank_order};
use ndarray::Array2;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Prediction for one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Regressor score per target
    pub scores: Vec<f64>,
    /// Classifier flag per target
    pub relevance: Vec<bool>,
    /// Target indices best-first
    pub rank: Vec<usize>,
}

impl PredictionResult {
    /// Combine per-target scores and classifier outputs into a result
    pub fn from_scores(scores: Vec<f64>, relevance_scores: &[f64], threshold: f64) -> Self {
        let rank = rank_order(&scores);
        let relevance = relevance_scores.iter().map(|&s| s >= threshold).collect();
        Self {
            scores,
            relevance,
            rank,
        }
    }

    pub fn top_target(&self) -> Option<usize> {
        self.rank.first().copied()
    }

    /// 1-based rank position of every target
    pub fn positions(&self) -> Vec<usize> {
        positions_from_order(&self.rank)
    }

    pub fn n_relevant(&self) -> usize {
        self.relevance.iter().filter(|&&r| r).count()
    }
}

/// Predictions for a whole dataset, in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSet {
    target_names: Vec<String>,
    results: Vec<PredictionResult>,
}

impl PredictionSet {
    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn results(&self) -> &[PredictionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Scores as an n × N matrix
    pub fn score_matrix(&self) -> Array2<f64> {
        let n_targets = self.target_names.len();
        Array2::from_shape_fn((self.results.len(), n_targets), |(i, t)| self.results[i].scores[t])
    }

    /// Relevance flags as an n × N {0, 1} matrix
    pub fn relevance_matrix(&self) -> Array2<f64> {
        let n_targets = self.target_names.len();
        Array2::from_shape_fn((self.results.len(), n_targets), |(i, t)| {
            if self.results[i].relevance[t] { 1.0 } else { 0.0 }
        })
    }

    fn check_input(&self, input: &Dataset) -> Result<()> {
        if input.n_instances() != self.results.len() {
            return Err(RaksorError::ShapeError {
                expected: format!("{} instances in {}", self.results.len(), input.name()),
                actual: format!("{}", input.n_instances()),
            });
        }
        input.require_targets(self.target_names.len())
    }

    /// New dataset with `input`'s features and the predicted scores as rank labels
    pub fn rank_dataset(&self, input: &Dataset) -> Result<Dataset> {
        self.check_input(input)?;
        input.with_labels(
            format!("{} (rank predictions)", input.name()),
            Labels::rank(self.score_matrix()),
        )
    }

    /// New dataset with `input`'s features and the predicted flags as relevance labels
    pub fn bipartition_dataset(&self, input: &Dataset) -> Result<Dataset> {
        self.check_input(input)?;
        input.with_labels(
            format!("{} (bipartition predictions)", input.name()),
            Labels::relevance(self.relevance_matrix()),
        )
    }
}

/// Applies ranking models to datasets and single feature vectors
#[derive(Debug, Clone, Default)]
pub struct PredictionManager {
    config: InferenceConfig,
}

impl PredictionManager {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Load a persisted model
    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<RankingModel> {
        load_model(path)
    }

    /// Predict every instance of `dataset`; fails with `SchemaMismatch` when the
    /// dataset's features or target count differ from the model's
    pub fn predict(&self, model: &RankingModel, dataset: &Dataset) -> Result<PredictionSet> {
        model.check_dataset(dataset)?;

        let parallel = self.config.parallel;
        let scores = model.regressor().predict_scores(dataset.features(), parallel)?;
        let relevance = model.classifier().predict_scores(dataset.features(), parallel)?;
        let threshold = self.config.classification_threshold;

        let build = |i: usize| {
            PredictionResult::from_scores(
                scores.row(i).to_vec(),
                &relevance.row(i).to_vec(),
                threshold,
            )
        };
        let results: Vec<PredictionResult> = if parallel {
            (0..dataset.n_instances()).into_par_iter().map(build).collect()
        } else {
            (0..dataset.n_instances()).map(build).collect()
        };

        tracing::info!(
            dataset = %dataset.name(),
            n_instances = results.len(),
            n_targets = model.n_targets(),
            "Predicted rankings"
        );

        Ok(PredictionSet {
            target_names: model.target_names().to_vec(),
            results,
        })
    }

    /// Read `input_path`, predict it, and write the rank and bipartition
    /// predictions as ARFF files
    pub fn predict_to_files(
        &self,
        model: &RankingModel,
        input_path: impl AsRef<Path>,
        rank_out: impl AsRef<Path>,
        bipartition_out: impl AsRef<Path>,
    ) -> Result<PredictionSet> {
        let input = read_dataset(input_path, model.n_targets(), LabelKind::Rank)?;
        let predictions = self.predict(model, &input)?;

        write_dataset(&predictions.rank_dataset(&input)?, rank_out.as_ref())?;
        write_dataset(&predictions.bipartition_dataset(&input)?, bipartition_out.as_ref())?;

        tracing::info!(
            rank = %rank_out.as_ref().display(),
            bipartition = %bipartition_out.as_ref().display(),
            "Wrote prediction files"
        );
        Ok(predictions)
    }

    /// Predict one bare feature vector
    pub fn rank_single(&self, model: &RankingModel, features: &[f64]) -> Result<PredictionResult> {
        model.check_features(features, "feature vector")?;
        let scores = model.regressor().predict_row(features)?;
        let relevance = model.classifier().predict_row(features)?;
        Ok(PredictionResult::from_scores(
            scores,
            &relevance,
            self.config.classification_threshold,
        ))
    }

    /// Profile one ontology, rank the reasoners for it, and write its ranking
    /// table to `output_dir`
    pub fn rank_ontology(
        &self,
        model: &RankingModel,
        profiler: &dyn FeatureProfiler,
        ontology: &Path,
        all_features: bool,
        output_dir: &Path,
    ) -> Result<PredictionResult> {
        let expected = model.schema().feature_names();
        let provided = profiler.feature_names();
        if provided.len() != expected.len() || provided.iter().zip(expected.iter()).any(|(a, b)| a != b) {
            return Err(RaksorError::schema_mismatch(
                "feature profiler",
                format!("features [{}]", expected.join(", ")),
                format!("[{}]", provided.join(", ")),
            ));
        }

        let features = profiler.compute_feature_vector(ontology, all_features)?;
        let artifact = ontology.display().to_string();
        model.check_features(&features, &artifact)?;
        let result = self.rank_single(model, &features)?;

        let stem = ontology
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ontology".to_string());
        let table = output_dir.join(format!("{}_ranking.csv", stem));
        write_ranking_table(model.target_names(), &result, &table)?;

        if let Some(best) = result.top_target() {
            tracing::info!(
                ontology = %artifact,
                best = %model.target_names()[best],
                score = result.scores[best],
                "Ranked reasoners"
            );
        }
        Ok(result)
    }
}

/// Write one ranking as a CSV table (`position, reasoner, score, relevant`), best first
pub fn write_ranking_table(target_names: &[String], result: &PredictionResult, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let positions: Vec<u32> = (1..=result.rank.len() as u32).collect();
    let reasoners: Vec<String> = result
        .rank
        .iter()
        .map(|&t| {
            target_names
                .get(t)
                .cloned()
                .unwrap_or_else(|| format!("target_{}", t))
        })
        .collect();
    let scores: Vec<f64> = result.rank.iter().map(|&t| result.scores[t]).collect();
    let relevant: Vec<bool> = result.rank.iter().map(|&t| result.relevance[t]).collect();

    let mut df = DataFrame::new(vec![
        Column::new("position".into(), positions),
        Column::new("reasoner".into(), reasoners),
        Column::new("score".into(), scores),
        Column::new("relevant".into(), relevant),
    ])?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(path.to_path_buf())
}
