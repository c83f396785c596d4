//! Trained ranking model bundle

use crate::dataset::{Dataset, Schema};
use crate::ensemble::{DegenerateTarget, TargetEnsemble};
use crate::error::{RaksorError, Result};
use crate::training::LearnerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Training provenance stored alongside the ensembles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub n_mlc_instances: usize,
    pub n_mtr_instances: usize,
    pub regressor: LearnerKind,
    pub classifier: LearnerKind,
    pub stacked: bool,
    pub training_secs: f64,
    /// Targets that fell back to a constant predictor, per ensemble
    pub degenerate_regressors: Vec<DegenerateTarget>,
    pub degenerate_classifiers: Vec<DegenerateTarget>,
}

/// Schema snapshot plus the fitted regressor and classifier ensembles.
///
/// Built only by the training manager; read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingModel {
    schema: Schema,
    n_targets: usize,
    target_names: Vec<String>,
    regressor: TargetEnsemble,
    classifier: TargetEnsemble,
    metadata: ModelMetadata,
}

impl RankingModel {
    pub(crate) fn new(
        schema: Schema,
        regressor: TargetEnsemble,
        classifier: TargetEnsemble,
        metadata: ModelMetadata,
    ) -> Result<Self> {
        let n_targets = schema.n_targets();
        for (which, ensemble) in [("regressor", &regressor), ("classifier", &classifier)] {
            if ensemble.n_targets() != n_targets {
                return Err(RaksorError::schema_mismatch(
                    format!("{} ensemble", which),
                    format!("N={} members", n_targets),
                    format!("N={}", ensemble.n_targets()),
                ));
            }
            if ensemble.n_features() != schema.n_features() {
                return Err(RaksorError::schema_mismatch(
                    format!("{} ensemble", which),
                    format!("{} input features", schema.n_features()),
                    format!("{}", ensemble.n_features()),
                ));
            }
        }
        Ok(Self {
            target_names: schema.target_names(),
            schema,
            n_targets,
            regressor,
            classifier,
            metadata,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    /// Target (reasoner) names in index order
    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn regressor(&self) -> &TargetEnsemble {
        &self.regressor
    }

    pub fn classifier(&self) -> &TargetEnsemble {
        &self.classifier
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Fail with `SchemaMismatch` unless `dataset` has this model's feature
    /// names and target count
    pub fn check_dataset(&self, dataset: &Dataset) -> Result<()> {
        self.schema.check_compatible(dataset.schema(), dataset.name())
    }

    /// Fail with `SchemaMismatch` unless a bare feature vector has the model's width
    pub fn check_features(&self, features: &[f64], artifact: &str) -> Result<()> {
        if features.len() != self.schema.n_features() {
            return Err(RaksorError::schema_mismatch(
                artifact,
                format!("{} feature values", self.schema.n_features()),
                format!("{}", features.len()),
            ));
        }
        Ok(())
    }

    /// Internal consistency check run after deserialization
    pub(crate) fn validate(&self) -> Result<()> {
        let ok = self.n_targets == self.schema.n_targets()
            && self.target_names.len() == self.n_targets
            && self.regressor.n_targets() == self.n_targets
            && self.classifier.n_targets() == self.n_targets
            && self.regressor.n_features() == self.schema.n_features()
            && self.classifier.n_features() == self.schema.n_features();
        if !ok {
            return Err(RaksorError::ValidationError(format!(
                "model bundle is inconsistent: N={}, schema N={}, regressor N={}, classifier N={}",
                self.n_targets,
                self.schema.n_targets(),
                self.regressor.n_targets(),
                self.classifier.n_targets()
            )));
        }
        Ok(())
    }
}
