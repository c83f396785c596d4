//! Ontology feature profiler interface
//!
//! Extracting a feature vector from an ontology document (parsing, structural
//! and logical metrics) happens outside this crate. Anything that implements
//! [`FeatureProfiler`] can feed [`PredictionManager::rank_ontology`].
//!
//! [`PredictionManager::rank_ontology`]: crate::inference::PredictionManager::rank_ontology

use crate::dataset::FeatureVector;
use crate::error::Result;
use std::path::Path;

/// Computes the numeric feature vector of one ontology
pub trait FeatureProfiler: Send + Sync {
    /// Feature vector of `ontology`, in [`feature_names`](Self::feature_names) order.
    ///
    /// With `all_features` unset a profiler may skip expensive metrics and
    /// fill them with defaults; the vector width never changes.
    fn compute_feature_vector(&self, ontology: &Path, all_features: bool) -> Result<FeatureVector>;

    /// Ordered feature names, matching the schema of the training datasets
    fn feature_names(&self) -> Vec<String>;
}
