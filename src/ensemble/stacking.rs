//! Multi-target stacking meta layer

use crate::error::{RaksorError, Result};
use crate::training::linear_models::RidgeRegression;
use ndarray::{concatenate, Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One ridge meta-regressor per target over `[base predictions of all targets | original features]`
///
/// The meta input for training is built from out-of-fold base predictions, so
/// a meta-regressor never sees a base prediction made on its own training row.
/// A target whose meta fit failed keeps its base prediction unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTargetStacking {
    meta: Vec<Option<RidgeRegression>>,
    n_targets: usize,
    n_features: usize,
}

impl MultiTargetStacking {
    /// Fit the meta layer.
    ///
    /// `base_oof` holds out-of-fold base predictions (n × N), `x` the original
    /// features (n × F) and `y` the rank labels (n × N).
    pub fn fit(
        base_oof: &Array2<f64>,
        x: &Array2<f64>,
        y: &Array2<f64>,
        alpha: f64,
        parallel: bool,
    ) -> Result<Self> {
        let n_targets = y.ncols();
        if base_oof.dim() != y.dim() || x.nrows() != y.nrows() {
            return Err(RaksorError::ShapeError {
                expected: format!("{} rows and {} base columns", y.nrows(), n_targets),
                actual: format!("base {:?}, features {:?}", base_oof.dim(), x.dim()),
            });
        }

        let meta_x = concatenate(Axis(1), &[base_oof.view(), x.view()])?;

        let fit_one = |target: usize| -> Option<RidgeRegression> {
            let y_t: Array1<f64> = y.column(target).to_owned();
            let mut ridge = RidgeRegression::new(alpha);
            match ridge.fit(&meta_x, &y_t) {
                Ok(_) => Some(ridge),
                Err(e) => {
                    tracing::warn!(target, error = %e, "Meta-regressor fit failed; keeping base prediction");
                    None
                }
            }
        };

        let meta = if parallel {
            (0..n_targets).into_par_iter().map(fit_one).collect()
        } else {
            (0..n_targets).map(fit_one).collect()
        };

        Ok(Self {
            meta,
            n_targets,
            n_features: x.ncols(),
        })
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    /// Number of targets with a fitted meta-regressor
    pub fn n_fitted(&self) -> usize {
        self.meta.iter().filter(|m| m.is_some()).count()
    }

    /// Reconcile one row of base predictions
    pub fn predict_row(&self, base: &[f64], features: &[f64]) -> Result<Vec<f64>> {
        if base.len() != self.n_targets || features.len() != self.n_features {
            return Err(RaksorError::ShapeError {
                expected: format!("{} base scores and {} features", self.n_targets, self.n_features),
                actual: format!("{} base scores and {} features", base.len(), features.len()),
            });
        }

        let input: Vec<f64> = base.iter().chain(features.iter()).copied().collect();
        self.meta
            .iter()
            .enumerate()
            .map(|(target, meta)| match meta {
                Some(ridge) => ridge.predict_row(&input),
                None => Ok(base[target]),
            })
            .collect()
    }
}
