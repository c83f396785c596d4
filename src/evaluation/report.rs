//! Evaluation reports and the CSV report artifact

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Which side of the model is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Predicted rank vs. rank derived from true scores
    Rank,
    /// Predicted relevance flags vs. true relevance labels
    Bipartition,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationMode::Rank => write!(f, "rank"),
            EvaluationMode::Bipartition => write!(f, "bipartition"),
        }
    }
}

/// Instance index, or the whole dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Instance(usize),
    Aggregate,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Instance(i) => write!(f, "{}", i),
            Scope::Aggregate => write!(f, "aggregate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub scope: Scope,
    pub value: f64,
}

/// Metric values of one evaluation call, tagged with the algorithm label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    algorithm: String,
    mode: EvaluationMode,
    rows: Vec<MetricRow>,
}

impl EvaluationReport {
    pub fn new(algorithm: impl Into<String>, mode: EvaluationMode) -> Self {
        Self {
            algorithm: algorithm.into(),
            mode,
            rows: Vec::new(),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn push_instance(&mut self, instance: usize, metric: &str, value: f64) {
        self.rows.push(MetricRow {
            metric: metric.to_string(),
            scope: Scope::Instance(instance),
            value,
        });
    }

    pub fn push_aggregate(&mut self, metric: &str, value: f64) {
        self.rows.push(MetricRow {
            metric: metric.to_string(),
            scope: Scope::Aggregate,
            value,
        });
    }

    /// Aggregate value of `metric`, if recorded
    pub fn aggregate(&self, metric: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.scope == Scope::Aggregate && r.metric == metric)
            .map(|r| r.value)
    }

    /// Per-instance values of `metric`, in instance order
    pub fn instance_values(&self, metric: &str) -> Vec<f64> {
        let mut values: Vec<(usize, f64)> = self
            .rows
            .iter()
            .filter_map(|r| match r.scope {
                Scope::Instance(i) if r.metric == metric => Some((i, r.value)),
                _ => None,
            })
            .collect();
        values.sort_by_key(|(i, _)| *i);
        values.into_iter().map(|(_, v)| v).collect()
    }

    /// Report rows as a `algorithm, mode, metric, scope, value` frame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let n = self.rows.len();
        let algorithm = vec![self.algorithm.clone(); n];
        let mode = vec![self.mode.to_string(); n];
        let metric: Vec<String> = self.rows.iter().map(|r| r.metric.clone()).collect();
        let scope: Vec<String> = self.rows.iter().map(|r| r.scope.to_string()).collect();
        let value: Vec<f64> = self.rows.iter().map(|r| r.value).collect();

        Ok(DataFrame::new(vec![
            Column::new("algorithm".into(), algorithm),
            Column::new("mode".into(), mode),
            Column::new("metric".into(), metric),
            Column::new("scope".into(), scope),
            Column::new("value".into(), value),
        ])?)
    }

    /// Append this report's rows to the CSV at `path`.
    ///
    /// The header is written only when the file is new or empty; earlier rows
    /// are never touched.
    pub fn append_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut df = self.to_dataframe()?;
        CsvWriter::new(&mut file)
            .include_header(needs_header)
            .finish(&mut df)?;

        tracing::debug!(
            path = %path.display(),
            algorithm = %self.algorithm,
            mode = %self.mode,
            rows = self.rows.len(),
            "Appended evaluation rows"
        );
        Ok(())
    }
}
