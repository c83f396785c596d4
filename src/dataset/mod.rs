//! Tabular datasets of ontology feature vectors and reasoner labels
//!
//! A [`Dataset`] is an immutable table: one attribute [`Schema`], a feature
//! matrix with one row per instance, and an optional label block holding one
//! column per target (reasoner). Target columns are addressed by their index
//! `0..N-1`, which must line up across every dataset and model used together.

pub mod arff;

use crate::error::{RaksorError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single ontology's numeric feature vector
pub type FeatureVector = Vec<f64>;

/// Numeric attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// Continuous numeric value
    Numeric,
    /// Binary value restricted to {0, 1}
    Binary,
}

/// Named attribute of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeType,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeType::Numeric,
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeType::Binary,
        }
    }
}

/// Ordered feature attributes followed by the ordered target block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    relation: String,
    features: Vec<Attribute>,
    targets: Vec<Attribute>,
}

impl Schema {
    /// Create a schema, rejecting duplicate attribute names
    pub fn new(
        relation: impl Into<String>,
        features: Vec<Attribute>,
        targets: Vec<Attribute>,
    ) -> Result<Self> {
        let relation = relation.into();
        let mut seen = HashSet::new();
        for attr in features.iter().chain(targets.iter()) {
            if !seen.insert(attr.name.as_str()) {
                return Err(RaksorError::schema_mismatch(
                    &relation,
                    "unique attribute names",
                    format!("duplicate attribute '{}'", attr.name),
                ));
            }
        }
        Ok(Self {
            relation,
            features,
            targets,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn features(&self) -> &[Attribute] {
        &self.features
    }

    pub fn targets(&self) -> &[Attribute] {
        &self.targets
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|a| a.name.clone()).collect()
    }

    /// Same schema with the target block retyped for a label kind
    pub fn with_target_kind(&self, kind: LabelKind) -> Self {
        let attr_kind = match kind {
            LabelKind::Rank => AttributeType::Numeric,
            LabelKind::Relevance => AttributeType::Binary,
        };
        Self {
            relation: self.relation.clone(),
            features: self.features.clone(),
            targets: self
                .targets
                .iter()
                .map(|t| Attribute {
                    name: t.name.clone(),
                    kind: attr_kind,
                })
                .collect(),
        }
    }

    /// Check that `other` has the same feature names (in order) and target count.
    ///
    /// `artifact` names the side being checked in the error message.
    pub fn check_compatible(&self, other: &Schema, artifact: &str) -> Result<()> {
        if other.n_targets() != self.n_targets() {
            return Err(RaksorError::schema_mismatch(
                artifact,
                format!("N={} target columns", self.n_targets()),
                format!("N={}", other.n_targets()),
            ));
        }
        if other.n_features() != self.n_features() {
            return Err(RaksorError::schema_mismatch(
                artifact,
                format!("{} feature attributes", self.n_features()),
                format!("{}", other.n_features()),
            ));
        }
        for (idx, (mine, theirs)) in self.features.iter().zip(other.features.iter()).enumerate() {
            if mine.name != theirs.name {
                return Err(RaksorError::schema_mismatch(
                    artifact,
                    format!("feature #{} named '{}'", idx, mine.name),
                    format!("'{}'", theirs.name),
                ));
            }
        }
        let differing = self
            .targets
            .iter()
            .zip(other.targets.iter())
            .filter(|(a, b)| a.name != b.name)
            .count();
        if differing > 0 {
            tracing::debug!(artifact, differing, "Target names differ; matching targets by index");
        }
        Ok(())
    }
}

/// Kind of label carried by a dataset's target block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    /// Continuous performance score per target (MTR)
    Rank,
    /// Binary relevance flag per target (MLC)
    Relevance,
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelKind::Rank => write!(f, "rank"),
            LabelKind::Relevance => write!(f, "relevance"),
        }
    }
}

/// Label block: one row per instance, one column per target
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    kind: LabelKind,
    values: Array2<f64>,
}

impl Labels {
    pub fn rank(values: Array2<f64>) -> Self {
        Self {
            kind: LabelKind::Rank,
            values,
        }
    }

    pub fn relevance(values: Array2<f64>) -> Self {
        Self {
            kind: LabelKind::Relevance,
            values,
        }
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    pub fn column(&self, target: usize) -> ArrayView1<'_, f64> {
        self.values.column(target)
    }
}

/// Borrowed view of one row of a dataset
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    pub features: ArrayView1<'a, f64>,
    pub labels: Option<ArrayView1<'a, f64>>,
}

/// Immutable table of instances sharing one schema and one target count
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    schema: Schema,
    features: Array2<f64>,
    labels: Option<Labels>,
}

impl Dataset {
    /// Create a dataset, validating shapes and label values
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        features: Array2<f64>,
        labels: Option<Labels>,
    ) -> Result<Self> {
        let name = name.into();

        if features.ncols() != schema.n_features() {
            return Err(RaksorError::schema_mismatch(
                &name,
                format!("{} feature columns", schema.n_features()),
                format!("{}", features.ncols()),
            ));
        }
        if let Some((row, col)) = first_non_finite(&features) {
            return Err(RaksorError::DataError(format!(
                "{}: non-finite value for feature '{}' in instance {}",
                name,
                schema.features()[col].name,
                row
            )));
        }

        if let Some(labels) = &labels {
            let (rows, cols) = labels.values.dim();
            if cols != schema.n_targets() {
                return Err(RaksorError::schema_mismatch(
                    &name,
                    format!("N={} target columns", schema.n_targets()),
                    format!("{} label columns", cols),
                ));
            }
            if rows != features.nrows() {
                return Err(RaksorError::ShapeError {
                    expected: format!("{} label rows in {}", features.nrows(), name),
                    actual: format!("{}", rows),
                });
            }
            if let Some((row, col)) = first_non_finite(&labels.values) {
                return Err(RaksorError::DataError(format!(
                    "{}: non-finite label for target '{}' in instance {}",
                    name,
                    schema.targets()[col].name,
                    row
                )));
            }
            if labels.kind == LabelKind::Relevance {
                for ((row, col), &v) in labels.values.indexed_iter() {
                    if v != 0.0 && v != 1.0 {
                        return Err(RaksorError::DataError(format!(
                            "{}: relevance label for target '{}' in instance {} must be 0 or 1, got {}",
                            name,
                            schema.targets()[col].name,
                            row,
                            v
                        )));
                    }
                }
            }
        }

        Ok(Self {
            name,
            schema,
            features,
            labels,
        })
    }

    /// Dataset identity used in error messages (usually the source path)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> Option<&Labels> {
        self.labels.as_ref()
    }

    pub fn n_instances(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_targets(&self) -> usize {
        self.schema.n_targets()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    /// Fail with `EmptyDataset` when there are no instances
    pub fn require_non_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RaksorError::EmptyDataset(self.name.clone()));
        }
        Ok(())
    }

    /// Labels of the requested kind, or a data error naming this dataset
    pub fn require_labels(&self, kind: LabelKind) -> Result<&Labels> {
        match &self.labels {
            Some(labels) if labels.kind == kind => Ok(labels),
            Some(labels) => Err(RaksorError::DataError(format!(
                "{}: expected {} labels, found {} labels",
                self.name, kind, labels.kind
            ))),
            None => Err(RaksorError::DataError(format!(
                "{}: expected {} labels, dataset is unlabeled",
                self.name, kind
            ))),
        }
    }

    /// Fail with `SchemaMismatch` unless the dataset declares exactly `n_targets` targets
    pub fn require_targets(&self, n_targets: usize) -> Result<()> {
        if self.n_targets() != n_targets {
            return Err(RaksorError::schema_mismatch(
                &self.name,
                format!("N={} target columns", n_targets),
                format!("N={}", self.n_targets()),
            ));
        }
        Ok(())
    }

    pub fn instance(&self, i: usize) -> Instance<'_> {
        Instance {
            features: self.features.row(i),
            labels: self.labels.as_ref().map(|l| l.values.row(i)),
        }
    }

    pub fn instances(&self) -> impl Iterator<Item = Instance<'_>> + '_ {
        (0..self.n_instances()).map(move |i| self.instance(i))
    }

    /// New dataset holding the given rows, in the given order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            name: self.name.clone(),
            schema: self.schema.clone(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.as_ref().map(|l| Labels {
                kind: l.kind,
                values: l.values.select(Axis(0), indices),
            }),
        }
    }

    /// New dataset with the same features and a replacement label block
    pub fn with_labels(&self, name: impl Into<String>, labels: Labels) -> Result<Dataset> {
        let schema = self.schema.with_target_kind(labels.kind);
        Dataset::new(name, schema, self.features.clone(), Some(labels))
    }
}

fn first_non_finite(values: &Array2<f64>) -> Option<(usize, usize)> {
    values
        .indexed_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(idx, _)| idx)
}
