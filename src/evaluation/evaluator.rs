//! Ranking evaluation of predicted datasets against ground truth

use super::metrics::{bipartition_scores, mean, ranking_scores, std_dev, Confusion};
use super::report::{EvaluationMode, EvaluationReport};
use crate::dataset::{Dataset, LabelKind};
use crate::error::{RaksorError, Result};
use std::path::{Path, PathBuf};

pub const SPEARMAN_RHO: &str = "spearman_rho";
pub const KENDALL_TAU: &str = "kendall_tau";
pub const TOP1_HIT: &str = "top1_hit";
pub const MEAN_SPEARMAN_RHO: &str = "mean_spearman_rho";
pub const STD_SPEARMAN_RHO: &str = "std_spearman_rho";
pub const MEAN_KENDALL_TAU: &str = "mean_kendall_tau";
pub const TOP1_HIT_RATE: &str = "top1_hit_rate";

pub const HAMMING_ACCURACY: &str = "hamming_accuracy";
pub const EXACT_MATCH: &str = "exact_match";
pub const MEAN_HAMMING_ACCURACY: &str = "mean_hamming_accuracy";
pub const SUBSET_ACCURACY: &str = "subset_accuracy";
pub const MICRO_PRECISION: &str = "micro_precision";
pub const MICRO_RECALL: &str = "micro_recall";
pub const MICRO_F1: &str = "micro_f1";
pub const MACRO_F1: &str = "macro_f1";

/// Positional preconditions shared by both modes
fn check_alignment(truth: &Dataset, predicted: &Dataset, n_targets: usize) -> Result<()> {
    let alignment = |reason: String| RaksorError::Alignment {
        truth: truth.name().to_string(),
        predicted: predicted.name().to_string(),
        reason,
    };

    if truth.n_instances() != predicted.n_instances() {
        return Err(alignment(format!(
            "expected {} predicted instances, found {}",
            truth.n_instances(),
            predicted.n_instances()
        )));
    }
    for (side, ds) in [("ground truth", truth), ("prediction", predicted)] {
        if ds.n_targets() != n_targets {
            return Err(alignment(format!(
                "expected N={} targets in {}, found {}",
                n_targets,
                side,
                ds.n_targets()
            )));
        }
    }
    truth.require_non_empty()
}

/// Compute a report without writing it anywhere.
///
/// Instances are matched by position; both datasets must carry labels of the
/// kind the mode needs (rank scores or relevance flags).
pub fn evaluate(
    truth: &Dataset,
    predicted: &Dataset,
    n_targets: usize,
    algorithm: &str,
    mode: EvaluationMode,
) -> Result<EvaluationReport> {
    check_alignment(truth, predicted, n_targets)?;
    match mode {
        EvaluationMode::Rank => evaluate_rank(truth, predicted, algorithm),
        EvaluationMode::Bipartition => evaluate_bipartition(truth, predicted, n_targets, algorithm),
    }
}

fn evaluate_rank(truth: &Dataset, predicted: &Dataset, algorithm: &str) -> Result<EvaluationReport> {
    let truth_labels = truth.require_labels(LabelKind::Rank)?;
    let predicted_labels = predicted.require_labels(LabelKind::Rank)?;

    let mut report = EvaluationReport::new(algorithm, EvaluationMode::Rank);
    let mut rhos = Vec::with_capacity(truth.n_instances());
    let mut taus = Vec::with_capacity(truth.n_instances());
    let mut hits = 0usize;

    for i in 0..truth.n_instances() {
        let scores = ranking_scores(
            &truth_labels.row(i).to_vec(),
            &predicted_labels.row(i).to_vec(),
        );
        report.push_instance(i, SPEARMAN_RHO, scores.spearman);
        report.push_instance(i, KENDALL_TAU, scores.kendall_tau);
        report.push_instance(i, TOP1_HIT, if scores.top1_hit { 1.0 } else { 0.0 });
        rhos.push(scores.spearman);
        taus.push(scores.kendall_tau);
        hits += scores.top1_hit as usize;
    }

    report.push_aggregate(MEAN_SPEARMAN_RHO, mean(&rhos));
    report.push_aggregate(STD_SPEARMAN_RHO, std_dev(&rhos));
    report.push_aggregate(MEAN_KENDALL_TAU, mean(&taus));
    report.push_aggregate(TOP1_HIT_RATE, hits as f64 / truth.n_instances() as f64);
    Ok(report)
}

fn evaluate_bipartition(
    truth: &Dataset,
    predicted: &Dataset,
    n_targets: usize,
    algorithm: &str,
) -> Result<EvaluationReport> {
    let truth_labels = truth.require_labels(LabelKind::Relevance)?;
    let predicted_labels = predicted.require_labels(LabelKind::Relevance)?;

    let mut report = EvaluationReport::new(algorithm, EvaluationMode::Bipartition);
    let mut accuracies = Vec::with_capacity(truth.n_instances());
    let mut exact = 0usize;
    let mut pooled = Confusion::default();
    let mut per_target = vec![Confusion::default(); n_targets];

    for i in 0..truth.n_instances() {
        let t: Vec<bool> = truth_labels.row(i).iter().map(|&v| v >= 0.5).collect();
        let p: Vec<bool> = predicted_labels.row(i).iter().map(|&v| v >= 0.5).collect();
        for (target, counts) in per_target.iter_mut().enumerate() {
            counts.record(t[target], p[target]);
        }

        let scores = bipartition_scores(&t, &p);
        report.push_instance(i, HAMMING_ACCURACY, scores.hamming_accuracy);
        report.push_instance(i, EXACT_MATCH, if scores.exact_match { 1.0 } else { 0.0 });
        accuracies.push(scores.hamming_accuracy);
        exact += scores.exact_match as usize;
        pooled.merge(&scores.confusion);
    }

    let macro_f1 = mean(&per_target.iter().map(Confusion::f1).collect::<Vec<_>>());

    report.push_aggregate(MEAN_HAMMING_ACCURACY, mean(&accuracies));
    report.push_aggregate(SUBSET_ACCURACY, exact as f64 / truth.n_instances() as f64);
    report.push_aggregate(MICRO_PRECISION, pooled.precision());
    report.push_aggregate(MICRO_RECALL, pooled.recall());
    report.push_aggregate(MICRO_F1, pooled.f1());
    report.push_aggregate(MACRO_F1, macro_f1);
    Ok(report)
}

/// Evaluates predictions and appends every report to one CSV artifact
#[derive(Debug, Clone)]
pub struct RankingEvaluation {
    report_path: PathBuf,
    n_targets: usize,
}

impl RankingEvaluation {
    pub fn new(report_path: impl AsRef<Path>, n_targets: usize) -> Self {
        Self {
            report_path: report_path.as_ref().to_path_buf(),
            n_targets,
        }
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Ranking-mode evaluation, appended to the report under `algorithm`
    pub fn evaluate_ranking(&self, truth: &Dataset, predicted: &Dataset, algorithm: &str) -> Result<EvaluationReport> {
        self.run(truth, predicted, algorithm, EvaluationMode::Rank)
    }

    /// Bipartition-mode evaluation, appended to the report under `algorithm`
    pub fn evaluate_bipartition(&self, truth: &Dataset, predicted: &Dataset, algorithm: &str) -> Result<EvaluationReport> {
        self.run(truth, predicted, algorithm, EvaluationMode::Bipartition)
    }

    fn run(
        &self,
        truth: &Dataset,
        predicted: &Dataset,
        algorithm: &str,
        mode: EvaluationMode,
    ) -> Result<EvaluationReport> {
        let report = evaluate(truth, predicted, self.n_targets, algorithm, mode)?;
        report.append_to_csv(&self.report_path)?;

        match mode {
            EvaluationMode::Rank => tracing::info!(
                algorithm,
                mean_spearman_rho = report.aggregate(MEAN_SPEARMAN_RHO).unwrap_or_default(),
                top1_hit_rate = report.aggregate(TOP1_HIT_RATE).unwrap_or_default(),
                report = %self.report_path.display(),
                "Ranking evaluation"
            ),
            EvaluationMode::Bipartition => tracing::info!(
                algorithm,
                hamming_accuracy = report.aggregate(MEAN_HAMMING_ACCURACY).unwrap_or_default(),
                micro_f1 = report.aggregate(MICRO_F1).unwrap_or_default(),
                report = %self.report_path.display(),
                "Bipartition evaluation"
            ),
        }
        Ok(report)
    }
}
