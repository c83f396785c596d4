//! Ranking evaluation
//!
//! Scores predicted rankings and bipartitions against ground truth, per
//! instance and in aggregate, and accumulates labeled rows in a CSV report.

pub mod metrics;
mod evaluator;
mod report;

pub use evaluator::*;
pub use report::{EvaluationMode, EvaluationReport, MetricRow, Scope};
