//! Ranking and bipartition quality metrics

use crate::ranking::{positions_from_order, rank_order};
use serde::{Deserialize, Serialize};

/// Per-instance ranking quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingScores {
    /// Spearman correlation of the two rank position vectors
    pub spearman: f64,
    /// Kendall tau between the two total orders
    pub kendall_tau: f64,
    /// Predicted best target equals the true best target
    pub top1_hit: bool,
}

/// Compare the ranks derived from true and predicted scores of one instance
pub fn ranking_scores(truth: &[f64], predicted: &[f64]) -> RankingScores {
    let truth_order = rank_order(truth);
    let predicted_order = rank_order(predicted);
    let truth_pos = positions_from_order(&truth_order);
    let predicted_pos = positions_from_order(&predicted_order);

    RankingScores {
        spearman: spearman_rho(&truth_pos, &predicted_pos),
        kendall_tau: kendall_tau(&truth_pos, &predicted_pos),
        top1_hit: truth_order.first() == predicted_order.first(),
    }
}

/// Spearman's rho over two permutations of `1..=N` (1.0 when N < 2)
pub fn spearman_rho(a: &[usize], b: &[usize]) -> f64 {
    let n = a.len();
    if n < 2 {
        return 1.0;
    }
    let d2: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
        .sum();
    let n = n as f64;
    1.0 - 6.0 * d2 / (n * (n * n - 1.0))
}

/// Kendall's tau over two permutations of `1..=N` (1.0 when N < 2)
pub fn kendall_tau(a: &[usize], b: &[usize]) -> f64 {
    let n = a.len();
    if n < 2 {
        return 1.0;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let da = a[i] as i64 - a[j] as i64;
            let db = b[i] as i64 - b[j] as i64;
            if da * db > 0 {
                concordant += 1;
            } else if da * db < 0 {
                discordant += 1;
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    (concordant - discordant) as f64 / pairs
}

/// Binary confusion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl Confusion {
    pub fn record(&mut self, truth: bool, predicted: bool) {
        match (truth, predicted) {
            (true, true) => self.tp += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn merge(&mut self, other: &Confusion) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
        self.tn += other.tn;
    }

    /// tp / (tp + fp); with nothing predicted positive, 1.0 only if nothing was missed
    pub fn precision(&self) -> f64 {
        ratio_or(self.tp, self.tp + self.fp, self.fn_ == 0)
    }

    /// tp / (tp + fn); with nothing truly positive, 1.0 only if nothing was falsely flagged
    pub fn recall(&self) -> f64 {
        ratio_or(self.tp, self.tp + self.fn_, self.fp == 0)
    }

    /// 2tp / (2tp + fp + fn); 1.0 when there is nothing to get wrong
    pub fn f1(&self) -> f64 {
        ratio_or(2 * self.tp, 2 * self.tp + self.fp + self.fn_, true)
    }
}

fn ratio_or(num: usize, den: usize, perfect: bool) -> f64 {
    if den == 0 {
        if perfect { 1.0 } else { 0.0 }
    } else {
        num as f64 / den as f64
    }
}

/// Per-instance bipartition quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BipartitionScores {
    /// Fraction of target flags that match
    pub hamming_accuracy: f64,
    /// Every flag matches
    pub exact_match: bool,
    pub confusion: Confusion,
}

/// Compare the true and predicted relevance flags of one instance
pub fn bipartition_scores(truth: &[bool], predicted: &[bool]) -> BipartitionScores {
    let mut confusion = Confusion::default();
    for (&t, &p) in truth.iter().zip(predicted.iter()) {
        confusion.record(t, p);
    }
    let n = truth.len();
    let matches = confusion.tp + confusion.tn;
    BipartitionScores {
        hamming_accuracy: if n == 0 { 1.0 } else { matches as f64 / n as f64 },
        exact_match: matches == n,
        confusion,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_ranking_is_perfect() {
        let s = ranking_scores(&[0.1, 0.7, 0.4, 0.9], &[0.1, 0.7, 0.4, 0.9]);
        assert_eq!(s.spearman, 1.0);
        assert_eq!(s.kendall_tau, 1.0);
        assert!(s.top1_hit);
    }

    #[test]
    fn test_reversed_ranking() {
        let s = ranking_scores(&[0.4, 0.3, 0.2, 0.1], &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(s.spearman, -1.0);
        assert_eq!(s.kendall_tau, -1.0);
        assert!(!s.top1_hit);
    }

    #[test]
    fn test_single_target() {
        let s = ranking_scores(&[0.4], &[0.9]);
        assert_eq!(s.spearman, 1.0);
        assert_eq!(s.kendall_tau, 1.0);
        assert!(s.top1_hit);
    }

    #[test]
    fn test_ties_follow_index_rule() {
        // Truth has a tie between targets 0 and 1; lower index ranks first
        let s = ranking_scores(&[0.5, 0.5, 0.1], &[0.6, 0.5, 0.1]);
        assert_eq!(s.spearman, 1.0);
        assert!(s.top1_hit);
    }

    #[test]
    fn test_spearman_one_swap() {
        // positions differ by one swap of adjacent items among 3
        let rho = spearman_rho(&[1, 2, 3], &[2, 1, 3]);
        assert!((rho - 0.5).abs() < 1e-12);
        let tau = kendall_tau(&[1, 2, 3], &[2, 1, 3]);
        assert!((tau - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_bipartition_counts() {
        let s = bipartition_scores(&[true, false, true, false], &[true, true, false, false]);
        assert_eq!(s.hamming_accuracy, 0.5);
        assert!(!s.exact_match);
        assert_eq!(s.confusion, Confusion { tp: 1, fp: 1, fn_: 1, tn: 1 });
        assert_eq!(s.confusion.precision(), 0.5);
        assert_eq!(s.confusion.recall(), 0.5);
        assert_eq!(s.confusion.f1(), 0.5);
    }

    #[test]
    fn test_empty_denominators() {
        let all_negative = Confusion { tp: 0, fp: 0, fn_: 0, tn: 4 };
        assert_eq!(all_negative.precision(), 1.0);
        assert_eq!(all_negative.recall(), 1.0);
        assert_eq!(all_negative.f1(), 1.0);

        let missed = Confusion { tp: 0, fp: 0, fn_: 2, tn: 2 };
        assert_eq!(missed.precision(), 0.0);
        assert_eq!(missed.recall(), 0.0);

        let false_alarm = Confusion { tp: 0, fp: 3, fn_: 0, tn: 1 };
        assert_eq!(false_alarm.recall(), 0.0);
    }

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }
}
