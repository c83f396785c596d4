//! Deterministic rank derivation over target scores
//!
//! Targets are ordered by descending score; equal scores keep the lower
//! target index first. NaN scores sort after every finite score.

use std::cmp::Ordering;

fn compare(scores: &[f64], a: usize, b: usize) -> Ordering {
    let (sa, sb) = (scores[a], scores[b]);
    let by_score = match (sa.is_nan(), sb.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => sb.total_cmp(&sa),
    };
    by_score.then(a.cmp(&b))
}

/// Target indices ordered best-first
pub fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare(scores, a, b));
    order
}

/// 1-based rank position of every target (`positions[t] == 1` for the best target)
pub fn rank_positions(scores: &[f64]) -> Vec<usize> {
    positions_from_order(&rank_order(scores))
}

/// Invert a best-first order into 1-based positions
pub fn positions_from_order(order: &[usize]) -> Vec<usize> {
    let mut positions = vec![0; order.len()];
    for (pos, &target) in order.iter().enumerate() {
        positions[target] = pos + 1;
    }
    positions
}

/// Index of the best target, if any
pub fn top_target(scores: &[f64]) -> Option<usize> {
    rank_order(scores).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_order() {
        assert_eq!(rank_order(&[0.2, 0.9, 0.5]), vec![1, 2, 0]);
        assert_eq!(rank_positions(&[0.2, 0.9, 0.5]), vec![3, 1, 2]);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        assert_eq!(rank_order(&[0.5, 0.7, 0.5, 0.7]), vec![1, 3, 0, 2]);
        assert_eq!(top_target(&[1.0, 1.0, 1.0]), Some(0));
    }

    #[test]
    fn test_nan_sorts_last() {
        assert_eq!(rank_order(&[f64::NAN, 0.1, 0.3]), vec![2, 1, 0]);
    }

    #[test]
    fn test_empty_scores() {
        assert!(rank_order(&[]).is_empty());
        assert_eq!(top_target(&[]), None);
    }
}
