//! Per-target ensembles
//!
//! Both halves of a ranking model share one shape: N independent base
//! learners, one per target, plus an optional meta layer.
//! - [`TargetEnsemble`] with [`EnsembleTask::BinaryRelevance`] is the
//!   multi-label classifier (one binary classifier per target)
//! - [`TargetEnsemble`] with [`EnsembleTask::Regression`] is the multi-target
//!   regressor, optionally reconciled by [`MultiTargetStacking`]

mod stacking;
mod target_ensemble;

pub use stacking::MultiTargetStacking;
pub use target_ensemble::{
    DegenerateReason, DegenerateTarget, EnsembleBuilder, EnsembleTask, TargetEnsemble,
};

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Mix a base seed with indices (target, fold, ...) into an independent stream seed
pub fn derive_seed(seed: u64, parts: &[u64]) -> u64 {
    parts
        .iter()
        .fold(splitmix64(seed), |acc, &part| splitmix64(acc ^ splitmix64(part)))
}
