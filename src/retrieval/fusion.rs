//! Weighted score fusion of dense and sparse results

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be non-negative and not both zero")]
    InvalidWeights,
}

/// Configuration for fusion
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Weight of the dense score
    pub dense_weight: f32,

    /// Weight of the normalised BM25 score
    pub sparse_weight: f32,
}

impl FusionConfig {
    pub fn new(dense_weight: f32, sparse_weight: f32) -> Result<Self, FusionError> {
        let valid = |w: f32| w.is_finite() && w >= 0.0;
        if !valid(dense_weight) || !valid(sparse_weight) || dense_weight + sparse_weight <= 0.0 {
            return Err(FusionError::InvalidWeights);
        }

        Ok(Self {
            dense_weight,
            sparse_weight,
        })
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            dense_weight: 0.6,
            sparse_weight: 0.4,
        }
    }
}

/// Fused scores of one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub offset: usize,
    /// Clamped dense score, 0 when the chunk was not a dense hit
    pub dense: f32,
    /// Max-normalised BM25 score, 0 when the chunk was not a sparse hit
    pub bm25: f32,
    pub combined: f32,
}

/// Fuse two scored lists keyed by chunk offset
///
/// Dense scores are clamped to >= 0 and BM25 scores divided by the best BM25
/// score, then `combined = dense_weight * dense + sparse_weight * bm25`. A chunk
/// found by one signal only gets that signal's contribution.
///
/// # Returns
/// One entry per distinct offset, sorted by combined score descending, then offset
pub fn weighted_fusion(
    dense_results: &[(usize, f32)],
    sparse_results: &[(usize, f32)],
    config: &FusionConfig,
) -> Vec<FusedScore> {
    let mut fused: HashMap<usize, FusedScore> = HashMap::new();

    for (offset, score) in dense_results {
        let dense = if score.is_finite() { score.max(0.0) } else { 0.0 };
        let entry = fused.entry(*offset).or_insert_with(|| empty(*offset));
        entry.dense = entry.dense.max(dense);
    }

    let max_bm25 = sparse_results
        .iter()
        .map(|(_, s)| *s)
        .filter(|s| s.is_finite())
        .fold(0.0f32, f32::max);

    for (offset, score) in sparse_results {
        let bm25 = if max_bm25 > 0.0 && score.is_finite() {
            (score / max_bm25).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let entry = fused.entry(*offset).or_insert_with(|| empty(*offset));
        entry.bm25 = entry.bm25.max(bm25);
    }

    let mut results: Vec<FusedScore> = fused
        .into_values()
        .map(|mut f| {
            f.combined = config.dense_weight * f.dense + config.sparse_weight * f.bm25;
            f
        })
        .collect();

    results.sort_by(|a, b| {
        b.combined
            .total_cmp(&a.combined)
            .then_with(|| a.offset.cmp(&b.offset))
    });

    results
}

fn empty(offset: usize) -> FusedScore {
    FusedScore {
        offset,
        dense: 0.0,
        bm25: 0.0,
        combined: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(fused: &[FusedScore], offset: usize) -> &FusedScore {
        fused.iter().find(|f| f.offset == offset).unwrap()
    }

    #[test]
    fn test_both_signals() {
        let dense = vec![(1, 0.8)];
        let sparse = vec![(1, 5.0), (2, 2.5)];

        let fused = weighted_fusion(&dense, &sparse, &FusionConfig::default());

        let one = find(&fused, 1);
        assert!((one.bm25 - 1.0).abs() < 1e-6);
        assert!((one.combined - (0.6 * 0.8 + 0.4 * 1.0)).abs() < 1e-6);
        assert_eq!(fused[0].offset, 1);
    }

    #[test]
    fn test_single_signal_contribution() {
        let dense = vec![(1, 0.5)];
        let sparse = vec![(2, 3.0)];

        let fused = weighted_fusion(&dense, &sparse, &FusionConfig::default());

        assert!((find(&fused, 1).combined - 0.3).abs() < 1e-6);
        assert!((find(&fused, 2).combined - 0.4).abs() < 1e-6);
        assert_eq!(fused[0].offset, 2);
    }

    #[test]
    fn test_negative_dense_clamped() {
        let fused = weighted_fusion(&[(3, -0.4)], &[], &FusionConfig::default());
        assert_eq!(fused[0].dense, 0.0);
        assert_eq!(fused[0].combined, 0.0);
    }

    #[test]
    fn test_ties_ordered_by_offset() {
        let fused = weighted_fusion(&[(9, 0.5), (4, 0.5)], &[], &FusionConfig::default());
        assert_eq!(fused[0].offset, 4);
        assert_eq!(fused[1].offset, 9);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(weighted_fusion(&[], &[], &FusionConfig::default()).is_empty());
    }

    #[test]
    fn test_invalid_weights() {
        assert!(FusionConfig::new(-0.1, 0.4).is_err());
        assert!(FusionConfig::new(0.0, 0.0).is_err());
        assert!(FusionConfig::new(1.0, 0.0).is_ok());
    }
}
