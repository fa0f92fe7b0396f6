//! Per-chunk user feedback as an exponential moving average

use std::collections::HashMap;

/// Score of a chunk nobody rated yet
pub const DEFAULT_FEEDBACK: f32 = 0.5;

/// Feedback scores keyed by chunk id
///
/// Scores never decay and are shared by every caller. Callers serialise
/// updates by holding the store behind a mutex.
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    scores: HashMap<String, f32>,
    alpha: f32,
}

impl FeedbackStore {
    /// `alpha` is the weight of a newly observed score
    pub fn new(alpha: f32) -> Self {
        Self {
            scores: HashMap::new(),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Current score of a chunk, 0.5 when unrated
    pub fn get(&self, chunk_id: &str) -> f32 {
        self.scores
            .get(chunk_id)
            .copied()
            .unwrap_or(DEFAULT_FEEDBACK)
    }

    /// Fold an observed score into the average and return the new value.
    ///
    /// Observed scores are clamped to [0, 1]; non-finite ones are ignored.
    pub fn update(&mut self, chunk_id: &str, observed: f32) -> Option<f32> {
        if !observed.is_finite() {
            tracing::warn!(
                "Ignoring non-finite feedback {} for chunk {}",
                observed,
                chunk_id
            );
            return None;
        }

        let observed = observed.clamp(0.0, 1.0);
        let previous = self.get(chunk_id);
        let updated = previous * (1.0 - self.alpha) + observed * self.alpha;
        self.scores.insert(chunk_id.to_string(), updated);

        tracing::debug!(
            "Feedback for {}: {:.3} -> {:.3}",
            chunk_id,
            previous,
            updated
        );
        Some(updated)
    }

    /// Number of rated chunks
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new(0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_score() {
        let store = FeedbackStore::default();
        assert_eq!(store.get("unknown"), 0.5);
        assert!(store.is_empty());
    }

    #[test]
    fn test_moving_average() {
        let mut store = FeedbackStore::default();
        // 0.5 * 0.7 + 1.0 * 0.3
        let first = store.update("c1", 1.0).unwrap();
        assert!((first - 0.65).abs() < 1e-6);
        // 0.65 * 0.7 + 1.0 * 0.3
        let second = store.update("c1", 1.0).unwrap();
        assert!((second - 0.755).abs() < 1e-6);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_observed_clamped() {
        let mut store = FeedbackStore::default();
        let updated = store.update("c1", 7.0).unwrap();
        assert!((updated - 0.65).abs() < 1e-6);
        let updated = store.update("c2", -3.0).unwrap();
        assert!((updated - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_ignored() {
        let mut store = FeedbackStore::default();
        assert!(store.update("c1", f32::NAN).is_none());
        assert!(store.update("c1", f32::INFINITY).is_none());
        assert_eq!(store.get("c1"), 0.5);
        assert!(store.is_empty());
    }
}
