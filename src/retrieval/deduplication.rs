//! Candidate deduplication by chunk ID

use crate::retrieval::RetrievalCandidate;
use std::collections::HashMap;

/// Deduplicate candidates by chunk id, keeping the highest combined score
///
/// The kept instance takes the position of the first occurrence.
pub fn deduplicate_candidates(candidates: Vec<RetrievalCandidate>) -> Vec<RetrievalCandidate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<RetrievalCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match positions.get(candidate.chunk_id()) {
            Some(&idx) => {
                if candidate.combined_score > unique[idx].combined_score {
                    unique[idx] = candidate;
                }
            }
            None => {
                positions.insert(candidate.chunk_id().to_string(), unique.len());
                unique.push(candidate);
            }
        }
    }

    unique
}
