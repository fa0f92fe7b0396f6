//! Scored candidates and caller-facing results

use crate::chunking::{Chunk, SectionType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A chunk under consideration for one query, with every score it collected
///
/// Each reranking stage writes only its own field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk: Chunk,
    /// Inner product with the query vector, clamped to >= 0
    pub dense_score: f32,
    /// BM25 score normalised by the best BM25 score of the query
    pub bm25_score: f32,
    /// Weighted fusion of the two retrieval signals
    pub combined_score: f32,
    pub relevance_score: f32,
    pub legal_domain_score: f32,
    pub multi_criteria_score: f32,
    pub ensemble_score: f32,
    pub feedback_score: f32,
    pub final_score: f32,
}

impl RetrievalCandidate {
    pub fn new(chunk: Chunk, dense_score: f32, bm25_score: f32, combined_score: f32) -> Self {
        Self {
            chunk,
            dense_score,
            bm25_score,
            combined_score,
            relevance_score: 0.0,
            legal_domain_score: 0.0,
            multi_criteria_score: 0.0,
            ensemble_score: 0.0,
            feedback_score: 0.0,
            final_score: 0.0,
        }
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk.id
    }

    /// Fusion order: combined score descending, then chunk id
    pub fn cmp_combined(&self, other: &Self) -> Ordering {
        other
            .combined_score
            .total_cmp(&self.combined_score)
            .then_with(|| self.chunk.id.cmp(&other.chunk.id))
    }

    /// Result order: final descending, combined descending, then chunk id
    pub fn cmp_final(&self, other: &Self) -> Ordering {
        other
            .final_score
            .total_cmp(&self.final_score)
            .then_with(|| other.combined_score.total_cmp(&self.combined_score))
            .then_with(|| self.chunk.id.cmp(&other.chunk.id))
    }
}

/// A passage returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub chunk_id: String,
    pub document_id: String,
    pub section_type: SectionType,
    pub text: String,
    pub final_score: f32,
}

impl From<&RetrievalCandidate> for RankedPassage {
    fn from(candidate: &RetrievalCandidate) -> Self {
        Self {
            chunk_id: candidate.chunk.id.clone(),
            document_id: candidate.chunk.source_document_id.clone(),
            section_type: candidate.chunk.section_type,
            text: candidate.chunk.text.clone(),
            final_score: candidate.final_score,
        }
    }
}

impl RankedPassage {
    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &self.text[..idx]),
            None => self.text.clone(),
        }
    }
}
