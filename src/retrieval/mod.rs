//! Hybrid retrieval and reranking
//!
//! Dense and keyword search run concurrently over one knowledge base snapshot,
//! their scores are fused with fixed weights, and the best candidates go
//! through the reranking pipeline and the feedback blend.

mod candidate;
mod deduplication;
mod expansion;
mod fusion;
mod hybrid;

pub use candidate::{RankedPassage, RetrievalCandidate};
pub use deduplication::deduplicate_candidates;
pub use expansion::generate_expanded_query;
pub use fusion::{weighted_fusion, FusedScore, FusionConfig, FusionError};
pub use hybrid::RetrievalOrchestrator;

use crate::document::DocumentType;
use crate::knowledge::KnowledgeBaseStats;
use crate::rerank::PipelineMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Knowledge base has not been built")]
    NotBuilt,
}

/// Per-query options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub mode: PipelineMode,
    /// Documents of this type get full doc-type weight
    pub document_type: Option<DocumentType>,
    /// Search with the expanded query
    pub expand: bool,
    /// Overrides the configured number of results
    pub top_n: Option<usize>,
}

fn hint_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

impl QueryContext {
    /// Read string hints: `fast`, `mode`, `document_type`, `expand`, `top_n`
    ///
    /// Unknown keys and unparsable values are ignored.
    pub fn from_hints(hints: &HashMap<String, String>) -> Self {
        let mut context = Self::default();

        for (key, value) in hints {
            match key.as_str() {
                "fast" if hint_enabled(value) => context.mode = PipelineMode::Fast,
                "mode" if value.trim().eq_ignore_ascii_case("fast") => {
                    context.mode = PipelineMode::Fast
                }
                "document_type" => match value.parse() {
                    Ok(doc_type) => context.document_type = Some(doc_type),
                    Err(e) => tracing::warn!("Ignoring document_type hint: {}", e),
                },
                "expand" => context.expand = hint_enabled(value),
                "top_n" => match value.trim().parse::<usize>() {
                    Ok(n) if n > 0 => context.top_n = Some(n),
                    _ => tracing::warn!("Ignoring top_n hint: {}", value),
                },
                _ => {}
            }
        }

        context
    }

    pub fn fast() -> Self {
        Self {
            mode: PipelineMode::Fast,
            ..Self::default()
        }
    }
}

/// Signals that were unavailable for a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedSignals {
    /// No dense results: embedder disabled, failed or timed out
    pub dense: bool,
    /// Neutral relevance scores were used
    pub relevance: bool,
}

impl DegradedSignals {
    pub fn any(&self) -> bool {
        self.dense || self.relevance
    }
}

/// Full outcome of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalReport {
    /// Top results, best first
    pub passages: Vec<RankedPassage>,
    /// Every reranked candidate with all its scores, best first
    pub candidates: Vec<RetrievalCandidate>,
    pub degraded: DegradedSignals,
    /// Query used for retrieval when expansion was on
    pub expanded_query: Option<String>,
    pub mode: PipelineMode,
}

impl RetrievalReport {
    pub(crate) fn empty(mode: PipelineMode) -> Self {
        Self {
            passages: Vec::new(),
            candidates: Vec::new(),
            degraded: DegradedSignals::default(),
            expanded_query: None,
            mode,
        }
    }
}

/// Orchestrator counters and knowledge base figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub queries_served: u64,
    pub memory_entries: usize,
    pub feedback_entries: usize,
    pub relevance_scorer: String,
    pub last_query: Option<String>,
    /// `None` before the first build
    pub knowledge_base: Option<KnowledgeBaseStats>,
}
