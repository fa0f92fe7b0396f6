//! Knowledge base: chunks, dense and sparse indexes and entity records
//!
//! A knowledge base is immutable once built. [`KnowledgeBaseService`] owns the
//! current one and swaps in a rebuilt base atomically; queries keep whatever
//! snapshot they started with.

mod builder;
mod service;

pub use builder::KnowledgeBaseBuilder;
pub use service::KnowledgeBaseService;

use crate::chunking::Chunk;
use crate::embedding::{EmbeddingProvider, KeywordIndex, VectorIndex};
use crate::entities::KnowledgeRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Index that rejected a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Dense,
    Sparse,
}

/// A chunk missing from one index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildFailure {
    pub chunk_id: String,
    pub stage: BuildStage,
    pub reason: String,
}

/// Summary of one build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub dense_indexed: usize,
    pub sparse_indexed: usize,
    pub failures: Vec<BuildFailure>,
    pub duration_ms: u64,
}

/// Counts over a knowledge base
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub documents: usize,
    pub chunks: usize,
    pub dense_indexed: usize,
    pub sparse_indexed: usize,
    pub build_failures: usize,
    pub vocabulary_size: usize,
    pub entities: usize,
    pub relationships: usize,
    pub embedding_model: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}

/// Everything a query needs, built once and shared read-only
pub struct KnowledgeBase {
    /// Row `i` of either index refers to `chunks[offset]` via the index's offset list
    pub chunks: Vec<Chunk>,
    /// `None` when the dense signal is disabled
    pub vector_index: Option<VectorIndex>,
    pub keyword_index: KeywordIndex,
    /// Provider that produced the dense vectors; queries must use the same one
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub records: Vec<KnowledgeRecord>,
    pub build_report: BuildReport,
    pub built_at: DateTime<Utc>,
}

impl KnowledgeBase {
    pub fn chunk(&self, offset: usize) -> Option<&Chunk> {
        self.chunks.get(offset)
    }

    pub fn record(&self, document_id: &str) -> Option<&KnowledgeRecord> {
        self.records.iter().find(|r| r.document_id == document_id)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        KnowledgeBaseStats {
            documents: self.build_report.documents,
            chunks: self.chunks.len(),
            dense_indexed: self.vector_index.as_ref().map(|v| v.len()).unwrap_or(0),
            sparse_indexed: self.keyword_index.len(),
            build_failures: self.build_report.failures.len(),
            vocabulary_size: self.keyword_index.vocabulary_size(),
            entities: self.records.iter().map(|r| r.stats.entities).sum(),
            relationships: self.records.iter().map(|r| r.stats.relationships).sum(),
            embedding_model: self.embedder.as_ref().map(|e| e.model_name().to_string()),
            built_at: Some(self.built_at),
        }
    }
}
