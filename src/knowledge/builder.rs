//! Builds a knowledge base from documents: chunks, both indexes and entity records

use super::{BuildFailure, BuildReport, BuildStage, KnowledgeBase};
use crate::chunking::{Chunk, LegalChunker};
use crate::config::Config;
use crate::document::Document;
use crate::embedding::{BatchItem, BatchProcessor, EmbeddingProvider, KeywordIndex, VectorIndex};
use crate::entities::{EntityExtractor, KnowledgeRecord, PatternRegistry};
use crate::error::Result;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Turns a document corpus into an immutable [`KnowledgeBase`]
pub struct KnowledgeBaseBuilder {
    chunker: LegalChunker,
    extractor: EntityExtractor,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    bm25_k1: f32,
    bm25_b: f32,
    batch_size: usize,
    embedding_timeout: Duration,
}

impl KnowledgeBaseBuilder {
    /// `embedder` is `None` when the dense signal is disabled
    pub fn new(config: &Config, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Result<Self> {
        let registry = PatternRegistry::from_configs(&config.entities.pattern)?;

        Ok(Self {
            chunker: LegalChunker::new(config.chunking.clone()),
            extractor: EntityExtractor::new(registry),
            embedder,
            bm25_k1: config.indexing.bm25_k1,
            bm25_b: config.indexing.bm25_b,
            batch_size: config.embedding.batch_size,
            embedding_timeout: Duration::from_millis(config.embedding.timeout_ms),
        })
    }

    /// Build everything for the given documents
    ///
    /// Per-chunk indexing failures are recorded in the build report and never
    /// abort the build.
    pub async fn build(&self, documents: Vec<Document>) -> Result<KnowledgeBase> {
        let start = Instant::now();
        info!("Building knowledge base from {} documents", documents.len());

        let documents = unique_document_ids(documents);

        let chunks = self.chunker.chunk_all(&documents);
        let mut failures = Vec::new();

        let vector_index = match &self.embedder {
            Some(embedder) => Some(self.build_dense(embedder, &chunks, &mut failures).await?),
            None => {
                info!("Dense signal disabled, skipping embeddings");
                None
            }
        };
        let keyword_index = self.build_sparse(&chunks, &mut failures)?;
        let records = self.build_records(&documents, &chunks);

        let report = BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            dense_indexed: vector_index.as_ref().map(|v| v.len()).unwrap_or(0),
            sparse_indexed: keyword_index.len(),
            failures,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Knowledge base built: {} chunks, {} dense, {} sparse, {} failures, {}ms",
            report.chunks,
            report.dense_indexed,
            report.sparse_indexed,
            report.failures.len(),
            report.duration_ms
        );

        Ok(KnowledgeBase {
            chunks,
            vector_index,
            keyword_index,
            embedder: self.embedder.clone(),
            records,
            build_report: report,
            built_at: Utc::now(),
        })
    }

    async fn build_dense(
        &self,
        embedder: &Arc<dyn EmbeddingProvider>,
        chunks: &[Chunk],
        failures: &mut Vec<BuildFailure>,
    ) -> Result<VectorIndex> {
        let processor =
            BatchProcessor::new(embedder.clone(), self.batch_size, self.embedding_timeout);
        let items = chunks
            .iter()
            .enumerate()
            .map(|(offset, chunk)| BatchItem {
                offset,
                text: chunk.text.clone(),
            })
            .collect();

        let result = processor.process(items).await;

        for batch in &result.failed {
            for &offset in &batch.offsets {
                failures.push(BuildFailure {
                    chunk_id: chunks[offset].id.clone(),
                    stage: BuildStage::Dense,
                    reason: batch.reason.clone(),
                });
            }
        }

        let mut index = VectorIndex::new(embedder.dimension());
        for (offset, vector) in result.embedded {
            if let Err(e) = index.insert(offset, &vector) {
                warn!("Skipping vector of chunk {}: {}", chunks[offset].id, e);
                failures.push(BuildFailure {
                    chunk_id: chunks[offset].id.clone(),
                    stage: BuildStage::Dense,
                    reason: e.to_string(),
                });
            }
        }

        Ok(index)
    }

    fn build_sparse(
        &self,
        chunks: &[Chunk],
        failures: &mut Vec<BuildFailure>,
    ) -> Result<KeywordIndex> {
        let mut index = KeywordIndex::new(self.bm25_k1, self.bm25_b)?;

        for (offset, chunk) in chunks.iter().enumerate() {
            if let Err(e) = index.insert(offset, &chunk.text) {
                warn!("Chunk {} excluded from the keyword index: {}", chunk.id, e);
                failures.push(BuildFailure {
                    chunk_id: chunk.id.clone(),
                    stage: BuildStage::Sparse,
                    reason: e.to_string(),
                });
            }
        }

        Ok(index)
    }

    fn build_records(&self, documents: &[Document], chunks: &[Chunk]) -> Vec<KnowledgeRecord> {
        let mut per_document: BTreeMap<&str, Vec<(String, Vec<_>)>> = BTreeMap::new();
        for chunk in chunks {
            per_document
                .entry(chunk.source_document_id.as_str())
                .or_default()
                .push((chunk.id.clone(), self.extractor.extract(&chunk.text, &chunk.id)));
        }

        documents
            .iter()
            .map(|doc| {
                let per_chunk = per_document.remove(doc.id.as_str()).unwrap_or_default();
                KnowledgeRecord::build(&doc.id, &per_chunk)
            })
            .collect()
    }
}

/// Rename repeated document ids to `<id>-2`, `<id>-3`, ... so chunk ids stay unique
fn unique_document_ids(mut documents: Vec<Document>) -> Vec<Document> {
    let original: HashSet<String> = documents.iter().map(|d| d.id.clone()).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(documents.len());

    for doc in &mut documents {
        if seen.insert(doc.id.clone()) {
            continue;
        }

        let mut n = 2;
        let mut renamed = format!("{}-{}", doc.id, n);
        while original.contains(&renamed) || seen.contains(&renamed) {
            n += 1;
            renamed = format!("{}-{}", doc.id, n);
        }

        warn!("Duplicate document id {}, indexing it as {}", doc.id, renamed);
        seen.insert(renamed.clone());
        doc.id = renamed;
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentType;
    use crate::embedding::{EmbeddingError, HashingEmbedder};

    const CONTRACT: &str = "\
1. Payment. The Client shall pay the Supplier a monthly fee of $5,000 within 30 days of each invoice, plus applicable tax.

2. Liability. The Supplier accepts unlimited liability for all damages and losses caused by its negligence or wilful misconduct.";

    fn builder(embedder: Option<Arc<dyn EmbeddingProvider>>) -> KnowledgeBaseBuilder {
        KnowledgeBaseBuilder::new(&Config::default(), embedder).unwrap()
    }

    fn hashing() -> Option<Arc<dyn EmbeddingProvider>> {
        Some(Arc::new(HashingEmbedder::new(64).unwrap()))
    }

    #[tokio::test]
    async fn test_build_aligns_indexes_with_chunks() {
        let docs = vec![Document::new("msa", CONTRACT, DocumentType::Contract)];
        let kb = builder(hashing()).build(docs).await.unwrap();

        assert_eq!(kb.chunks.len(), 2);
        assert!(kb.build_report.failures.is_empty());
        let dense = kb.vector_index.as_ref().unwrap();
        assert_eq!(dense.offsets(), &[0, 1]);
        assert_eq!(kb.keyword_index.offsets(), &[0, 1]);
        assert_eq!(kb.build_report.dense_indexed, 2);
        assert_eq!(kb.build_report.sparse_indexed, 2);
    }

    #[tokio::test]
    async fn test_records_per_document() {
        let docs = vec![Document::new("msa", CONTRACT, DocumentType::Contract)];
        let kb = builder(None).build(docs).await.unwrap();

        assert!(kb.vector_index.is_none());
        assert_eq!(kb.records.len(), 1);
        let record = &kb.records[0];
        assert_eq!(record.document_id, "msa");
        // "$5,000" and "30 days" share the payment chunk
        assert_eq!(record.stats.entities, 2);
        assert_eq!(record.relationships.len(), 1);
    }

    struct BrokenEmbedder;

    impl EmbeddingProvider for BrokenEmbedder {
        fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::GenerationError("offline".to_string()))
        }

        fn embed_batch(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::GenerationError("offline".to_string()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_dense_failures_recorded() {
        let docs = vec![Document::new("msa", CONTRACT, DocumentType::Contract)];
        let kb = builder(Some(Arc::new(BrokenEmbedder))).build(docs).await.unwrap();

        assert_eq!(kb.build_report.failures.len(), 2);
        assert!(kb
            .build_report
            .failures
            .iter()
            .all(|f| f.stage == BuildStage::Dense));
        assert_eq!(kb.build_report.dense_indexed, 0);
        // The sparse index is unaffected
        assert_eq!(kb.build_report.sparse_indexed, 2);
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let kb = builder(hashing()).build(Vec::new()).await.unwrap();
        assert!(kb.is_empty());
        assert_eq!(kb.build_report.documents, 0);
        assert!(kb.vector_index.as_ref().unwrap().is_empty());
        assert!(kb.keyword_index.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_document_ids_renamed() {
        let docs = vec![
            Document::new("terms", CONTRACT, DocumentType::Contract),
            Document::new("terms", CONTRACT, DocumentType::Contract),
            Document::new("terms-2", CONTRACT, DocumentType::Contract),
        ];
        let kb = builder(None).build(docs).await.unwrap();

        let ids: HashSet<&str> = kb.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), kb.chunks.len());
        assert_eq!(kb.chunks.len(), 6);

        let record_ids: Vec<&str> = kb.records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(record_ids, vec!["terms", "terms-3", "terms-2"]);
        assert!(kb.records.iter().all(|r| r.stats.entities == 2));
    }
}
