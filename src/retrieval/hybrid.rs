//! Hybrid retrieval over a knowledge base snapshot, followed by reranking

use crate::config::{Config, MemoryConfig, RetrievalConfig};
use crate::embedding::embed_query;
use crate::error::{LexragError, Result};
use crate::knowledge::{KnowledgeBase, KnowledgeBaseService};
use crate::memory::{ConversationMemory, FeedbackStore, MemoryEntry};
use crate::rerank::{PipelineMode, RelevanceScorer, RerankPipeline};
use crate::retrieval::{
    deduplicate_candidates, generate_expanded_query, weighted_fusion, DegradedSignals,
    FusionConfig, QueryContext, RankedPassage, RetrievalCandidate, RetrievalError,
    RetrievalReport, RetrievalStats,
};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Answers queries against the current knowledge base
///
/// Safe to share between tasks: feedback and memory are behind async mutexes and
/// every query works on its own knowledge base snapshot.
pub struct RetrievalOrchestrator {
    knowledge: Arc<KnowledgeBaseService>,
    pipeline: RerankPipeline,
    fusion: FusionConfig,
    feedback: Mutex<FeedbackStore>,
    memory: Mutex<ConversationMemory>,
    retrieval: RetrievalConfig,
    memory_config: MemoryConfig,
    embedding_timeout: Duration,
    queries_served: AtomicU64,
}

impl RetrievalOrchestrator {
    pub fn new(
        knowledge: Arc<KnowledgeBaseService>,
        scorer: Arc<dyn RelevanceScorer>,
        config: &Config,
    ) -> Result<Self> {
        let fusion = FusionConfig::new(
            config.retrieval.dense_weight,
            config.retrieval.sparse_weight,
        )
        .map_err(|e| LexragError::Config(e.to_string()))?;

        Ok(Self {
            knowledge,
            pipeline: RerankPipeline::new(scorer, config.reranking.clone()),
            fusion,
            feedback: Mutex::new(FeedbackStore::new(config.memory.feedback_alpha)),
            memory: Mutex::new(ConversationMemory::new(
                config.memory.max_entries,
                config.memory.trim_to,
            )),
            retrieval: config.retrieval.clone(),
            memory_config: config.memory.clone(),
            embedding_timeout: Duration::from_millis(config.embedding.timeout_ms),
            queries_served: AtomicU64::new(0),
        })
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBaseService> {
        &self.knowledge
    }

    /// Top passages for `query`, best first
    pub async fn retrieve_and_rerank(
        &self,
        query: &str,
        context: Option<&QueryContext>,
    ) -> std::result::Result<Vec<RankedPassage>, RetrievalError> {
        Ok(self.retrieve_detailed(query, context).await?.passages)
    }

    /// Like [`retrieve_and_rerank`](Self::retrieve_and_rerank), with every
    /// candidate's scores and the degraded signals
    pub async fn retrieve_detailed(
        &self,
        query: &str,
        context: Option<&QueryContext>,
    ) -> std::result::Result<RetrievalReport, RetrievalError> {
        let context = context.cloned().unwrap_or_default();
        self.validate(query)?;

        let kb = self.knowledge.snapshot().await.ok_or(RetrievalError::NotBuilt)?;
        let start = Instant::now();

        let report = if kb.is_empty() {
            debug!("Knowledge base is empty, nothing to retrieve");
            RetrievalReport::empty(context.mode)
        } else {
            self.run(&kb, query, &context).await
        };

        self.queries_served.fetch_add(1, Ordering::Relaxed);
        self.remember(query, &report, context.mode).await;

        if report.degraded.any() {
            warn!(
                "Query served with degraded signals: dense={}, relevance={}",
                report.degraded.dense, report.degraded.relevance
            );
        }
        info!(
            "Query returned {} passages from {} candidates in {}ms",
            report.passages.len(),
            report.candidates.len(),
            start.elapsed().as_millis()
        );

        Ok(report)
    }

    /// Blend an observed usefulness score into a chunk's feedback
    ///
    /// Returns the new feedback value, `None` when the score was ignored.
    pub async fn update_feedback(&self, chunk_id: &str, score: f32) -> Option<f32> {
        let updated = self.feedback.lock().await.update(chunk_id, score);
        if let Some(value) = updated {
            debug!("Feedback for {} is now {:.3}", chunk_id, value);
        }
        updated
    }

    pub async fn feedback_for(&self, chunk_id: &str) -> f32 {
        self.feedback.lock().await.get(chunk_id)
    }

    /// Most recent queries, newest first
    pub async fn recent_queries(&self, n: usize) -> Vec<MemoryEntry> {
        self.memory
            .lock()
            .await
            .recent(n)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get_retrieval_stats(&self) -> RetrievalStats {
        let (memory_entries, last_query) = {
            let memory = self.memory.lock().await;
            let last = memory.recent(1).first().map(|e| e.query.clone());
            (memory.len(), last)
        };
        let feedback_entries = self.feedback.lock().await.len();

        RetrievalStats {
            queries_served: self.queries_served.load(Ordering::Relaxed),
            memory_entries,
            feedback_entries,
            relevance_scorer: self.pipeline.scorer_name().to_string(),
            last_query,
            knowledge_base: self.knowledge.stats().await,
        }
    }

    fn validate(&self, query: &str) -> std::result::Result<(), RetrievalError> {
        let visible = query.chars().filter(|c| !c.is_whitespace()).count();
        if visible < self.retrieval.min_query_chars {
            return Err(RetrievalError::InvalidQuery(format!(
                "Query must contain at least {} non-blank characters",
                self.retrieval.min_query_chars
            )));
        }
        Ok(())
    }

    async fn run(
        &self,
        kb: &Arc<KnowledgeBase>,
        query: &str,
        context: &QueryContext,
    ) -> RetrievalReport {
        let expanded_query = context.expand.then(|| generate_expanded_query(query));
        let search_query = expanded_query.as_deref().unwrap_or(query);
        debug!("Searching with: {}", search_query);

        let (dense, sparse) = tokio::join!(self.dense_search(kb, search_query), async {
            kb.keyword_index
                .search(search_query, self.retrieval.sparse_top_k)
                .into_iter()
                .map(|r| (r.offset, r.score))
                .collect::<Vec<_>>()
        });
        let mut degraded = DegradedSignals {
            dense: dense.is_none(),
            relevance: false,
        };
        let dense = dense.unwrap_or_default();
        debug!("{} dense hits, {} sparse hits", dense.len(), sparse.len());

        let candidates: Vec<RetrievalCandidate> = weighted_fusion(&dense, &sparse, &self.fusion)
            .into_iter()
            .filter_map(|fused| {
                kb.chunk(fused.offset).map(|chunk| {
                    RetrievalCandidate::new(chunk.clone(), fused.dense, fused.bm25, fused.combined)
                })
            })
            .collect();

        let mut candidates = deduplicate_candidates(candidates);
        candidates.sort_by(|a, b| a.cmp_combined(b));
        candidates.truncate(self.retrieval.rerank_budget);

        let outcome = self
            .pipeline
            .rerank(query, candidates, context.mode, context.document_type, Utc::now())
            .await;
        degraded.relevance = outcome.relevance_degraded;

        let mut candidates = outcome.candidates;
        self.apply_feedback(&mut candidates).await;
        candidates.sort_by(|a, b| a.cmp_final(b));

        let top_n = context.top_n.unwrap_or(self.retrieval.final_top_n);
        let passages = candidates.iter().take(top_n).map(RankedPassage::from).collect();

        RetrievalReport {
            passages,
            candidates,
            degraded,
            expanded_query,
            mode: context.mode,
        }
    }

    /// Dense top-k, `None` when the dense signal is unavailable for this query
    async fn dense_search(&self, kb: &KnowledgeBase, query: &str) -> Option<Vec<(usize, f32)>> {
        let (index, embedder) = match (&kb.vector_index, &kb.embedder) {
            (Some(index), Some(embedder)) => (index, embedder),
            _ => return None,
        };
        if index.is_empty() {
            debug!("Dense index has no vectors");
            return None;
        }

        let vector = match embed_query(embedder.clone(), query, self.embedding_timeout).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Query embedding failed, continuing without dense results: {}", e);
                return None;
            }
        };

        match index.search(&vector, self.retrieval.dense_top_k) {
            Ok(results) => Some(results.into_iter().map(|r| (r.offset, r.score)).collect()),
            Err(e) => {
                warn!("Vector search failed, continuing without dense results: {}", e);
                None
            }
        }
    }

    async fn apply_feedback(&self, candidates: &mut [RetrievalCandidate]) {
        let weight = self.memory_config.feedback_weight;
        let feedback = self.feedback.lock().await;

        for candidate in candidates.iter_mut() {
            candidate.feedback_score = feedback.get(candidate.chunk_id());
            candidate.final_score =
                candidate.ensemble_score * (1.0 - weight) + candidate.feedback_score * weight;
        }
    }

    async fn remember(&self, query: &str, report: &RetrievalReport, mode: PipelineMode) {
        let entry = MemoryEntry {
            query: query.to_string(),
            timestamp: Utc::now(),
            result_ids: report.passages.iter().map(|p| p.chunk_id.clone()).collect(),
            fast_mode: mode == PipelineMode::Fast,
        };
        self.memory.lock().await.push(entry);
    }
}
