//! Staged reranking: relevance, legal domain, multi-criteria, ensemble

use super::criteria::multi_criteria_score;
use super::domain::{legal_domain_score, DomainQuery};
use super::relevance::{RelevanceScorer, RerankError};
use crate::config::RerankingConfig;
use crate::document::DocumentType;
use crate::retrieval::RetrievalCandidate;
use crate::tokenizer::LegalTokenizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Relevance assigned when the scorer is unavailable or skipped
pub const NEUTRAL_RELEVANCE: f32 = 0.5;

/// Which stages run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Relevance, legal domain, multi-criteria and ensemble
    #[default]
    Full,
    /// Relevance on a bounded prefix, then a light ensemble
    Fast,
}

/// Reranked candidates, in input order
#[derive(Debug)]
pub struct RerankOutcome {
    pub candidates: Vec<RetrievalCandidate>,
    /// The relevance scorer failed or timed out, neutral scores were used
    pub relevance_degraded: bool,
}

/// Reranking pipeline shared by every query
pub struct RerankPipeline {
    scorer: Arc<dyn RelevanceScorer>,
    tokenizer: LegalTokenizer,
    config: RerankingConfig,
}

impl RerankPipeline {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: RerankingConfig) -> Self {
        Self {
            scorer,
            tokenizer: LegalTokenizer::new(),
            config,
        }
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Run every stage of `mode` over the candidates
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<RetrievalCandidate>,
        mode: PipelineMode,
        doc_type_hint: Option<DocumentType>,
        now: DateTime<Utc>,
    ) -> RerankOutcome {
        if candidates.is_empty() {
            return RerankOutcome {
                candidates,
                relevance_degraded: false,
            };
        }

        let relevance_degraded = self.relevance_stage(query, &mut candidates, mode).await;

        if mode == PipelineMode::Full {
            self.domain_stage(query, &mut candidates);
            Self::multi_criteria_stage(&mut candidates, doc_type_hint, now);
        }
        Self::ensemble_stage(&mut candidates, mode);

        debug!(
            "Reranked {} candidates ({:?} mode, relevance by {})",
            candidates.len(),
            mode,
            self.scorer.name()
        );

        RerankOutcome {
            candidates,
            relevance_degraded,
        }
    }

    /// Score the candidates with one time-bounded scorer call. Returns whether it degraded.
    async fn relevance_stage(
        &self,
        query: &str,
        candidates: &mut [RetrievalCandidate],
        mode: PipelineMode,
    ) -> bool {
        let limit = match mode {
            PipelineMode::Full => candidates.len(),
            PipelineMode::Fast => candidates.len().min(self.config.fast_relevance_limit),
        };

        for candidate in candidates.iter_mut() {
            candidate.relevance_score = NEUTRAL_RELEVANCE;
        }
        if limit == 0 {
            return false;
        }

        let passages: Vec<String> = candidates[..limit]
            .iter()
            .map(|c| truncate_chars(&c.chunk.text, self.config.max_passage_chars))
            .collect();

        match self.score_with_timeout(query, passages).await {
            Ok(scores) => {
                for (candidate, score) in candidates[..limit].iter_mut().zip(scores) {
                    candidate.relevance_score = if score.is_finite() {
                        score.clamp(0.0, 1.0)
                    } else {
                        NEUTRAL_RELEVANCE
                    };
                }
                false
            }
            Err(e) => {
                warn!(
                    "Relevance scoring with {} failed, using neutral scores: {}",
                    self.scorer.name(),
                    e
                );
                true
            }
        }
    }

    async fn score_with_timeout(
        &self,
        query: &str,
        passages: Vec<String>,
    ) -> Result<Vec<f32>, RerankError> {
        let expected = passages.len();
        let scorer = self.scorer.clone();
        let query = query.to_string();
        let timeout = Duration::from_millis(self.config.timeout_ms);

        let task = tokio::task::spawn_blocking(move || scorer.score(&query, &passages));
        let scores = match tokio::time::timeout(timeout, task).await {
            Err(_) => return Err(RerankError::Timeout(self.config.timeout_ms)),
            Ok(Err(join_error)) => {
                return Err(RerankError::RerankingError(format!(
                    "Scoring task failed: {}",
                    join_error
                )))
            }
            Ok(Ok(result)) => result?,
        };

        if scores.len() != expected {
            return Err(RerankError::RerankingError(format!(
                "Score count mismatch: expected {}, got {}",
                expected,
                scores.len()
            )));
        }
        Ok(scores)
    }

    fn domain_stage(&self, query: &str, candidates: &mut [RetrievalCandidate]) {
        let domain_query = DomainQuery::new(query, &self.tokenizer);
        for candidate in candidates.iter_mut() {
            candidate.legal_domain_score =
                legal_domain_score(&domain_query, &candidate.chunk, &self.tokenizer);
        }
    }

    fn multi_criteria_stage(
        candidates: &mut [RetrievalCandidate],
        doc_type_hint: Option<DocumentType>,
        now: DateTime<Utc>,
    ) {
        for candidate in candidates.iter_mut() {
            candidate.multi_criteria_score = multi_criteria_score(
                &candidate.chunk,
                candidate.relevance_score,
                candidate.legal_domain_score,
                doc_type_hint,
                now,
            );
        }
    }

    fn ensemble_stage(candidates: &mut [RetrievalCandidate], mode: PipelineMode) {
        for candidate in candidates.iter_mut() {
            let importance = candidate.chunk.legal_importance;
            candidate.ensemble_score = match mode {
                PipelineMode::Full => {
                    candidate.combined_score * 0.2
                        + candidate.relevance_score * 0.3
                        + candidate.legal_domain_score * 0.2
                        + candidate.multi_criteria_score * 0.2
                        + importance * 0.1
                }
                PipelineMode::Fast => {
                    candidate.combined_score * 0.6
                        + candidate.relevance_score * 0.3
                        + importance * 0.1
                }
            };
        }
    }
}

/// First `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
