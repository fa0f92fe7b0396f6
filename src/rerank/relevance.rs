//! Pairwise query/passage relevance scorers

use crate::tokenizer::LegalTokenizer;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Reranking failed: {0}")]
    RerankingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Relevance scoring timed out after {0}ms")]
    Timeout(u64),
}

/// Scores how well each passage answers a query
///
/// Calls are blocking; the pipeline runs them on the blocking pool.
pub trait RelevanceScorer: Send + Sync {
    /// One score in [0, 1] per passage, in input order
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>, RerankError>;

    fn name(&self) -> &str;
}

/// Logistic mapping of a cross-encoder logit to [0, 1]
pub fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Cross-encoder scorer using FastEmbed
pub struct CrossEncoderScorer {
    model: Arc<TextRerank>,
    model_name: String,
}

impl CrossEncoderScorer {
    /// Create a new scorer with the specified model
    ///
    /// Models are downloaded on first use like the embedding models.
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        let model = match model_name {
            "bge-reranker-base" | "BAAI/bge-reranker-base" => RerankerModel::BGERerankerBase,
            "bge-reranker-v2-m3" | "BAAI/bge-reranker-v2-m3" => RerankerModel::BGERerankerV2M3,
            "jina-reranker-v1-turbo-en" => RerankerModel::JINARerankerV1TurboEn,
            _ => {
                return Err(RerankError::InitializationError(format!(
                    "Unsupported reranker model: {}. Supported: bge-reranker-base, bge-reranker-v2-m3, jina-reranker-v1-turbo-en",
                    model_name
                )))
            }
        };

        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(model).with_show_download_progress(true);

        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }
}

impl RelevanceScorer for CrossEncoderScorer {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>, RerankError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        if query.is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let documents: Vec<&str> = passages.iter().map(|s| s.as_str()).collect();

        let results = self
            .model
            .rerank(query, documents, false, None)
            .map_err(|e| RerankError::RerankingError(e.to_string()))?;

        // Results come back sorted by score; put them back in input order
        let mut scores = vec![None; passages.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = Some(sigmoid(result.score));
            }
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| {
                score.ok_or_else(|| {
                    RerankError::RerankingError(format!("No score returned for passage {}", idx))
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Fraction of query terms found in the passage
///
/// No model involved; used when the cross-encoder cannot be loaded.
pub struct LexicalOverlapScorer {
    tokenizer: LegalTokenizer,
}

impl LexicalOverlapScorer {
    pub fn new() -> Self {
        Self {
            tokenizer: LegalTokenizer::new(),
        }
    }
}

impl Default for LexicalOverlapScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceScorer for LexicalOverlapScorer {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>, RerankError> {
        let query_terms: HashSet<String> = self.tokenizer.tokenize(query).into_iter().collect();
        if query_terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|passage| {
                let passage_terms: HashSet<String> =
                    self.tokenizer.tokenize(passage).into_iter().collect();
                let hits = query_terms.intersection(&passage_terms).count();
                hits as f32 / query_terms.len() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

/// Constant 0.5 for every passage
pub struct NeutralScorer;

impl RelevanceScorer for NeutralScorer {
    fn score(&self, _query: &str, passages: &[String]) -> Result<Vec<f32>, RerankError> {
        Ok(vec![0.5; passages.len()])
    }

    fn name(&self) -> &str {
        "neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }

    #[test]
    fn test_lexical_overlap() {
        let scorer = LexicalOverlapScorer::new();
        let passages = vec![
            "Either party may terminate upon thirty days notice.".to_string(),
            "Fees are payable monthly.".to_string(),
        ];
        let scores = scorer.score("terminate notice", &passages).unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_lexical_empty_query_terms() {
        let scorer = LexicalOverlapScorer::new();
        let scores = scorer.score("of the", &["text here".to_string()]).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn test_neutral() {
        let scores = NeutralScorer.score("anything", &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(scores, vec![0.5, 0.5]);
    }

    #[test]
    fn test_unsupported_reranker_model() {
        assert!(matches!(
            CrossEncoderScorer::new("no-such-reranker"),
            Err(RerankError::InitializationError(_))
        ));
    }

    #[test]
    #[ignore] // Requires model download
    fn test_cross_encoder_order() {
        let scorer = CrossEncoderScorer::new("bge-reranker-base").unwrap();

        let query = "Who pays for damages caused by negligence?";
        let passages = vec![
            "The weather is nice today.".to_string(),
            "The Supplier is liable for all damages caused by its negligence.".to_string(),
        ];

        let scores = scorer.score(query, &passages).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[1] > scores[0]);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }
}
